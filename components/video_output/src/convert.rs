//! CPU pixel conversion for the software render path
//!
//! Layout convention mirrors the decoder output: planes may carry row
//! padding, so every row is addressed through its stride and the packed
//! RGBA output is exactly `width * height * 4` bytes.

use lumenplay_shared_types::{Plane, PlayerError, PlayerResult};

/// Clamps a BT.601 conversion result into a byte
fn clamp_u8(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

/// Converts one YUV sample triple to packed RGBA
fn yuv_to_rgba(y: u8, u: u8, v: u8, out: &mut [u8]) {
    let y = y as i32;
    let u = u as i32 - 128;
    let v = v as i32 - 128;

    // BT.601 integer approximation, scaled by 256
    let r = y + ((359 * v) >> 8);
    let g = y - ((88 * u + 183 * v) >> 8);
    let b = y + ((454 * u) >> 8);

    out[0] = clamp_u8(r);
    out[1] = clamp_u8(g);
    out[2] = clamp_u8(b);
    out[3] = 255;
}

fn plane_checked(planes: &[Plane], index: usize, min_len: usize) -> PlayerResult<&Plane> {
    let plane = planes.get(index).ok_or_else(|| {
        PlayerError::InvalidParameter(format!("frame is missing plane {}", index))
    })?;
    if plane.data.len() < min_len {
        return Err(PlayerError::InvalidParameter(format!(
            "plane {} holds {} bytes, expected at least {}",
            index,
            plane.data.len(),
            min_len
        )));
    }
    Ok(plane)
}

/// Converts three-plane YUV 4:2:0 into packed RGBA
///
/// The output buffer is resized to `width * height * 4`.
pub fn yuv420p_to_rgba(
    planes: &[Plane],
    width: usize,
    height: usize,
    out: &mut Vec<u8>,
) -> PlayerResult<()> {
    let chroma_width = width.div_ceil(2);
    let chroma_height = height.div_ceil(2);

    let y_plane = plane_checked(planes, 0, height.saturating_sub(1) * stride_of(planes, 0) + width)?;
    let u_plane = plane_checked(
        planes,
        1,
        chroma_height.saturating_sub(1) * stride_of(planes, 1) + chroma_width,
    )?;
    let v_plane = plane_checked(
        planes,
        2,
        chroma_height.saturating_sub(1) * stride_of(planes, 2) + chroma_width,
    )?;

    out.resize(width * height * 4, 0);
    for row in 0..height {
        for col in 0..width {
            let y = y_plane.data[row * y_plane.stride + col];
            let u = u_plane.data[(row / 2) * u_plane.stride + col / 2];
            let v = v_plane.data[(row / 2) * v_plane.stride + col / 2];
            let offset = (row * width + col) * 4;
            yuv_to_rgba(y, u, v, &mut out[offset..offset + 4]);
        }
    }
    Ok(())
}

/// Converts semi-planar NV12 (Y plane + interleaved UV) into packed RGBA
///
/// The output buffer is resized to `width * height * 4`.
pub fn nv12_to_rgba(
    planes: &[Plane],
    width: usize,
    height: usize,
    out: &mut Vec<u8>,
) -> PlayerResult<()> {
    let chroma_height = height.div_ceil(2);

    let y_plane = plane_checked(planes, 0, height.saturating_sub(1) * stride_of(planes, 0) + width)?;
    let uv_plane = plane_checked(
        planes,
        1,
        chroma_height.saturating_sub(1) * stride_of(planes, 1) + width.div_ceil(2) * 2,
    )?;

    out.resize(width * height * 4, 0);
    for row in 0..height {
        for col in 0..width {
            let y = y_plane.data[row * y_plane.stride + col];
            let uv_offset = (row / 2) * uv_plane.stride + (col / 2) * 2;
            let u = uv_plane.data[uv_offset];
            let v = uv_plane.data[uv_offset + 1];
            let offset = (row * width + col) * 4;
            yuv_to_rgba(y, u, v, &mut out[offset..offset + 4]);
        }
    }
    Ok(())
}

fn stride_of(planes: &[Plane], index: usize) -> usize {
    planes.get(index).map(|p| p.stride).unwrap_or(0)
}
