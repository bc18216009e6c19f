//! CPU renderer producing a packed RGBA frame buffer

use crate::convert::{nv12_to_rgba, yuv420p_to_rgba};
use lumenplay_shared_types::{
    FrameContent, PixelFormat, Plane, PlayerError, PlayerResult, Renderer, VideoFrame,
    WindowHandle,
};
use tracing::debug;

/// Software render path: converts decoded planes into an RGBA buffer
///
/// The embedder blits [`SoftwareRenderer::frame_buffer`] into its widget
/// after each presentation. Hardware surfaces cannot be sampled on the CPU;
/// handing one to this renderer is a render error, which the pipeline logs
/// and skips.
#[derive(Debug, Default)]
pub struct SoftwareRenderer {
    initialized: bool,
    window_size: (u32, u32),
    frame_size: (u32, u32),
    buffer: Vec<u8>,
}

impl SoftwareRenderer {
    /// Creates a renderer with an empty frame buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last presented frame as packed RGBA
    pub fn frame_buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Returns the dimensions of the last presented frame
    pub fn frame_size(&self) -> (u32, u32) {
        self.frame_size
    }

    fn copy_packed(
        &mut self,
        planes: &[Plane],
        width: usize,
        height: usize,
        swap_rb: bool,
    ) -> PlayerResult<()> {
        let plane = planes.first().ok_or_else(|| {
            PlayerError::InvalidParameter("packed frame without a plane".to_string())
        })?;
        let row_bytes = width * 4;
        if plane.data.len() < height.saturating_sub(1) * plane.stride + row_bytes {
            return Err(PlayerError::InvalidParameter(
                "packed plane shorter than its geometry".to_string(),
            ));
        }

        self.buffer.resize(width * height * 4, 0);
        for row in 0..height {
            let src = &plane.data[row * plane.stride..row * plane.stride + row_bytes];
            let dst = &mut self.buffer[row * row_bytes..(row + 1) * row_bytes];
            dst.copy_from_slice(src);
            if swap_rb {
                for pixel in dst.chunks_exact_mut(4) {
                    pixel.swap(0, 2);
                }
            }
        }
        Ok(())
    }
}

impl Renderer for SoftwareRenderer {
    fn init(&mut self, _window: WindowHandle, width: u32, height: u32) -> PlayerResult<()> {
        self.initialized = true;
        self.window_size = (width, height);
        Ok(())
    }

    fn render_frame(&mut self, frame: &VideoFrame) -> PlayerResult<()> {
        let width = frame.width as usize;
        let height = frame.height as usize;

        match &frame.content {
            FrameContent::Software { format, planes } => match format {
                PixelFormat::Yuv420p => yuv420p_to_rgba(planes, width, height, &mut self.buffer)?,
                PixelFormat::Nv12 => nv12_to_rgba(planes, width, height, &mut self.buffer)?,
                PixelFormat::Rgba => self.copy_packed(planes, width, height, false)?,
                PixelFormat::Bgra => self.copy_packed(planes, width, height, true)?,
                other => {
                    return Err(PlayerError::NotSupported(format!(
                        "software renderer cannot present {:?}",
                        other
                    )));
                }
            },
            FrameContent::Hardware { .. } => {
                return Err(PlayerError::RenderError(
                    "hardware surface handed to the software render path".to_string(),
                ));
            }
        }

        self.frame_size = (frame.width, frame.height);
        Ok(())
    }

    fn clear_caches(&mut self) {
        // No surface views are cached; the RGBA buffer is rewritten whole
    }

    fn on_resize(&mut self, width: u32, height: u32) {
        self.window_size = (width, height);
    }

    fn cleanup(&mut self) {
        self.initialized = false;
        self.buffer = Vec::new();
        debug!("software renderer released");
    }

    fn name(&self) -> &str {
        "software"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use lumenplay_shared_types::{HwFramePool, TimeBase};

    fn plane(data: Vec<u8>, stride: usize) -> Plane {
        Plane {
            data: Bytes::from(data),
            stride,
        }
    }

    fn yuv_frame() -> VideoFrame {
        VideoFrame {
            width: 2,
            height: 2,
            pts: Some(0),
            time_base: TimeBase::MILLISECONDS,
            content: FrameContent::Software {
                format: PixelFormat::Yuv420p,
                planes: vec![
                    plane(vec![128; 4], 2),
                    plane(vec![128; 1], 1),
                    plane(vec![128; 1], 1),
                ],
            },
        }
    }

    #[test]
    fn test_yuv_frame_fills_rgba_buffer() {
        let mut renderer = SoftwareRenderer::new();
        renderer.init(WindowHandle(0), 640, 360).unwrap();
        renderer.render_frame(&yuv_frame()).unwrap();

        assert_eq!(renderer.frame_size(), (2, 2));
        assert_eq!(renderer.frame_buffer().len(), 16);
        assert_eq!(&renderer.frame_buffer()[..4], &[128, 128, 128, 255]);
    }

    #[test]
    fn test_bgra_swizzle() {
        let mut renderer = SoftwareRenderer::new();
        let frame = VideoFrame {
            width: 1,
            height: 1,
            pts: None,
            time_base: TimeBase::MILLISECONDS,
            content: FrameContent::Software {
                format: PixelFormat::Bgra,
                planes: vec![plane(vec![1, 2, 3, 255], 4)],
            },
        };
        renderer.render_frame(&frame).unwrap();
        assert_eq!(renderer.frame_buffer(), &[3, 2, 1, 255]);
    }

    #[test]
    fn test_hardware_frame_is_a_render_error() {
        let pool = HwFramePool::new(PixelFormat::D3d11, PixelFormat::Nv12, 2, 2, 2);
        let frame = VideoFrame {
            width: 2,
            height: 2,
            pts: Some(0),
            time_base: TimeBase::MILLISECONDS,
            content: FrameContent::Hardware {
                format: PixelFormat::D3d11,
                surface: pool.acquire(0).unwrap(),
            },
        };

        let mut renderer = SoftwareRenderer::new();
        let err = renderer.render_frame(&frame).unwrap_err();
        assert!(matches!(err, PlayerError::RenderError(_)));
    }

    #[test]
    fn test_cleanup_releases_buffer() {
        let mut renderer = SoftwareRenderer::new();
        renderer.render_frame(&yuv_frame()).unwrap();
        renderer.cleanup();
        assert!(renderer.frame_buffer().is_empty());
    }
}
