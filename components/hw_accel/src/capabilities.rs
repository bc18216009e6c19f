//! Hardware decode capabilities reporting

use lumenplay_shared_types::{CodecId, HwDeviceKind};

/// Capabilities of a hardware decode device
///
/// Conservative per-platform defaults: the codec service is the final
/// authority (decoder open still fails for unsupported profiles), but the
/// render-path choice consults this first so obviously hopeless streams
/// never attempt the hardware route.
///
/// # Examples
///
/// ```
/// use lumenplay_hw_accel::HardwareCapabilities;
/// use lumenplay_shared_types::{CodecId, HwDeviceKind};
///
/// let caps = HardwareCapabilities::detect(HwDeviceKind::D3d11);
/// assert!(caps.supports(CodecId::H264, 1920, 1080));
/// assert!(!caps.supports(CodecId::Mpeg4, 1920, 1080));
/// ```
#[derive(Debug, Clone)]
pub struct HardwareCapabilities {
    /// Device API these capabilities describe
    pub kind: HwDeviceKind,
    /// Codecs the platform decoder commonly accepts
    pub supported_codecs: Vec<CodecId>,
    /// Maximum decodable resolution (width, height)
    pub max_resolution: (u32, u32),
}

impl HardwareCapabilities {
    /// Returns the conservative capability set for a device kind
    pub fn detect(kind: HwDeviceKind) -> Self {
        match kind {
            HwDeviceKind::D3d11 => Self {
                kind,
                supported_codecs: vec![CodecId::H264, CodecId::Hevc, CodecId::Vp9, CodecId::Av1],
                max_resolution: (7680, 4320),
            },
            HwDeviceKind::Vaapi => Self {
                kind,
                supported_codecs: vec![CodecId::H264, CodecId::Hevc, CodecId::Vp9, CodecId::Av1],
                max_resolution: (4096, 4096),
            },
            HwDeviceKind::VideoToolbox => Self {
                kind,
                supported_codecs: vec![CodecId::H264, CodecId::Hevc],
                max_resolution: (8192, 4320),
            },
        }
    }

    /// Returns whether a stream of this codec and size can be decoded
    pub fn supports(&self, codec: CodecId, width: u32, height: u32) -> bool {
        self.supported_codecs.contains(&codec)
            && width <= self.max_resolution.0
            && height <= self.max_resolution.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_codecs_supported_everywhere() {
        for kind in [
            HwDeviceKind::D3d11,
            HwDeviceKind::Vaapi,
            HwDeviceKind::VideoToolbox,
        ] {
            let caps = HardwareCapabilities::detect(kind);
            assert!(caps.supports(CodecId::H264, 1920, 1080));
            assert!(caps.supports(CodecId::Hevc, 3840, 2160));
        }
    }

    #[test]
    fn test_resolution_limit() {
        let caps = HardwareCapabilities::detect(HwDeviceKind::Vaapi);
        assert!(!caps.supports(CodecId::H264, 7680, 4320));
    }

    #[test]
    fn test_audio_codecs_never_hardware() {
        let caps = HardwareCapabilities::detect(HwDeviceKind::D3d11);
        assert!(!caps.supports(CodecId::Aac, 1920, 1080));
        assert!(!caps.supports(CodecId::Mp3, 0, 0));
    }
}
