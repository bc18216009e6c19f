//! Hardware decode context and format-selection callback

use crate::HardwareCapabilities;
use lumenplay_shared_types::{
    BindFlags, CodecContext, HwDeviceKind, HwFormatSelector, HwFramePool, PixelFormat, PlayerError,
    PlayerResult, SharedHwDevice,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Extra surfaces over the framework-derived pool size for general pipeline
/// reference and buffer-pool overhead
pub const POOL_PIPELINE_HEADROOM: u32 = 6;

/// Additional surfaces because the frame queues here are deeper than a
/// direct-render design: surfaces stay live across the
/// decoder → queue → renderer chain
pub const POOL_QUEUE_HEADROOM: u32 = 2;

/// Bridge between the decoder and the GPU resources a renderer consumes
///
/// The context holds the shared device handle and hands the codec framework
/// a [`HwFormatSelector`] whose callbacks stop working the moment the
/// context is dropped: the selector only keeps a weak reference, so a
/// framework calling back after destruction gets an error instead of a
/// dangling context.
pub struct HwContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    device: SharedHwDevice,
    owns_device: bool,
    capabilities: HardwareCapabilities,
    last_pool_generation: Mutex<Option<Uuid>>,
}

impl HwContext {
    /// Creates a context with a fresh device of the platform-default kind
    pub fn new() -> PlayerResult<Self> {
        Self::with_kind(HwDeviceKind::platform_default())
    }

    /// Creates a context with a fresh device of the given kind
    pub fn with_kind(kind: HwDeviceKind) -> PlayerResult<Self> {
        let device = SharedHwDevice::new(kind);
        info!(kind = ?kind, device = %device.id(), "created hardware device");
        Ok(Self {
            inner: Arc::new(ContextInner {
                device,
                owns_device: true,
                capabilities: HardwareCapabilities::detect(kind),
                last_pool_generation: Mutex::new(None),
            }),
        })
    }

    /// Adopts a device a render backend already created
    ///
    /// The renderer remains the owner; both sides hold strong references and
    /// the facade's cleanup sequence enforces drop order.
    pub fn from_renderer_device(device: SharedHwDevice) -> Self {
        debug!(kind = ?device.kind(), device = %device.id(), "sharing renderer device");
        let capabilities = HardwareCapabilities::detect(device.kind());
        Self {
            inner: Arc::new(ContextInner {
                device,
                owns_device: false,
                capabilities,
                last_pool_generation: Mutex::new(None),
            }),
        }
    }

    /// Returns the shared device handle
    pub fn device(&self) -> &SharedHwDevice {
        &self.inner.device
    }

    /// Returns the device kind
    pub fn kind(&self) -> HwDeviceKind {
        self.inner.device.kind()
    }

    /// Returns the hardware pixel format the codec must select
    pub fn pixel_format(&self) -> PixelFormat {
        self.inner.device.kind().surface_format()
    }

    /// Returns whether this context created its device (vs adopted one)
    pub fn owns_device(&self) -> bool {
        self.inner.owns_device
    }

    /// Returns the device's conservative capability set
    pub fn capabilities(&self) -> &HardwareCapabilities {
        &self.inner.capabilities
    }

    /// Wires hardware decoding into a codec context
    ///
    /// Attaches the device reference and installs the `get_format` callback.
    /// Must run before the first packet is submitted.
    ///
    /// # Errors
    ///
    /// Propagates the codec service's failure when the codec or profile has
    /// no hardware support; the caller downgrades to software decoding.
    pub fn configure_decoder(&self, ctx: &mut dyn CodecContext) -> PlayerResult<()> {
        let selector = Arc::new(ContextSelector {
            inner: Arc::downgrade(&self.inner),
        });
        ctx.attach_hw_device(&self.inner.device, selector)
    }

    /// Reports whether the effective pool satisfies the zero-copy contract
    ///
    /// Zero copy requires the pool's surfaces to be decoder-writable and
    /// shader-readable at once. Called once, after the first decoded
    /// hardware frame.
    pub fn validate_zero_copy(&self, pool: &HwFramePool) -> bool {
        let enabled = pool
            .bind_flags
            .contains(BindFlags::DECODER | BindFlags::SHADER_RESOURCE);
        if enabled {
            info!(
                pool_size = pool.initial_pool_size,
                "zero-copy rendering enabled"
            );
        } else {
            warn!(
                flags = pool.bind_flags.bits(),
                "frame pool lacks shader binding; zero-copy disabled"
            );
        }
        enabled
    }
}

impl fmt::Debug for HwContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HwContext")
            .field("kind", &self.kind())
            .field("owns_device", &self.inner.owns_device)
            .finish()
    }
}

/// The `get_format` callback object installed into the codec context
struct ContextSelector {
    inner: Weak<ContextInner>,
}

impl HwFormatSelector for ContextSelector {
    fn select_format(
        &self,
        offered: &[PixelFormat],
        pool: &mut HwFramePool,
    ) -> PlayerResult<PixelFormat> {
        let inner = self.inner.upgrade().ok_or_else(|| {
            PlayerError::NotInitialized("hardware context destroyed".to_string())
        })?;
        inner.select_format(offered, pool)
    }
}

impl ContextInner {
    fn select_format(
        &self,
        offered: &[PixelFormat],
        pool: &mut HwFramePool,
    ) -> PlayerResult<PixelFormat> {
        let wanted = self.device.kind().surface_format();
        if !offered.contains(&wanted) {
            return Err(PlayerError::NotSupported(format!(
                "codec did not offer {:?}",
                wanted
            )));
        }

        let mut last = self.last_pool_generation.lock();
        match *last {
            // Same pool asking again: already patched, nothing to re-derive
            Some(generation) if generation == pool.generation() => return Ok(wanted),
            Some(_) => {
                debug!(
                    generation = %pool.generation(),
                    "frame pool replaced by the framework; re-deriving"
                );
            }
            None => {}
        }

        let base = pool.initial_pool_size;
        pool.initial_pool_size = base + POOL_PIPELINE_HEADROOM + POOL_QUEUE_HEADROOM;

        if !pool.bind_flags.contains(BindFlags::SHADER_RESOURCE) {
            // The framework derived a decode-only pool; patch and re-init
            pool.bind_flags.insert(BindFlags::SHADER_RESOURCE);
            debug!("re-initialized frame pool with shader-resource binding");
        }

        debug!(
            base,
            effective = pool.initial_pool_size,
            flags = pool.bind_flags.bits(),
            "frame pool derived"
        );
        *last = Some(pool.generation());
        Ok(wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derived_pool(size: u32) -> HwFramePool {
        HwFramePool::new(PixelFormat::D3d11, PixelFormat::Nv12, 1920, 1080, size)
    }

    fn selector_for(context: &HwContext) -> ContextSelector {
        ContextSelector {
            inner: Arc::downgrade(&context.inner),
        }
    }

    #[test]
    fn test_pool_gains_eight_surfaces() {
        let context = HwContext::with_kind(HwDeviceKind::D3d11).unwrap();
        let selector = selector_for(&context);

        let mut pool = derived_pool(12);
        let format = selector
            .select_format(&[PixelFormat::Yuv420p, PixelFormat::D3d11], &mut pool)
            .unwrap();
        assert_eq!(format, PixelFormat::D3d11);
        assert_eq!(pool.initial_pool_size, 20);
    }

    #[test]
    fn test_bind_flags_patched_and_decoder_preserved() {
        let context = HwContext::with_kind(HwDeviceKind::D3d11).unwrap();
        let selector = selector_for(&context);

        let mut pool = derived_pool(10);
        assert!(!pool.bind_flags.contains(BindFlags::SHADER_RESOURCE));
        selector
            .select_format(&[PixelFormat::D3d11], &mut pool)
            .unwrap();
        assert!(pool
            .bind_flags
            .contains(BindFlags::DECODER | BindFlags::SHADER_RESOURCE));
    }

    #[test]
    fn test_same_pool_not_patched_twice() {
        let context = HwContext::with_kind(HwDeviceKind::D3d11).unwrap();
        let selector = selector_for(&context);

        let mut pool = derived_pool(10);
        selector
            .select_format(&[PixelFormat::D3d11], &mut pool)
            .unwrap();
        selector
            .select_format(&[PixelFormat::D3d11], &mut pool)
            .unwrap();
        assert_eq!(pool.initial_pool_size, 18);
    }

    #[test]
    fn test_replacement_pool_is_rederived() {
        let context = HwContext::with_kind(HwDeviceKind::D3d11).unwrap();
        let selector = selector_for(&context);

        let mut first = derived_pool(10);
        selector
            .select_format(&[PixelFormat::D3d11], &mut first)
            .unwrap();

        // Framework replaces the pool after a format change
        let mut second = derived_pool(16);
        selector
            .select_format(&[PixelFormat::D3d11], &mut second)
            .unwrap();
        assert_eq!(second.initial_pool_size, 24);
        assert!(second.bind_flags.contains(BindFlags::SHADER_RESOURCE));
    }

    #[test]
    fn test_unoffered_format_is_rejected() {
        let context = HwContext::with_kind(HwDeviceKind::Vaapi).unwrap();
        let selector = selector_for(&context);
        let mut pool = derived_pool(10);
        let result = selector.select_format(&[PixelFormat::Yuv420p], &mut pool);
        assert!(matches!(result, Err(PlayerError::NotSupported(_))));
    }

    #[test]
    fn test_callback_fails_after_context_drop() {
        let context = HwContext::with_kind(HwDeviceKind::D3d11).unwrap();
        let selector = selector_for(&context);
        drop(context);

        let mut pool = derived_pool(10);
        let result = selector.select_format(&[PixelFormat::D3d11], &mut pool);
        assert!(matches!(result, Err(PlayerError::NotInitialized(_))));
        // The pool was not touched
        assert_eq!(pool.initial_pool_size, 10);
    }

    #[test]
    fn test_renderer_device_is_shared_not_copied() {
        let device = SharedHwDevice::new(HwDeviceKind::D3d11);
        let context = HwContext::from_renderer_device(device.clone());
        assert!(context.device().same_device(&device));
        assert!(!context.owns_device());
    }

    #[test]
    fn test_zero_copy_validation() {
        let context = HwContext::with_kind(HwDeviceKind::D3d11).unwrap();

        let mut pool = derived_pool(10);
        assert!(!context.validate_zero_copy(&pool));
        pool.bind_flags.insert(BindFlags::SHADER_RESOURCE);
        assert!(context.validate_zero_copy(&pool));
    }
}
