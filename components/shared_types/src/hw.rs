//! Hardware device, surface, and frame-pool handles
//!
//! The playback core never touches GPU APIs directly; it coordinates opaque
//! handles between the codec service, the hardware context, and renderers.
//! What it does enforce is ownership: a [`HwSurface`] is a move-only claim on
//! one slot of a bounded [`HwFramePool`], and the pool tracks how many claims
//! are live so exhaustion is observable.

use crate::{PixelFormat, PlayerError, PlayerResult};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::HwDeviceKind;

/// A GPU device shared between the hardware decode path and a renderer
///
/// Whoever constructs the device first owns the underlying platform object;
/// every other component holds a clone of this handle. The handle is opaque
/// to the core; renderers and codec backends resolve it to their native
/// device out of band via [`SharedHwDevice::id`].
#[derive(Clone)]
pub struct SharedHwDevice {
    inner: Arc<DeviceInner>,
}

struct DeviceInner {
    kind: HwDeviceKind,
    id: Uuid,
}

impl SharedHwDevice {
    /// Creates a new device handle of the given kind
    pub fn new(kind: HwDeviceKind) -> Self {
        Self {
            inner: Arc::new(DeviceInner {
                kind,
                id: Uuid::new_v4(),
            }),
        }
    }

    /// Returns the platform API this device belongs to
    pub fn kind(&self) -> HwDeviceKind {
        self.inner.kind
    }

    /// Returns the opaque device identity
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Returns how many strong references exist to the underlying device
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Returns whether two handles refer to the same device
    pub fn same_device(&self, other: &SharedHwDevice) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for SharedHwDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedHwDevice({:?}, {})", self.inner.kind, self.inner.id)
    }
}

/// Resource bind flags carried by a hardware frame pool
///
/// Models the D3D11 bind-flag field; other backends ignore flags they do not
/// know. The decode path requires [`BindFlags::DECODER`]; zero-copy rendering
/// additionally requires [`BindFlags::SHADER_RESOURCE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BindFlags(u32);

impl BindFlags {
    /// Surfaces may be written by the hardware decoder
    pub const DECODER: BindFlags = BindFlags(1 << 0);
    /// Surfaces may be sampled as shader resources
    pub const SHADER_RESOURCE: BindFlags = BindFlags(1 << 1);
    /// Surfaces may be bound as render targets
    pub const RENDER_TARGET: BindFlags = BindFlags(1 << 2);

    /// Returns an empty flag set
    pub fn empty() -> BindFlags {
        BindFlags(0)
    }

    /// Returns whether every flag in `other` is set in `self`
    pub fn contains(&self, other: BindFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Adds the given flags
    pub fn insert(&mut self, other: BindFlags) {
        self.0 |= other.0;
    }

    /// Returns the raw bits
    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl std::ops::BitOr for BindFlags {
    type Output = BindFlags;

    fn bitor(self, rhs: BindFlags) -> BindFlags {
        BindFlags(self.0 | rhs.0)
    }
}

/// Parameters of the bounded surface set a hardware decoder recycles
///
/// The codec framework derives the pool for a given decode session; the
/// hardware context then patches the size and bind flags before the pool is
/// applied. Clones share the live-surface counter, so any holder can observe
/// how many surfaces are currently claimed.
///
/// # Examples
///
/// ```
/// use lumenplay_shared_types::{BindFlags, HwFramePool, PixelFormat};
///
/// let pool = HwFramePool::new(PixelFormat::D3d11, PixelFormat::Nv12, 1920, 1080, 4);
/// let a = pool.acquire(0).unwrap();
/// assert_eq!(pool.live_surfaces(), 1);
/// drop(a);
/// assert_eq!(pool.live_surfaces(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct HwFramePool {
    generation: Uuid,
    /// Hardware pixel format surfaces carry
    pub format: PixelFormat,
    /// Software format to transfer into when zero-copy is unavailable
    pub sw_fallback_format: PixelFormat,
    /// Surface width in pixels
    pub width: u32,
    /// Surface height in pixels
    pub height: u32,
    /// Number of surfaces the pool allocates
    pub initial_pool_size: u32,
    /// Resource bind flags for the backing textures
    pub bind_flags: BindFlags,
    live: Arc<AtomicU32>,
}

impl HwFramePool {
    /// Creates a pool description with a fresh generation and no live surfaces
    pub fn new(
        format: PixelFormat,
        sw_fallback_format: PixelFormat,
        width: u32,
        height: u32,
        initial_pool_size: u32,
    ) -> Self {
        Self {
            generation: Uuid::new_v4(),
            format,
            sw_fallback_format,
            width,
            height,
            initial_pool_size,
            bind_flags: BindFlags::DECODER,
            live: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Returns the pool identity
    ///
    /// The codec framework may replace the pool mid-stream (format change);
    /// a changed generation tells the hardware context to re-derive.
    pub fn generation(&self) -> Uuid {
        self.generation
    }

    /// Returns the number of surfaces currently claimed from this pool
    pub fn live_surfaces(&self) -> u32 {
        self.live.load(Ordering::Acquire)
    }

    /// Claims the surface at `slice_index`
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::OutOfMemory`] when every pool surface is
    /// already claimed. This is the allocation-failure a decoder hits when
    /// frames are cloned instead of moved through the pipeline.
    pub fn acquire(&self, slice_index: u32) -> PlayerResult<HwSurface> {
        let prev = self.live.fetch_add(1, Ordering::AcqRel);
        if prev >= self.initial_pool_size {
            self.live.fetch_sub(1, Ordering::AcqRel);
            return Err(PlayerError::OutOfMemory(format!(
                "hardware frame pool exhausted ({} surfaces live)",
                prev
            )));
        }
        Ok(HwSurface {
            generation: self.generation,
            slice_index,
            live: Arc::clone(&self.live),
        })
    }
}

/// A move-only claim on one hardware surface
///
/// Dropping the surface returns its slot to the pool. The type deliberately
/// does not implement `Clone`: duplicating a claim would hold a pool slot
/// without creating capacity, which exhausts small decoder pools. Components
/// that need to look at a frame twice borrow it.
pub struct HwSurface {
    generation: Uuid,
    slice_index: u32,
    live: Arc<AtomicU32>,
}

impl HwSurface {
    /// Returns the generation of the pool this surface belongs to
    pub fn generation(&self) -> Uuid {
        self.generation
    }

    /// Returns the texture-array slice this surface occupies
    pub fn slice_index(&self) -> u32 {
        self.slice_index
    }
}

impl Drop for HwSurface {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::AcqRel);
    }
}

impl fmt::Debug for HwSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HwSurface(slice {}, pool {})",
            self.slice_index, self.generation
        )
    }
}
