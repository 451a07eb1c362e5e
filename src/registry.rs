//! Registries for compiler-emitted metadata sections.
//!
//! Each loaded image (the executable and every shared library) carries
//! sections of protocol conformance and type metadata records emitted by
//! the compiler. An image-load hook hands each section to the matching
//! registry as a `(pointer, size)` block. The runtime's lookup tables come
//! up later than the first images, so a registry buffers blocks until the
//! lookup side activates it, then drains the buffer in contribution order
//! and forwards every later block directly.
//!
//! The two registries (one per record kind) are independent process-wide
//! instances of the same type; there is no ordering guarantee between them.

use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

/// A `(pointer, size)` descriptor of one metadata section in one image.
///
/// The pointer borrows the image's own loaded memory, which stays mapped
/// for the life of the process; the registry never owns or frees it. A
/// block with `size == 0` means "this image has no such section" and is
/// discarded at the [`SectionRegistry::contribute`] boundary.
#[derive(Clone, Copy, Debug)]
pub struct SectionInfo {
    /// Start of the section's bytes in the image's loaded memory.
    pub data: *const u8,
    /// Length of the section in bytes.
    pub size: usize,
}

// The pointed-to image memory outlives the process, so moving the
// descriptor between threads is sound.
unsafe impl Send for SectionInfo {}

/// Callback that receives one `(pointer, size)` block per metadata section.
pub type DrainFn = Box<dyn Fn(*const u8, usize) + Send>;

enum DrainTarget {
    /// Lookup tables not ready yet; blocks accumulate in contribution order.
    Inactive(Vec<SectionInfo>),
    /// Lookup tables active; blocks forward directly. No buffer exists in
    /// this state, so post-activation buffering is impossible.
    Active(DrainFn),
}

/// Collects metadata section blocks from loaded images and hands each one
/// to the drain callback exactly once.
pub struct SectionRegistry {
    state: Mutex<DrainTarget>,
}

impl SectionRegistry {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(DrainTarget::Inactive(Vec::new())),
        }
    }

    // contribute and activate never fail, so a poisoned lock (a drain
    // callback panicked) cannot leave the registry unusable.
    fn lock(&self) -> MutexGuard<'_, DrainTarget> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records one metadata section block.
    ///
    /// Before activation the block is buffered; afterwards it is forwarded
    /// to the drain callback immediately. Blocks with `size == 0` carry no
    /// records and are dropped. Safe to call from any number of threads
    /// concurrently; the drain observes blocks in contribution order.
    pub fn contribute(&self, block: SectionInfo) {
        if block.size == 0 {
            return;
        }
        let mut state = self.lock();
        match &mut *state {
            DrainTarget::Inactive(buffer) => buffer.push(block),
            DrainTarget::Active(drain) => drain(block.data, block.size),
        }
    }

    /// Activates the registry, forwarding every buffered block to `drain`
    /// in contribution order and releasing the buffer's storage. All later
    /// contributions forward directly.
    ///
    /// Must be called at most once per registry; the buffer is gone after
    /// the first call, so a second call has nothing left to drain.
    pub fn activate(&self, drain: impl Fn(*const u8, usize) + Send + 'static) {
        let mut state = self.lock();
        let buffered = match std::mem::replace(&mut *state, DrainTarget::Active(Box::new(drain))) {
            DrainTarget::Inactive(buffer) => buffer,
            DrainTarget::Active(_) => {
                debug_assert!(false, "section registry activated twice");
                Vec::new()
            }
        };
        if !buffered.is_empty() {
            log::debug!("draining {} buffered metadata blocks", buffered.len());
        }
        // Still under the lock, so a racing contribute either lands in the
        // buffer drained above or forwards after all buffered blocks.
        if let DrainTarget::Active(drain) = &*state {
            for block in buffered {
                drain(block.data, block.size);
            }
        }
    }
}

impl Default for SectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn protocol_conformance_registry() -> &'static SectionRegistry {
    static REGISTRY: OnceLock<SectionRegistry> = OnceLock::new();
    REGISTRY.get_or_init(SectionRegistry::new)
}

fn type_metadata_registry() -> &'static SectionRegistry {
    static REGISTRY: OnceLock<SectionRegistry> = OnceLock::new();
    REGISTRY.get_or_init(SectionRegistry::new)
}

/// Records one image's protocol conformance section.
///
/// Called once per loaded image (including the initial executable) by the
/// loader-integration layer; `(ptr, 0)` for an image without the section
/// is a safe no-op.
pub fn add_protocol_conformance_block(block: SectionInfo) {
    protocol_conformance_registry().contribute(block);
}

/// Activates protocol conformance forwarding once the runtime's conformance
/// lookup table is ready to receive records. Call at most once.
pub fn initialize_protocol_conformance_lookup(drain: impl Fn(*const u8, usize) + Send + 'static) {
    protocol_conformance_registry().activate(drain);
}

/// Records one image's type metadata record section.
///
/// Called once per loaded image by the loader-integration layer; `(ptr, 0)`
/// for an image without the section is a safe no-op.
pub fn add_type_metadata_block(block: SectionInfo) {
    type_metadata_registry().contribute(block);
}

/// Activates type metadata forwarding once the runtime's type lookup table
/// is ready to receive records. Call at most once.
pub fn initialize_type_metadata_lookup(drain: impl Fn(*const u8, usize) + Send + 'static) {
    type_metadata_registry().activate(drain);
}
