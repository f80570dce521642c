use std::cell::Cell;
use std::ptr::NonNull;

pub(crate) mod inline;
pub(crate) mod separate;

pub(crate) use inline::InlineBlock;
pub(crate) use separate::SeparateBlock;

/// A concrete control block layout
///
/// # Safety
///
/// * `Self` must be `#[repr(C)]` with a [`ControlBlock`] as its first field
/// * `dispose` must destroy the managed object, it is called exactly once
/// * `free` must release the allocation `this` lives in, it is called exactly
/// once and after `dispose`
pub(crate) unsafe trait BlockKind: Sized {
    /// # Safety
    ///
    /// * the managed object must not have been disposed yet
    /// * nothing may access the managed object after this call
    unsafe fn dispose(this: NonNull<Self>);

    /// # Safety
    ///
    /// * `this` must not be used after this call
    unsafe fn free(this: NonNull<Self>);
}

/// The reference counts shared by every handle to one managed object, and
/// the type-erased way to destroy it
pub(crate) struct ControlBlock {
    strong: Cell<usize>,
    weak: Cell<usize>,
    dispose: unsafe fn(NonNull<ControlBlock>),
    free: unsafe fn(NonNull<ControlBlock>),
}

unsafe fn dispose_as<B: BlockKind>(block: NonNull<ControlBlock>) {
    B::dispose(block.cast())
}

unsafe fn free_as<B: BlockKind>(block: NonNull<ControlBlock>) {
    B::free(block.cast())
}

impl ControlBlock {
    /// A header for a block of kind `B`, holding one strong reference
    pub fn new<B: BlockKind>() -> Self {
        Self {
            strong: Cell::new(1),
            weak: Cell::new(0),
            dispose: dispose_as::<B>,
            free: free_as::<B>,
        }
    }

    #[inline]
    pub fn strong_count(&self) -> usize {
        self.strong.get()
    }

    #[inline]
    pub fn weak_count(&self) -> usize {
        self.weak.get()
    }

    #[inline]
    pub fn increment_strong(&self) {
        debug_assert_ne!(self.strong.get(), 0, "tried to revive a disposed object");
        self.strong.set(incremented(self.strong.get()));
    }

    /// Adds a strong reference if the object is still alive
    ///
    /// returns true on success
    #[inline]
    pub fn try_increment_strong(&self) -> bool {
        let strong = self.strong.get();

        if strong == 0 {
            false
        } else {
            self.strong.set(incremented(strong));
            true
        }
    }

    #[inline]
    pub fn increment_weak(&self) {
        self.weak.set(incremented(self.weak.get()));
    }
}

/// `count + 1`, checked before anything is stored so an overflow leaves the
/// block untouched
#[inline]
fn incremented(count: usize) -> usize {
    match count.checked_add(1) {
        Some(count) => count,
        None => overflow(),
    }
}

#[cold]
#[inline(never)]
fn overflow() -> ! {
    panic!("reference count overflow")
}

/// Gives up one strong reference, disposing of the object if it was the last
///
/// # Safety
///
/// * the caller must own a strong reference to `block`
/// * `block` must not be used by the caller after this call
pub(crate) unsafe fn release_strong(block: NonNull<ControlBlock>) {
    let header = block.as_ref();
    debug_assert_ne!(header.strong.get(), 0, "strong count underflow");

    let strong = header.strong.get() - 1;
    header.strong.set(strong);

    if strong != 0 {
        return;
    }

    // the block must outlive the disposal, even if the object's destructor
    // drops the last `WeakPtr` to it
    header.increment_weak();
    let dispose = header.dispose;
    defer! { release_weak(block) }

    log::trace!("disposing of the object managed by {:p}", block);
    dispose(block);
}

/// Gives up one weak reference, freeing the block if nothing refers to it
///
/// # Safety
///
/// * the caller must own a weak reference to `block`
/// * `block` must not be used by the caller after this call
pub(crate) unsafe fn release_weak(block: NonNull<ControlBlock>) {
    let header = block.as_ref();
    debug_assert_ne!(header.weak.get(), 0, "weak count underflow");

    let weak = header.weak.get() - 1;
    header.weak.set(weak);

    if weak == 0 && header.strong.get() == 0 {
        let free = header.free;
        log::trace!("freeing control block {:p}", block);
        free(block);
    }
}
