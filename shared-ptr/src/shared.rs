use crate::alloc_prelude::Box;
use crate::block::{self, separate::delete_box, ControlBlock, InlineBlock, SeparateBlock};
use crate::{NullDeref, WeakPtr};

use std::fmt;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

/// A single-threaded reference counted owning pointer
///
/// Cloning a `SharedPtr` adds an owner, dropping one removes it. The managed
/// object is disposed of as soon as the last owner goes away, using the
/// deleter it was created with.
///
/// An empty `SharedPtr` owns nothing. [`Deref`](std::ops::Deref) on an empty
/// pointer panics, use [`SharedPtr::try_deref`] to handle that case.
pub struct SharedPtr<T> {
    pub(crate) ptr: *mut T,
    pub(crate) block: Option<NonNull<ControlBlock>>,
    drop: PhantomData<T>,
}

/// Allocates `value` and its reference counts together
///
/// ```
/// let ptr = shared_ptr::make_shared(String::from("Ala ma kota"));
/// assert_eq!(ptr.chars().next(), Some('A'));
/// ```
pub fn make_shared<T>(value: T) -> SharedPtr<T> {
    make_shared_with(move || value)
}

/// Allocates the reference counts and then constructs the object with `init`
/// directly inside the same allocation
pub fn make_shared_with<T, F: FnOnce() -> T>(init: F) -> SharedPtr<T> {
    let block = InlineBlock::allocate(init);

    unsafe { SharedPtr::from_parts(InlineBlock::object_pointer(block), Some(block.cast())) }
}

impl<T> SharedPtr<T> {
    /// Creates a pointer to `value`, see [`make_shared`]
    #[inline]
    pub fn new(value: T) -> Self {
        make_shared(value)
    }

    /// An empty pointer, owning nothing
    #[inline]
    pub const fn null() -> Self {
        Self {
            ptr: ptr::null_mut(),
            block: None,
            drop: PhantomData,
        }
    }

    /// Takes over a boxed value, which is freed as a `Box` once the last
    /// owner is gone
    pub fn from_box(value: Box<T>) -> Self {
        unsafe { Self::from_raw(Box::into_raw(value)) }
    }

    /// Takes over `ptr`, a null `ptr` gives an empty pointer
    ///
    /// # Safety
    ///
    /// `ptr` must be null or come from `Box::<T>::into_raw`, and must not be
    /// owned by anything else
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        Self::from_raw_with_deleter(ptr, |ptr| delete_box(ptr))
    }

    /// Takes over `ptr`, which will be passed to `deleter` once the last
    /// owner is gone. A null `ptr` gives an empty pointer and `deleter` is
    /// dropped without being called
    ///
    /// # Safety
    ///
    /// * `ptr` must be null or valid for reads until `deleter` is called
    /// * anything `deleter` borrows must outlive every `SharedPtr` and
    /// `WeakPtr` to this object
    pub unsafe fn from_raw_with_deleter<D: FnOnce(*mut T)>(ptr: *mut T, deleter: D) -> Self {
        if ptr.is_null() {
            Self::null()
        } else {
            Self::from_parts(ptr, Some(SeparateBlock::allocate(ptr, deleter)))
        }
    }

    /// An empty pointer that still owns a control block, `deleter` is
    /// called with a null pointer once the last owner is gone
    ///
    /// ```
    /// use std::cell::Cell;
    /// use std::rc::Rc;
    ///
    /// let called = Rc::new(Cell::new(false));
    /// let ptr = shared_ptr::SharedPtr::<u8>::null_with_deleter({
    ///     let called = called.clone();
    ///     move |ptr: *mut u8| called.set(ptr.is_null())
    /// });
    ///
    /// assert!(ptr.is_null());
    /// assert_eq!(ptr.use_count(), 1);
    /// drop(ptr);
    /// assert!(called.get());
    /// ```
    pub fn null_with_deleter<D: FnOnce(*mut T) + 'static>(deleter: D) -> Self {
        let ptr = ptr::null_mut();
        unsafe { Self::from_parts(ptr, Some(SeparateBlock::allocate(ptr, deleter))) }
    }

    /// # Safety
    ///
    /// the caller must hand over one strong reference to `block`, and if
    /// `ptr` is not null, `block` must manage it
    #[inline]
    pub(crate) unsafe fn from_parts(ptr: *mut T, block: Option<NonNull<ControlBlock>>) -> Self {
        Self {
            ptr,
            block,
            drop: PhantomData,
        }
    }

    /// The managed object, without any checks
    #[inline]
    pub fn get(&self) -> *const T {
        self.ptr
    }

    /// The managed object, or `None` if this pointer is empty
    #[inline]
    pub fn as_ref(&self) -> Option<&T> {
        unsafe { self.ptr.as_ref() }
    }

    /// The managed object, or [`NullDeref`] if this pointer is empty
    #[inline]
    pub fn try_deref(&self) -> Result<&T, NullDeref> {
        self.as_ref().ok_or(NullDeref)
    }

    /// # Safety
    ///
    /// This pointer must not be empty
    #[inline]
    pub unsafe fn get_unchecked(&self) -> &T {
        debug_assert!(!self.ptr.is_null(), "get_unchecked on a null SharedPtr");
        &*self.ptr
    }

    /// Mutable access to the managed object, if this is the only strong
    /// reference and no `WeakPtr` observes it
    pub fn get_mut(&mut self) -> Option<&mut T> {
        if self.use_count() == 1 && self.weak_count() == 0 {
            unsafe { self.ptr.as_mut() }
        } else {
            None
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    /// The number of `SharedPtr`s owning this object, 0 if empty
    #[inline]
    pub fn use_count(&self) -> usize {
        self.block().map_or(0, ControlBlock::strong_count)
    }

    /// The number of `WeakPtr`s observing this object, 0 if empty
    #[inline]
    pub fn weak_count(&self) -> usize {
        self.block().map_or(0, ControlBlock::weak_count)
    }

    #[inline]
    fn block(&self) -> Option<&ControlBlock> {
        self.block.map(|block| unsafe { &*block.as_ptr() })
    }

    /// Moves the ownership out, leaving this pointer empty
    ///
    /// No reference counts change
    #[inline]
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Exchanges the objects of two pointers, no reference counts change
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other)
    }

    /// Releases the managed object, leaving this pointer empty
    pub fn reset(&mut self) {
        self.replace_with(Self::null())
    }

    /// Releases the managed object and takes over `value` instead
    pub fn reset_to(&mut self, value: Box<T>) {
        self.replace_with(Self::from_box(value))
    }

    /// Releases the managed object and takes over `ptr` instead
    ///
    /// # Safety
    ///
    /// see [`SharedPtr::from_raw`]
    pub unsafe fn reset_raw(&mut self, ptr: *mut T) {
        self.replace_with(Self::from_raw(ptr))
    }

    /// Releases the managed object and takes over `ptr` instead, to be
    /// destroyed by `deleter`
    ///
    /// # Safety
    ///
    /// see [`SharedPtr::from_raw_with_deleter`]
    pub unsafe fn reset_raw_with_deleter<D: FnOnce(*mut T)>(&mut self, ptr: *mut T, deleter: D) {
        self.replace_with(Self::from_raw_with_deleter(ptr, deleter))
    }

    fn replace_with(&mut self, mut fresh: Self) {
        fresh.swap(self);
        drop(fresh);
    }

    /// A `WeakPtr` observing this object
    #[inline]
    pub fn downgrade(&self) -> WeakPtr<T> {
        WeakPtr::from(self)
    }

    /// Whether both pointers manage the same object with the same counts
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr && self.block == other.block
    }
}

impl<T> Default for SharedPtr<T> {
    #[inline]
    fn default() -> Self {
        Self::null()
    }
}

impl<T> From<Box<T>> for SharedPtr<T> {
    #[inline]
    fn from(value: Box<T>) -> Self {
        Self::from_box(value)
    }
}

impl<T> Clone for SharedPtr<T> {
    #[inline]
    fn clone(&self) -> Self {
        if let Some(block) = self.block() {
            block.increment_strong();
        }

        Self { ..*self }
    }
}

impl<T> Drop for SharedPtr<T> {
    #[inline]
    fn drop(&mut self) {
        if let Some(block) = self.block.take() {
            unsafe { block::release_strong(block) }
        }
    }
}

impl<T> std::ops::Deref for SharedPtr<T> {
    type Target = T;

    #[track_caller]
    fn deref(&self) -> &T {
        match self.try_deref() {
            Ok(value) => value,
            Err(err) => panic!("{}", err),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for SharedPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_ref() {
            Some(value) => f.debug_tuple("SharedPtr").field(value).finish(),
            None => f.write_str("SharedPtr(null)"),
        }
    }
}

impl<T> fmt::Pointer for SharedPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.ptr, f)
    }
}

#[cfg(all(test, feature = "std"))]
mod test {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn clone_shares_the_object() {
        let a = make_shared(5);
        let b = a.clone();

        assert!(a.ptr_eq(&b));
        assert_eq!(a.use_count(), 2);
        assert_eq!(a.get(), b.get());
    }

    #[test]
    fn empty_pointer() {
        let ptr = SharedPtr::<i32>::null();

        assert!(ptr.is_null());
        assert_eq!(ptr.use_count(), 0);
        assert_eq!(ptr.weak_count(), 0);
        assert_eq!(ptr.try_deref(), Err(NullDeref));
        assert!(ptr.as_ref().is_none());
        assert!(ptr.clone().is_null());
    }

    #[test]
    #[should_panic(expected = "dereferencing a null SharedPtr")]
    fn deref_of_empty_panics() {
        let ptr = SharedPtr::<i32>::default();
        let _value: i32 = *ptr;
    }

    #[test]
    fn null_raw_pointer_has_no_block() {
        let called = Rc::new(Cell::new(false));

        let ptr = unsafe {
            SharedPtr::from_raw_with_deleter(ptr::null_mut::<i32>(), {
                let called = called.clone();
                move |_| called.set(true)
            })
        };

        assert!(ptr.is_null());
        assert_eq!(ptr.use_count(), 0);
        drop(ptr);
        assert!(!called.get());
        assert_eq!(Rc::strong_count(&called), 1);
    }

    #[test]
    fn clone_from_a_clone_of_itself() {
        let mut a = make_shared(7);
        let b = a.clone();

        a.clone_from(&b);

        assert_eq!(a.use_count(), 2);
        assert_eq!(*a, 7);
    }

    #[test]
    fn get_mut_needs_unique_ownership() {
        let mut a = make_shared(1);
        *a.get_mut().unwrap() += 1;
        assert_eq!(*a, 2);

        let b = a.clone();
        assert!(a.get_mut().is_none());
        drop(b);

        let weak = a.downgrade();
        assert!(a.get_mut().is_none());
        drop(weak);

        assert!(a.get_mut().is_some());
        assert!(SharedPtr::<i32>::null().get_mut().is_none());
    }

    #[test]
    fn formatting() {
        assert_eq!(format!("{:?}", make_shared(3)), "SharedPtr(3)");
        assert_eq!(format!("{:?}", SharedPtr::<u8>::null()), "SharedPtr(null)");

        let ptr = make_shared(0u8);
        assert_eq!(format!("{:p}", ptr), format!("{:p}", ptr.get()));
    }
}
