#![cfg_attr(not(feature = "std"), no_std)]
//! Single-threaded reference counted pointers with custom deleters.
//!
//! [`SharedPtr`] owns a heap object together with every other `SharedPtr`
//! cloned from it, and disposes of the object as soon as the last one is
//! dropped. [`WeakPtr`] observes the same object without keeping it alive,
//! and can be promoted back into a `SharedPtr` with [`WeakPtr::lock`] while
//! the object still exists.
//!
//! Objects can be handed over in two ways:
//!
//! * [`make_shared`] places the object and its reference counts in one
//!   allocation
//! * [`SharedPtr::from_box`] and [`SharedPtr::from_raw_with_deleter`] adopt
//!   an object that already lives somewhere else, and allocate the reference
//!   counts separately
//!
//! ```
//! use shared_ptr::make_shared;
//!
//! let a = make_shared(10);
//! let b = a.clone();
//! let weak = b.downgrade();
//!
//! assert_eq!(a.use_count(), 2);
//! drop((a, b));
//!
//! assert!(weak.expired());
//! assert!(weak.lock().is_null());
//! ```

#[cfg(not(feature = "std"))]
extern crate core as std;

#[cfg(all(feature = "alloc", not(feature = "std")))]
extern crate alloc;

mod alloc_prelude {
    cfg_if::cfg_if! {
        if #[cfg(feature="std")] {
            pub use std::boxed::Box;
            pub use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
        } else if #[cfg(feature="alloc")] {
            pub use alloc::boxed::Box;
            pub use alloc::alloc::{alloc, dealloc, handle_alloc_error, Layout};
        } else {
            compile_error!("shared-ptr needs either the `std` or the `alloc` feature");
        }
    }
}

macro_rules! defer {
    ($($inner:tt)*) => {
        let _defer = crate::defer::Defer::new(|| $($inner)*);
    };
}

mod block;
mod defer;
mod error;
pub mod shared;
pub mod weak;

pub use error::NullDeref;
pub use shared::{make_shared, make_shared_with, SharedPtr};
pub use weak::WeakPtr;
