use std::fmt;

/// Returned when dereferencing a [`SharedPtr`](crate::SharedPtr) that does
/// not point to anything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NullDeref;

impl fmt::Display for NullDeref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dereferencing a null SharedPtr")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for NullDeref {}
