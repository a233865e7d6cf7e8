//! Type System for the host runtime boundary
//!
//! This module provides object kinds and packed handles for identifying
//! objects that live in the dynamic runtime's heap.
//!
//! Handles are plain 64-bit values so they can cross an FFI boundary
//! unchanged; they never own the object they refer to.

/// Kinds of objects the dynamic runtime can hold
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    None = 0x00,
    Bool = 0x01,
    Int = 0x02,
    UInt = 0x03,
    Float = 0x04,
    Str = 0x05,
    Wrapped = 0x06,
}

impl ObjectKind {
    /// Human readable name, used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::UInt => "uint",
            Self::Float => "float",
            Self::Str => "str",
            Self::Wrapped => "wrapped",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Handle - 64-bit packed object reference
///
/// Layout: `[generation:32][slot + 1:32]`
///
/// The slot is stored off by one so that the all-zero value is never a live
/// object and can serve as [`Handle::NULL`]. The generation lets the heap
/// tell a released handle apart from a reused slot.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Handle(pub u64);

impl Handle {
    /// The null handle
    pub const NULL: Self = Self(0);

    /// Create a handle for a slot and generation.
    ///
    /// `slot` must be below `u32::MAX`; the heap never issues that index.
    #[inline]
    pub const fn new(slot: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (slot as u64 + 1))
    }

    /// Check if this is the null handle
    #[inline]
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Slot index, or `None` for the null handle
    #[inline]
    pub fn slot(&self) -> Option<u32> {
        let low = (self.0 & 0xFFFF_FFFF) as u32;
        low.checked_sub(1)
    }

    /// Generation counter of the slot this handle was issued for
    #[inline]
    pub fn generation(&self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.slot() {
            Some(slot) => write!(f, "#{}@{}", slot, self.generation()),
            None => f.write_str("#null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_components() {
        let h = Handle::new(7, 3);

        assert_eq!(h.slot(), Some(7));
        assert_eq!(h.generation(), 3);
        assert!(!h.is_null());
    }

    #[test]
    fn test_null_handle() {
        assert!(Handle::NULL.is_null());
        assert_eq!(Handle::NULL.slot(), None);
        assert_eq!(Handle::default(), Handle::NULL);

        // Slot 0 in generation 0 must not collide with null
        assert!(!Handle::new(0, 0).is_null());
    }

    #[test]
    fn test_handle_display() {
        assert_eq!(Handle::new(2, 5).to_string(), "#2@5");
        assert_eq!(Handle::NULL.to_string(), "#null");
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ObjectKind::UInt.to_string(), "uint");
        assert_eq!(ObjectKind::Wrapped as u8, 0x06);
    }
}
