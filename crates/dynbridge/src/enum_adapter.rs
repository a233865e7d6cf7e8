//! Enum Adapter
//!
//! Enumerations cross the boundary as plain integers. Any type implementing
//! [`IntEnum`] gets its converters from [`enum_as_int_converters!`], which
//! delegates to the converter of the representation integer.
//!
//! The adapter never validates membership: an integer outside the declared
//! set still converts, producing an enum value that holds that integer. A
//! Rust `enum` cannot hold an undeclared discriminant, so enums exchanged
//! this way are *open enums*, declared with [`int_enum!`]:
//!
//! ```rust
//! use dynbridge::{int_enum, to_dynamic, to_native, Type};
//! use dynrt::{HostRuntime, ManagedHeap};
//!
//! int_enum! {
//!     pub struct Color(i64) {
//!         RED = 0,
//!         GREEN = 1,
//!         BLUE = 2,
//!     }
//! }
//!
//! let heap = ManagedHeap::new();
//! let h = to_dynamic(&heap, 7i64).unwrap();
//! let color = to_native(&heap, h, Type::<Color>::new()).unwrap();
//! assert_eq!(color, Color(7));
//! assert!(!color.is_declared());
//! heap.decref(h);
//! ```
//!
//! Overflow of the representation integer follows the integer converters:
//! it is reported as `IntegerOverflow`, never truncated.

use dynrt::{Handle, HostRuntime};

use crate::convert::{FromDynamic, ToDynamic};
use crate::error::ConversionResult;

/// An enumeration represented by an integer type.
///
/// `from_repr` must accept every value of `Repr`; it is a reinterpretation,
/// not a validation.
pub trait IntEnum: Copy {
    /// Integer type carrying the value across the boundary
    type Repr: ToDynamic + FromDynamic + Copy;

    /// Reinterpret an integer as this enum
    fn from_repr(repr: Self::Repr) -> Self;

    /// Numeric value of this enum
    fn to_repr(self) -> Self::Repr;
}

/// `to_dynamic` for an [`IntEnum`]: converts the representation integer
pub fn enum_to_dynamic<E: IntEnum, H: HostRuntime>(host: &H, value: E) -> ConversionResult<Handle> {
    value.to_repr().to_dynamic(host)
}

/// `to_native` for an [`IntEnum`]: extracts the representation integer and
/// reinterprets it without checking membership
pub fn enum_from_dynamic<E: IntEnum, H: HostRuntime>(host: &H, handle: Handle) -> ConversionResult<E> {
    E::Repr::from_dynamic(host, handle).map(E::from_repr)
}

/// Implement `ToDynamic`/`FromDynamic` for one or more [`IntEnum`] types.
#[macro_export]
macro_rules! enum_as_int_converters {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::ToDynamic for $ty {
            fn to_dynamic<H: $crate::dynrt::HostRuntime>(
                self,
                host: &H,
            ) -> $crate::ConversionResult<$crate::dynrt::Handle> {
                $crate::enum_adapter::enum_to_dynamic(host, self)
            }
        }

        impl $crate::FromDynamic for $ty {
            fn from_dynamic<H: $crate::dynrt::HostRuntime>(
                host: &H,
                handle: $crate::dynrt::Handle,
            ) -> $crate::ConversionResult<Self> {
                $crate::enum_adapter::enum_from_dynamic(host, handle)
            }
        }
    )+};
}

/// Declare an open enum: a transparent integer newtype with named members,
/// an [`IntEnum`] impl and boundary converters.
#[macro_export]
macro_rules! int_enum {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident($repr:ty) {
            $( $(#[$vmeta:meta])* $variant:ident = $value:expr ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(transparent)]
        $vis struct $name(pub $repr);

        #[allow(dead_code)]
        impl $name {
            $( $(#[$vmeta])* pub const $variant: Self = Self($value); )*

            /// Declared members, in declaration order
            pub const VARIANTS: &'static [(&'static str, Self)] = &[
                $( (stringify!($variant), Self::$variant) ),*
            ];

            /// Name of the declared member equal to this value
            pub fn name(&self) -> Option<&'static str> {
                Self::VARIANTS
                    .iter()
                    .find(|(_, member)| member == self)
                    .map(|(name, _)| *name)
            }

            /// Check if this value is one of the declared members
            pub fn is_declared(&self) -> bool {
                self.name().is_some()
            }
        }

        impl $crate::IntEnum for $name {
            type Repr = $repr;

            fn from_repr(repr: $repr) -> Self {
                Self(repr)
            }

            fn to_repr(self) -> $repr {
                self.0
            }
        }

        $crate::enum_as_int_converters!($name);
    };
}

#[cfg(test)]
mod tests {
    use crate::{to_dynamic, to_native, ConversionError, Type};
    use dynrt::{HostRuntime, ManagedHeap};

    int_enum! {
        /// Test enum with a narrow representation
        pub struct Level(i8) {
            LOW = 0,
            MID = 1,
            HIGH = 2,
        }
    }

    #[test]
    fn test_declared_member_roundtrip() {
        let heap = ManagedHeap::new();
        let h = to_dynamic(&heap, Level::MID).unwrap();

        assert_eq!(to_native(&heap, h, Type::<i64>::new()).unwrap(), 1);
        assert_eq!(to_native(&heap, h, Type::<Level>::new()).unwrap(), Level::MID);
        heap.decref(h);
    }

    #[test]
    fn test_member_names() {
        assert_eq!(Level::HIGH.name(), Some("HIGH"));
        assert_eq!(Level(9).name(), None);
        assert_eq!(Level::VARIANTS.len(), 3);
    }

    #[test]
    fn test_representation_overflow() {
        let heap = ManagedHeap::new();
        let h = to_dynamic(&heap, 1000i64).unwrap();

        let result = to_native(&heap, h, Type::<Level>::new());
        assert!(matches!(result, Err(ConversionError::IntegerOverflow { value: 1000, .. })));
        heap.decref(h);
    }
}
