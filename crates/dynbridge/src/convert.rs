//! Conversion traits for native/dynamic value interop
//!
//! `ToDynamic` and `FromDynamic` form the open converter registry: a type
//! crosses the boundary once it implements both, and the compiler picks the
//! implementation from the static type at the call site. Supporting a new
//! type never requires touching the impls in this module, and a type with no
//! impl is rejected at compile time rather than at runtime.
//!
//! Reference counting rules:
//! - `to_dynamic` always returns a **new** reference the caller must release;
//! - `from_dynamic` only borrows the handle and never changes its count.
//!
//! Narrowing integer conversions are checked: a value that does not fit the
//! target type fails with [`ConversionError::IntegerOverflow`]. Nothing is
//! truncated.

use std::ffi::{CStr, CString};
use std::fmt;
use std::marker::PhantomData;

use dynrt::{Handle, HostRuntime, ObjectKind, ObjectValue};

use crate::error::{ConversionError, ConversionResult};

/// Zero-sized marker naming the native type a conversion targets.
///
/// ```rust
/// use dynbridge::{to_dynamic, to_native, Type};
/// use dynrt::{HostRuntime, ManagedHeap};
///
/// let heap = ManagedHeap::new();
/// let h = to_dynamic(&heap, 42i32).unwrap();
/// assert_eq!(to_native(&heap, h, Type::<i64>::new()).unwrap(), 42);
/// heap.decref(h);
/// ```
pub struct Type<T: ?Sized>(PhantomData<fn() -> T>);

impl<T: ?Sized> Type<T> {
    /// Create the tag
    #[inline]
    pub const fn new() -> Self {
        Type(PhantomData)
    }
}

impl<T: ?Sized> Clone for Type<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for Type<T> {}

impl<T: ?Sized> Default for Type<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Type<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type<{}>", std::any::type_name::<T>())
    }
}

/// Convert a native value into a dynamic object.
///
/// Implementations must return a new reference: exactly one count owned by
/// the caller.
pub trait ToDynamic {
    /// Convert `self`, allocating on `host`
    fn to_dynamic<H: HostRuntime>(self, host: &H) -> ConversionResult<Handle>;
}

/// Convert a dynamic object into a native value.
///
/// Implementations borrow `handle`: they must not change its reference
/// count, and must report an incompatible object kind as
/// [`ConversionError::TypeMismatch`] instead of coercing it.
pub trait FromDynamic: Sized {
    /// Extract `Self` from the object behind `handle`
    fn from_dynamic<H: HostRuntime>(host: &H, handle: Handle) -> ConversionResult<Self>;

    /// Const-reference form of [`from_dynamic`](Self::from_dynamic).
    ///
    /// Rust has no separate `const T&` extraction, so this delegates to the
    /// value form. Overrides must return the same value.
    fn from_dynamic_ref<H: HostRuntime>(host: &H, handle: Handle) -> ConversionResult<Self> {
        Self::from_dynamic(host, handle)
    }
}

/// Convert a native value; the returned handle is a new reference.
pub fn to_dynamic<T: ToDynamic, H: HostRuntime>(host: &H, value: T) -> ConversionResult<Handle> {
    value.to_dynamic(host)
}

/// Extract a native value from a borrowed handle.
pub fn to_native<T: FromDynamic, H: HostRuntime>(
    host: &H,
    handle: Handle,
    _tag: Type<T>,
) -> ConversionResult<T> {
    T::from_dynamic(host, handle)
}

/// Const-reference form of [`to_native`], dispatched through
/// [`FromDynamic::from_dynamic_ref`].
pub fn to_native_ref<T: FromDynamic, H: HostRuntime>(
    host: &H,
    handle: Handle,
    _tag: Type<T>,
) -> ConversionResult<T> {
    T::from_dynamic_ref(host, handle)
}

/// Read an integral object as i128, reporting `expected` on mismatch
fn extract_integer<H: HostRuntime>(host: &H, handle: Handle, expected: ObjectKind) -> ConversionResult<i128> {
    let value = host.inspect(handle)?;
    value
        .as_integer()
        .ok_or_else(|| ConversionError::type_mismatch(expected, value.kind()))
}

// ============================================================================
// Integer Implementations
// ============================================================================

macro_rules! signed_converters {
    ($($ty:ty),* $(,)?) => {$(
        impl ToDynamic for $ty {
            fn to_dynamic<H: HostRuntime>(self, host: &H) -> ConversionResult<Handle> {
                Ok(host.new_int(self as i64)?)
            }
        }

        impl FromDynamic for $ty {
            fn from_dynamic<H: HostRuntime>(host: &H, handle: Handle) -> ConversionResult<Self> {
                let value = extract_integer(host, handle, ObjectKind::Int)?;
                <$ty>::try_from(value).map_err(|_| ConversionError::overflow::<$ty>(value))
            }
        }
    )*};
}

macro_rules! unsigned_converters {
    ($($ty:ty),* $(,)?) => {$(
        impl ToDynamic for $ty {
            fn to_dynamic<H: HostRuntime>(self, host: &H) -> ConversionResult<Handle> {
                Ok(host.new_uint(self as u64)?)
            }
        }

        impl FromDynamic for $ty {
            fn from_dynamic<H: HostRuntime>(host: &H, handle: Handle) -> ConversionResult<Self> {
                let value = extract_integer(host, handle, ObjectKind::UInt)?;
                <$ty>::try_from(value).map_err(|_| ConversionError::overflow::<$ty>(value))
            }
        }
    )*};
}

signed_converters!(i8, i16, i32, i64, isize);
unsigned_converters!(u8, u16, u32, u64, usize);

// ============================================================================
// Float Implementations
// ============================================================================

impl ToDynamic for f64 {
    fn to_dynamic<H: HostRuntime>(self, host: &H) -> ConversionResult<Handle> {
        Ok(host.new_float(self)?)
    }
}

impl FromDynamic for f64 {
    fn from_dynamic<H: HostRuntime>(host: &H, handle: Handle) -> ConversionResult<Self> {
        match host.inspect(handle)? {
            ObjectValue::Float(v) => Ok(v),
            ObjectValue::Int(v) => Ok(v as f64),
            ObjectValue::UInt(v) => Ok(v as f64),
            other => Err(ConversionError::type_mismatch(ObjectKind::Float, other.kind())),
        }
    }
}

impl ToDynamic for f32 {
    fn to_dynamic<H: HostRuntime>(self, host: &H) -> ConversionResult<Handle> {
        Ok(host.new_float(self as f64)?)
    }
}

impl FromDynamic for f32 {
    fn from_dynamic<H: HostRuntime>(host: &H, handle: Handle) -> ConversionResult<Self> {
        // Rounds to nearest; precision loss is not an error, leaving the
        // f32 range is. Infinities and NaN carry over unchanged.
        let value = f64::from_dynamic(host, handle)?;
        let narrowed = value as f32;
        if value.is_finite() && narrowed.is_infinite() {
            return Err(ConversionError::float_overflow::<f32>(value));
        }
        Ok(narrowed)
    }
}

// ============================================================================
// Bool Implementation
// ============================================================================

impl ToDynamic for bool {
    fn to_dynamic<H: HostRuntime>(self, host: &H) -> ConversionResult<Handle> {
        Ok(host.new_bool(self)?)
    }
}

impl FromDynamic for bool {
    fn from_dynamic<H: HostRuntime>(host: &H, handle: Handle) -> ConversionResult<Self> {
        match host.inspect(handle)? {
            ObjectValue::Bool(v) => Ok(v),
            ObjectValue::Int(v) => Ok(v != 0),
            ObjectValue::UInt(v) => Ok(v != 0),
            other => Err(ConversionError::type_mismatch(ObjectKind::Bool, other.kind())),
        }
    }
}

// ============================================================================
// String Implementations
// ============================================================================

fn extract_bytes<H: HostRuntime>(host: &H, handle: Handle) -> ConversionResult<Vec<u8>> {
    match host.inspect(handle)? {
        ObjectValue::Str(bytes) => Ok(bytes),
        other => Err(ConversionError::type_mismatch(ObjectKind::Str, other.kind())),
    }
}

impl ToDynamic for String {
    fn to_dynamic<H: HostRuntime>(self, host: &H) -> ConversionResult<Handle> {
        Ok(host.new_str(self.as_bytes())?)
    }
}

impl ToDynamic for &String {
    fn to_dynamic<H: HostRuntime>(self, host: &H) -> ConversionResult<Handle> {
        Ok(host.new_str(self.as_bytes())?)
    }
}

impl ToDynamic for &str {
    fn to_dynamic<H: HostRuntime>(self, host: &H) -> ConversionResult<Handle> {
        Ok(host.new_str(self.as_bytes())?)
    }
}

impl FromDynamic for String {
    fn from_dynamic<H: HostRuntime>(host: &H, handle: Handle) -> ConversionResult<Self> {
        Ok(String::from_utf8(extract_bytes(host, handle)?)?)
    }
}

/// Null-terminated byte strings: the terminator is not stored in the object.
impl ToDynamic for &CStr {
    fn to_dynamic<H: HostRuntime>(self, host: &H) -> ConversionResult<Handle> {
        Ok(host.new_str(self.to_bytes())?)
    }
}

impl ToDynamic for CString {
    fn to_dynamic<H: HostRuntime>(self, host: &H) -> ConversionResult<Handle> {
        self.as_c_str().to_dynamic(host)
    }
}

impl FromDynamic for CString {
    fn from_dynamic<H: HostRuntime>(host: &H, handle: Handle) -> ConversionResult<Self> {
        Ok(CString::new(extract_bytes(host, handle)?)?)
    }
}

// ============================================================================
// Raw Handle Passthrough
// ============================================================================

/// Passing a handle through takes a new reference to the same object.
impl ToDynamic for Handle {
    fn to_dynamic<H: HostRuntime>(self, host: &H) -> ConversionResult<Handle> {
        host.kind(self)?;
        host.incref(self);
        Ok(self)
    }
}

/// Extracting a handle yields the same handle, borrowed.
impl FromDynamic for Handle {
    fn from_dynamic<H: HostRuntime>(host: &H, handle: Handle) -> ConversionResult<Self> {
        host.kind(handle)?;
        Ok(handle)
    }
}

// ============================================================================
// Unit / None Implementation
// ============================================================================

impl ToDynamic for () {
    fn to_dynamic<H: HostRuntime>(self, host: &H) -> ConversionResult<Handle> {
        let none = host.none();
        host.incref(none);
        Ok(none)
    }
}

impl FromDynamic for () {
    fn from_dynamic<H: HostRuntime>(host: &H, handle: Handle) -> ConversionResult<Self> {
        match host.kind(handle)? {
            ObjectKind::None => Ok(()),
            other => Err(ConversionError::type_mismatch(ObjectKind::None, other)),
        }
    }
}

// ============================================================================
// Option<T> Implementation
// ============================================================================

// `None` and the none object are the same thing on the dynamic side, so when
// `T` itself converts to none (`()`, `Option<U>`) `Some(..)` reads back as
// `None`. Nest options only when that collapse is acceptable.

impl<T: ToDynamic> ToDynamic for Option<T> {
    fn to_dynamic<H: HostRuntime>(self, host: &H) -> ConversionResult<Handle> {
        match self {
            Some(v) => v.to_dynamic(host),
            None => ().to_dynamic(host),
        }
    }
}

impl<T: FromDynamic> FromDynamic for Option<T> {
    fn from_dynamic<H: HostRuntime>(host: &H, handle: Handle) -> ConversionResult<Self> {
        match host.kind(handle)? {
            ObjectKind::None => Ok(None),
            _ => T::from_dynamic(host, handle).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynrt::{HostError, ManagedHeap};

    fn roundtrip<T>(heap: &ManagedHeap, value: T) -> T
    where
        T: ToDynamic + FromDynamic,
    {
        let h = to_dynamic(heap, value).unwrap();
        let back = to_native(heap, h, Type::<T>::new()).unwrap();
        heap.decref(h);
        back
    }

    #[test]
    fn test_integer_roundtrip() {
        let heap = ManagedHeap::new();

        assert_eq!(roundtrip(&heap, i8::MIN), i8::MIN);
        assert_eq!(roundtrip(&heap, i16::MAX), i16::MAX);
        assert_eq!(roundtrip(&heap, -42i32), -42);
        assert_eq!(roundtrip(&heap, i64::MIN), i64::MIN);
        assert_eq!(roundtrip(&heap, u8::MAX), u8::MAX);
        assert_eq!(roundtrip(&heap, u64::MAX), u64::MAX);
        assert_eq!(roundtrip(&heap, usize::MAX), usize::MAX);
        assert_eq!(heap.live_objects(), 1);
    }

    #[test]
    fn test_string_roundtrip() {
        let heap = ManagedHeap::new();
        let original = "Hello, runtime!".to_string();
        assert_eq!(roundtrip(&heap, original.clone()), original);
    }

    #[test]
    fn test_overflow_error() {
        let heap = ManagedHeap::new();
        let h = to_dynamic(&heap, i64::MAX).unwrap();

        let result = to_native(&heap, h, Type::<i32>::new());
        assert!(matches!(result, Err(ConversionError::IntegerOverflow { .. })));
        heap.decref(h);
    }

    #[test]
    fn test_negative_to_unsigned_overflows() {
        let heap = ManagedHeap::new();
        let h = to_dynamic(&heap, -1i32).unwrap();

        let result = to_native(&heap, h, Type::<u32>::new());
        assert!(matches!(result, Err(ConversionError::IntegerOverflow { value: -1, .. })));
        heap.decref(h);
    }

    #[test]
    fn test_type_mismatch_error() {
        let heap = ManagedHeap::new();
        let h = to_dynamic(&heap, "hello").unwrap();

        let result = to_native(&heap, h, Type::<i32>::new());
        assert!(matches!(
            result,
            Err(ConversionError::TypeMismatch { expected: ObjectKind::Int, found: ObjectKind::Str })
        ));
        heap.decref(h);
    }

    #[test]
    fn test_float_is_not_an_integer() {
        let heap = ManagedHeap::new();
        let h = to_dynamic(&heap, 2.0f64).unwrap();

        assert!(matches!(
            to_native(&heap, h, Type::<i64>::new()),
            Err(ConversionError::TypeMismatch { .. })
        ));
        heap.decref(h);
    }

    #[test]
    fn test_bool_from_int() {
        let heap = ManagedHeap::new();
        let zero = to_dynamic(&heap, 0u8).unwrap();
        let three = to_dynamic(&heap, 3i16).unwrap();

        assert!(!to_native(&heap, zero, Type::<bool>::new()).unwrap());
        assert!(to_native(&heap, three, Type::<bool>::new()).unwrap());

        heap.decref(zero);
        heap.decref(three);
    }

    #[test]
    fn test_null_handle_is_host_error() {
        let heap = ManagedHeap::new();
        let result = to_native(&heap, Handle::NULL, Type::<i32>::new());
        assert!(matches!(result, Err(ConversionError::Host(HostError::NullHandle))));
    }

    #[test]
    fn test_option_roundtrip() {
        let heap = ManagedHeap::new();

        assert_eq!(roundtrip(&heap, Some(42i32)), Some(42));
        assert_eq!(roundtrip(&heap, None::<i32>), None);
        assert_eq!(heap.refcount(heap.none()), Ok(1));
    }

    #[test]
    fn test_option_of_unit_collapses_to_none() {
        let heap = ManagedHeap::new();

        assert_eq!(roundtrip(&heap, Some(())), None);
        assert_eq!(roundtrip(&heap, Some(None::<i32>)), None);
        assert_eq!(heap.refcount(heap.none()), Ok(1));
    }

    #[test]
    fn test_f32_range_is_checked() {
        let heap = ManagedHeap::new();
        let huge = to_dynamic(&heap, f64::MAX).unwrap();
        let tiny = to_dynamic(&heap, 1e-60f64).unwrap();
        let inf = to_dynamic(&heap, f64::NEG_INFINITY).unwrap();

        assert!(matches!(
            to_native(&heap, huge, Type::<f32>::new()),
            Err(ConversionError::FloatOverflow { target: "f32", .. })
        ));
        // Underflow rounds to zero
        assert_eq!(to_native(&heap, tiny, Type::<f32>::new()).unwrap(), 0.0);
        assert_eq!(to_native(&heap, inf, Type::<f32>::new()).unwrap(), f32::NEG_INFINITY);

        for h in [huge, tiny, inf] {
            heap.decref(h);
        }
    }

    struct Counted;

    thread_local! {
        static REF_CALLS: std::cell::Cell<usize> = std::cell::Cell::new(0);
    }

    impl FromDynamic for Counted {
        fn from_dynamic<H: HostRuntime>(host: &H, handle: Handle) -> ConversionResult<Self> {
            <()>::from_dynamic(host, handle).map(|_| Counted)
        }

        fn from_dynamic_ref<H: HostRuntime>(host: &H, handle: Handle) -> ConversionResult<Self> {
            REF_CALLS.with(|c| c.set(c.get() + 1));
            Self::from_dynamic(host, handle)
        }
    }

    #[test]
    fn test_ref_form_dispatches_through_trait() {
        let heap = ManagedHeap::new();
        let none = heap.none();

        assert_eq!(i32::from_dynamic_ref(&heap, none).is_err(), i32::from_dynamic(&heap, none).is_err());
        to_native_ref(&heap, none, Type::<Counted>::new()).unwrap();
        to_native(&heap, none, Type::<Counted>::new()).unwrap();
        assert_eq!(REF_CALLS.with(|c| c.get()), 1);
    }

    #[test]
    fn test_type_tag_debug() {
        assert_eq!(format!("{:?}", Type::<u16>::new()), "Type<u16>");
    }
}
