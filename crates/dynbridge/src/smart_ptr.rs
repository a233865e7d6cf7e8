//! Smart Pointer Bridge
//!
//! Ownership-transferring pointers (`Box`, `Rc`, `Arc`) cross the boundary
//! by being moved into a freshly allocated wrapped-pointer object. The
//! object owns the pointer from then on: the payload is destroyed when the
//! object's reference count reaches zero, not when a native variable goes
//! out of scope.
//!
//! Extraction recovers the pointer by `TypeId`, so asking for the wrong
//! pointer or payload type is an error rather than a reinterpretation.
//! Shared pointers (`Rc`, `Arc`) extract as a clone sharing the payload;
//! uniquely owned `Box` payloads are reached through [`with_payload`].

use std::any::{type_name, Any};
use std::rc::Rc;
use std::sync::Arc;

use dynrt::{Handle, HostRuntime, WrappedPayload};

use crate::convert::{FromDynamic, ToDynamic, Type};
use crate::error::{ConversionError, ConversionResult};

/// A pointer that owns (or shares ownership of) a payload
pub trait SmartPointer: Any {
    /// Pointee type
    type Target: ?Sized;

    /// Borrow the payload
    fn payload(&self) -> &Self::Target;
}

impl<T: ?Sized + 'static> SmartPointer for Box<T> {
    type Target = T;

    fn payload(&self) -> &T {
        self
    }
}

impl<T: ?Sized + 'static> SmartPointer for Rc<T> {
    type Target = T;

    fn payload(&self) -> &T {
        self
    }
}

impl<T: ?Sized + 'static> SmartPointer for Arc<T> {
    type Target = T;

    fn payload(&self) -> &T {
        self
    }
}

fn wrapped_mismatch<P>(found: &'static str) -> ConversionError {
    ConversionError::WrappedTypeMismatch {
        expected: type_name::<P>(),
        found,
    }
}

/// Move `pointer` into a new wrapped-pointer object (new reference).
///
/// If the runtime cannot allocate the object the pointer is dropped and
/// `AllocationFailed` is returned.
pub fn wrap_pointer<P: SmartPointer, H: HostRuntime>(host: &H, pointer: P) -> ConversionResult<Handle> {
    log::trace!("[Bridge] wrapping {}", type_name::<P>());
    Ok(host.new_wrapped(WrappedPayload::new(pointer))?)
}

/// Recover a shared pointer from a wrapped-pointer object.
///
/// Returns a clone of the stored pointer, so the result refers to the very
/// payload that was wrapped. `handle` is borrowed.
pub fn smart_ptr_from_dynamic<P, T, H>(
    host: &H,
    handle: Handle,
    _tag: Type<P>,
    _payload_tag: Type<T>,
) -> ConversionResult<P>
where
    P: SmartPointer<Target = T> + Clone,
    T: ?Sized,
    H: HostRuntime,
{
    host.with_wrapped(handle, |payload| {
        payload
            .downcast_ref::<P>()
            .cloned()
            .ok_or_else(|| wrapped_mismatch::<P>(payload.type_name()))
    })?
}

/// Run `f` against the payload of a wrapped pointer of type `P`.
///
/// Works for every pointer kind, including `Box`. `f` may convert values on
/// `host` while it runs.
pub fn with_payload<P, H, R, F>(host: &H, handle: Handle, _tag: Type<P>, f: F) -> ConversionResult<R>
where
    P: SmartPointer,
    H: HostRuntime,
    F: FnOnce(&P::Target) -> R,
{
    host.with_wrapped(handle, |payload| match payload.downcast_ref::<P>() {
        Some(pointer) => Ok(f(pointer.payload())),
        None => Err(wrapped_mismatch::<P>(payload.type_name())),
    })?
}

// ============================================================================
// Converter Registrations
// ============================================================================

impl<T: ?Sized + 'static> ToDynamic for Box<T> {
    fn to_dynamic<H: HostRuntime>(self, host: &H) -> ConversionResult<Handle> {
        wrap_pointer(host, self)
    }
}

impl<T: ?Sized + 'static> ToDynamic for Rc<T> {
    fn to_dynamic<H: HostRuntime>(self, host: &H) -> ConversionResult<Handle> {
        wrap_pointer(host, self)
    }
}

impl<T: ?Sized + 'static> ToDynamic for Arc<T> {
    fn to_dynamic<H: HostRuntime>(self, host: &H) -> ConversionResult<Handle> {
        wrap_pointer(host, self)
    }
}

impl<T: ?Sized + 'static> FromDynamic for Rc<T> {
    fn from_dynamic<H: HostRuntime>(host: &H, handle: Handle) -> ConversionResult<Self> {
        smart_ptr_from_dynamic(host, handle, Type::<Rc<T>>::new(), Type::<T>::new())
    }
}

impl<T: ?Sized + 'static> FromDynamic for Arc<T> {
    fn from_dynamic<H: HostRuntime>(host: &H, handle: Handle) -> ConversionResult<Self> {
        smart_ptr_from_dynamic(host, handle, Type::<Arc<T>>::new(), Type::<T>::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{to_dynamic, to_native};
    use dynrt::{ManagedHeap, ObjectKind};

    #[derive(Debug, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn test_rc_roundtrip_preserves_identity() {
        let heap = ManagedHeap::new();
        let original = Rc::new(Point { x: 1, y: 2 });

        let h = to_dynamic(&heap, original.clone()).unwrap();
        let back = to_native(&heap, h, Type::<Rc<Point>>::new()).unwrap();

        assert!(Rc::ptr_eq(&original, &back));
        assert_eq!(*back, Point { x: 1, y: 2 });
        heap.decref(h);
    }

    #[test]
    fn test_box_payload_access() {
        let heap = ManagedHeap::new();
        let h = to_dynamic(&heap, Box::new(Point { x: 3, y: 4 })).unwrap();

        let sum = with_payload(&heap, h, Type::<Box<Point>>::new(), |p| p.x + p.y).unwrap();
        assert_eq!(sum, 7);
        heap.decref(h);
    }

    #[test]
    fn test_convert_inside_payload_access() {
        let heap = ManagedHeap::new();
        let h = to_dynamic(&heap, Box::new(Point { x: 5, y: 6 })).unwrap();

        let field = with_payload(&heap, h, Type::<Box<Point>>::new(), |p| to_dynamic(&heap, p.y))
            .unwrap()
            .unwrap();
        assert_eq!(to_native(&heap, field, Type::<i32>::new()).unwrap(), 6);

        heap.decref(field);
        heap.decref(h);
        assert_eq!(heap.live_objects(), 1);
    }

    #[test]
    fn test_explicit_payload_tag() {
        let heap = ManagedHeap::new();
        let h = to_dynamic(&heap, Arc::new(String::from("shared"))).unwrap();

        let back = smart_ptr_from_dynamic(&heap, h, Type::<Arc<String>>::new(), Type::<String>::new()).unwrap();
        assert_eq!(back.as_str(), "shared");
        heap.decref(h);
    }

    #[test]
    fn test_wrong_payload_type() {
        let heap = ManagedHeap::new();
        let h = to_dynamic(&heap, Rc::new(5i32)).unwrap();

        let result = to_native(&heap, h, Type::<Rc<u32>>::new());
        assert!(matches!(result, Err(ConversionError::WrappedTypeMismatch { .. })));

        // Same payload behind a different pointer kind is also a mismatch
        let result = to_native(&heap, h, Type::<Arc<i32>>::new());
        assert!(matches!(result, Err(ConversionError::WrappedTypeMismatch { .. })));
        heap.decref(h);
    }

    #[test]
    fn test_primitive_is_not_a_pointer() {
        let heap = ManagedHeap::new();
        let h = to_dynamic(&heap, 5i32).unwrap();

        let result = to_native(&heap, h, Type::<Rc<i32>>::new());
        assert!(matches!(
            result,
            Err(ConversionError::TypeMismatch { expected: ObjectKind::Wrapped, found: ObjectKind::Int })
        ));
        heap.decref(h);
    }
}
