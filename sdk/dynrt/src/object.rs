//! Object bodies stored in the managed heap
//!
//! `ObjectBody` is what a heap slot owns. `ObjectValue` is the by-value
//! snapshot handed out by inspection, so callers never hold a borrow into
//! the heap. `WrappedPayload` is the body of a wrapped native pointer.

use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;

use crate::type_system::ObjectKind;

/// Native value owned by a wrapped-pointer object.
///
/// The payload is kept behind `dyn Any` together with its `TypeId`, so
/// extraction recovers the concrete type by identity instead of by address.
pub struct WrappedPayload {
    type_id: TypeId,
    type_name: &'static str,
    value: Box<dyn Any>,
}

impl WrappedPayload {
    /// Move a native value into a payload
    pub fn new<P: Any>(value: P) -> Self {
        Self {
            type_id: TypeId::of::<P>(),
            type_name: std::any::type_name::<P>(),
            value: Box::new(value),
        }
    }

    /// `TypeId` of the wrapped value
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Type name of the wrapped value
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Check whether the payload holds a `P`
    #[inline]
    pub fn is<P: Any>(&self) -> bool {
        self.type_id == TypeId::of::<P>()
    }

    /// Borrow the payload as `P` (type-checked)
    pub fn downcast_ref<P: Any>(&self) -> Option<&P> {
        self.value.downcast_ref::<P>()
    }
}

impl fmt::Debug for WrappedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrappedPayload")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Body of a heap object
#[derive(Debug)]
pub(crate) enum ObjectBody {
    None,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(Box<[u8]>),
    /// Shared so a payload can be lent out without holding the heap borrow
    Wrapped(Rc<WrappedPayload>),
}

impl ObjectBody {
    pub(crate) fn kind(&self) -> ObjectKind {
        match self {
            ObjectBody::None => ObjectKind::None,
            ObjectBody::Bool(_) => ObjectKind::Bool,
            ObjectBody::Int(_) => ObjectKind::Int,
            ObjectBody::UInt(_) => ObjectKind::UInt,
            ObjectBody::Float(_) => ObjectKind::Float,
            ObjectBody::Str(_) => ObjectKind::Str,
            ObjectBody::Wrapped(_) => ObjectKind::Wrapped,
        }
    }

    pub(crate) fn snapshot(&self) -> ObjectValue {
        match self {
            ObjectBody::None => ObjectValue::None,
            ObjectBody::Bool(v) => ObjectValue::Bool(*v),
            ObjectBody::Int(v) => ObjectValue::Int(*v),
            ObjectBody::UInt(v) => ObjectValue::UInt(*v),
            ObjectBody::Float(v) => ObjectValue::Float(*v),
            ObjectBody::Str(bytes) => ObjectValue::Str(bytes.to_vec()),
            ObjectBody::Wrapped(payload) => ObjectValue::Wrapped {
                type_name: payload.type_name(),
            },
        }
    }
}

/// Snapshot of a heap object's value.
///
/// Taking a snapshot does not touch the object's reference count.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectValue {
    None,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    /// Copy of the string bytes (no terminator)
    Str(Vec<u8>),
    /// Wrapped native pointer; only its type name is visible here
    Wrapped { type_name: &'static str },
}

impl ObjectValue {
    /// Get the object kind of this value
    pub fn kind(&self) -> ObjectKind {
        match self {
            ObjectValue::None => ObjectKind::None,
            ObjectValue::Bool(_) => ObjectKind::Bool,
            ObjectValue::Int(_) => ObjectKind::Int,
            ObjectValue::UInt(_) => ObjectKind::UInt,
            ObjectValue::Float(_) => ObjectKind::Float,
            ObjectValue::Str(_) => ObjectKind::Str,
            ObjectValue::Wrapped { .. } => ObjectKind::Wrapped,
        }
    }

    /// Integer view of an integral value, widened to i128 so both
    /// signed and unsigned objects fit
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            ObjectValue::Bool(v) => Some(*v as i128),
            ObjectValue::Int(v) => Some(*v as i128),
            ObjectValue::UInt(v) => Some(*v as i128),
            _ => None,
        }
    }
}
