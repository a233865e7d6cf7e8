//! Host runtime boundary
//!
//! `HostRuntime` is everything the marshalling layer is allowed to ask of
//! the dynamic runtime: primitive constructors, reference count mutation and
//! read-only inspection. Conversion code receives the runtime explicitly as
//! `&H`, so a test heap can stand in for a real interpreter.

use thiserror::Error;

use crate::object::{ObjectValue, WrappedPayload};
use crate::type_system::{Handle, ObjectKind};

/// Errors reported by the host runtime
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The null handle was passed where an object is required
    #[error("Null handle")]
    NullHandle,

    /// The handle does not refer to a live object
    #[error("Invalid handle {handle}: object was released or never existed")]
    InvalidHandle { handle: Handle },

    /// A wrapped-pointer operation was applied to another kind of object
    #[error("Expected a wrapped pointer object, found {found}")]
    NotWrapped { found: ObjectKind },

    /// The heap refused to allocate another object
    #[error("Object allocation failed: heap limit of {limit} objects reached")]
    AllocationFailed { limit: usize },
}

/// Result type for host runtime operations
pub type HostResult<T> = Result<T, HostError>;

/// The dynamic runtime as seen from native code.
///
/// Reference counting contract:
/// - every `new_*` constructor returns a **new** reference (count already
///   incremented for the caller), which must be released exactly once;
/// - inspection methods borrow the handle and never change its count;
/// - `incref`/`decref` are the only ways the count changes.
///
/// The runtime serializes access to its object graph; implementations are
/// not expected to be shared across threads.
pub trait HostRuntime {
    /// Borrowed handle to the none singleton
    fn none(&self) -> Handle;

    /// Create a bool object
    fn new_bool(&self, value: bool) -> HostResult<Handle>;

    /// Create a signed integer object
    fn new_int(&self, value: i64) -> HostResult<Handle>;

    /// Create an unsigned integer object
    fn new_uint(&self, value: u64) -> HostResult<Handle>;

    /// Create a float object
    fn new_float(&self, value: f64) -> HostResult<Handle>;

    /// Create a string object from raw bytes (no terminator)
    fn new_str(&self, bytes: &[u8]) -> HostResult<Handle>;

    /// Create an object that takes ownership of a native payload.
    ///
    /// The payload is dropped when the object's count reaches zero.
    fn new_wrapped(&self, payload: WrappedPayload) -> HostResult<Handle>;

    /// Increment the reference count.
    ///
    /// # Panics
    /// Implementations panic when `handle` is null or released.
    fn incref(&self, handle: Handle);

    /// Decrement the reference count, destroying the object at zero.
    ///
    /// # Panics
    /// Implementations panic when `handle` is null or released. Releasing a
    /// handle more times than it was acquired is a caller bug.
    fn decref(&self, handle: Handle);

    /// Kind of the object behind `handle`
    fn kind(&self, handle: Handle) -> HostResult<ObjectKind>;

    /// Snapshot of the object behind `handle`
    fn inspect(&self, handle: Handle) -> HostResult<ObjectValue>;

    /// Run `f` against the payload of a wrapped-pointer object.
    ///
    /// `f` may use this runtime, including releasing the object itself; the
    /// payload stays alive until `f` returns.
    fn with_wrapped<R, F>(&self, handle: Handle, f: F) -> HostResult<R>
    where
        F: FnOnce(&WrappedPayload) -> R;

    /// Current reference count of the object behind `handle`
    fn refcount(&self, handle: Handle) -> HostResult<usize>;

    /// Number of live objects, including the none singleton
    fn live_objects(&self) -> usize;
}
