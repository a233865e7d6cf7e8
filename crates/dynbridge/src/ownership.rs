//! Ownership Manager
//!
//! Every new reference returned by the conversion layer must be released
//! exactly once, on every exit path. `decref`/`xdecref` are the primitive
//! release operations; [`OwnedRef`] ties a release to scope exit so error
//! paths cannot leak.

use std::fmt;

use dynrt::{Handle, HostRuntime};

use crate::convert::ToDynamic;
use crate::error::ConversionResult;

/// Take an additional reference to `handle`.
///
/// # Panics
/// Panics if `handle` is null or already released.
#[inline]
pub fn incref<H: HostRuntime>(host: &H, handle: Handle) {
    host.incref(handle);
}

/// Release one reference to `handle`.
///
/// Must be called exactly once per owned reference. Releasing a handle that
/// was already fully released, or the null handle, is a caller bug; no
/// double-free protection is provided here.
///
/// # Panics
/// The managed heap panics if `handle` is null or already released.
#[inline]
pub fn decref<H: HostRuntime>(host: &H, handle: Handle) {
    host.decref(handle);
}

/// Release one reference to `handle`, treating the null handle as a no-op.
#[inline]
pub fn xdecref<H: HostRuntime>(host: &H, handle: Handle) {
    if !handle.is_null() {
        host.decref(handle);
    }
}

/// Owner of exactly one new reference.
///
/// Dropping the owner releases the reference.
pub struct OwnedRef<'h, H: HostRuntime> {
    host: &'h H,
    handle: Handle,
}

impl<'h, H: HostRuntime> OwnedRef<'h, H> {
    /// Take ownership of a new reference.
    ///
    /// `handle` must be a reference the caller owns (for example the result
    /// of `to_dynamic`); it will be released when the owner drops.
    pub fn from_new(host: &'h H, handle: Handle) -> Self {
        Self { host, handle }
    }

    /// Take a new reference to a borrowed handle
    pub fn from_borrowed(host: &'h H, handle: Handle) -> Self {
        host.incref(handle);
        Self { host, handle }
    }

    /// Borrow the handle; the owner keeps the reference
    #[inline]
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Give the reference back to the caller without releasing it
    pub fn into_raw(self) -> Handle {
        let handle = self.handle;
        std::mem::forget(self);
        handle
    }
}

impl<H: HostRuntime> Clone for OwnedRef<'_, H> {
    fn clone(&self) -> Self {
        Self::from_borrowed(self.host, self.handle)
    }
}

impl<H: HostRuntime> Drop for OwnedRef<'_, H> {
    fn drop(&mut self) {
        self.host.decref(self.handle);
    }
}

impl<H: HostRuntime> fmt::Debug for OwnedRef<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OwnedRef").field(&self.handle).finish()
    }
}

/// Convert a native value and wrap the new reference in an owner
pub fn to_dynamic_owned<'h, T: ToDynamic, H: HostRuntime>(
    host: &'h H,
    value: T,
) -> ConversionResult<OwnedRef<'h, H>> {
    let handle = value.to_dynamic(host)?;
    Ok(OwnedRef::from_new(host, handle))
}
