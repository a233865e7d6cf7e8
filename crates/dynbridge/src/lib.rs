//! # DynBridge - Native/Dynamic Value Marshalling
//!
//! This crate moves values between statically typed Rust code and a
//! reference-counted dynamic runtime reached through [`dynrt::HostRuntime`].
//!
//! ## Key Features
//!
//! - **Type-directed conversions**: `ToDynamic` and `FromDynamic`, resolved
//!   at compile time from the static type; new types are added by
//!   implementing the traits, never by editing existing conversions
//! - **Ownership discipline**: `to_dynamic` returns a new reference,
//!   `to_native` only borrows; `decref`/`xdecref` and `OwnedRef` release
//! - **Enum adapter**: integer-backed open enums via `int_enum!`
//! - **Smart pointer bridge**: `Box`, `Rc` and `Arc` payloads owned by
//!   dynamic objects and recovered by type identity
//!
//! ## Quick Start
//!
//! ```rust
//! use dynbridge::{decref, to_dynamic, to_native, Type};
//! use dynrt::{HostRuntime, ManagedHeap};
//!
//! let heap = ManagedHeap::new();
//! let before = heap.live_objects();
//!
//! let h = to_dynamic(&heap, "hi".to_string()).unwrap();
//! let s: String = to_native(&heap, h, Type::<String>::new()).unwrap();
//! assert_eq!(s, "hi");
//!
//! decref(&heap, h);
//! assert_eq!(heap.live_objects(), before);
//! ```
//!
//! ## Reference Counting
//!
//! - Every `to_dynamic` result is a **new** reference: release it exactly once.
//! - `to_native` never changes the count of the handle it reads.
//! - `xdecref` accepts the null handle; `decref` does not.

mod convert;
mod error;
mod ownership;
pub mod enum_adapter;
pub mod smart_ptr;

pub use convert::{to_dynamic, to_native, to_native_ref, FromDynamic, ToDynamic, Type};
pub use error::{ConversionError, ConversionResult};
pub use ownership::{decref, incref, to_dynamic_owned, xdecref, OwnedRef};
pub use enum_adapter::IntEnum;
pub use smart_ptr::{smart_ptr_from_dynamic, with_payload, wrap_pointer, SmartPointer};

// Re-export the runtime boundary; the exported macros refer to it
pub use dynrt;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::convert::{to_dynamic, to_native, to_native_ref, FromDynamic, ToDynamic, Type};
    pub use crate::error::{ConversionError, ConversionResult};
    pub use crate::ownership::{decref, xdecref, OwnedRef};
    pub use crate::enum_adapter::IntEnum;
    pub use crate::smart_ptr::{smart_ptr_from_dynamic, with_payload, SmartPointer};
    pub use crate::{enum_as_int_converters, int_enum};
    pub use dynrt::{Handle, HostRuntime, ManagedHeap};
}
