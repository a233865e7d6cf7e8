//! # DynRT - Dynamic Runtime Boundary
//!
//! This crate is the narrow interface between native Rust code and a
//! reference-counted dynamic runtime. It is consumed by `dynbridge`, which
//! builds the value conversion layer on top of it.
//!
//! ## Features
//!
//! - **Handles**: 64-bit packed object references with a null value
//! - **Object kinds**: runtime categories used for type checks and errors
//! - **HostRuntime**: primitive constructors, incref/decref, inspection
//! - **ManagedHeap**: an in-process reference-counted heap implementing
//!   `HostRuntime`, usable as the runtime itself or as a test double
//!
//! ## Quick Start
//!
//! ```rust
//! use dynrt::{HostRuntime, ManagedHeap, ObjectValue};
//!
//! let heap = ManagedHeap::new();
//! let h = heap.new_int(42).unwrap();
//! assert_eq!(heap.inspect(h).unwrap(), ObjectValue::Int(42));
//! heap.decref(h);
//! assert_eq!(heap.live_objects(), 1); // only the none singleton
//! ```
//!
//! ## Handle Layout
//!
//! ```text
//! [generation:32][slot + 1:32]
//! ```
//!
//! A raw value of zero is the null handle.

pub mod type_system;
pub mod object;
pub mod host;
pub mod heap;
pub mod config;

// Re-export main types at crate root
pub use type_system::{Handle, ObjectKind};
pub use object::{ObjectValue, WrappedPayload};
pub use host::{HostError, HostResult, HostRuntime};
pub use heap::{HeapStats, ManagedHeap};
pub use config::HeapConfig;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::type_system::{Handle, ObjectKind};
    pub use crate::object::{ObjectValue, WrappedPayload};
    pub use crate::host::{HostError, HostResult, HostRuntime};
    pub use crate::heap::ManagedHeap;
    pub use crate::config::HeapConfig;
}
