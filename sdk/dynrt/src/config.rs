//! Managed heap configuration

/// Environment variable that caps the number of live objects
pub const ENV_MAX_OBJECTS: &str = "DYNRT_MAX_OBJECTS";

/// Environment variable that turns on reference count tracing
pub const ENV_TRACE_REFCOUNTS: &str = "DYNRT_TRACE_REFCOUNTS";

/// Configuration for [`ManagedHeap`](crate::ManagedHeap)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapConfig {
    /// Number of slots reserved up front
    pub initial_capacity: usize,
    /// Maximum number of live objects (including the none singleton).
    /// `None` means unbounded.
    pub max_objects: Option<usize>,
    /// Emit a `log::trace!` line for every allocation, incref and decref
    pub trace_refcounts: bool,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
            max_objects: None,
            trace_refcounts: false,
        }
    }
}

impl HeapConfig {
    /// Default configuration overridden by `DYNRT_MAX_OBJECTS` and
    /// `DYNRT_TRACE_REFCOUNTS`.
    ///
    /// An unparsable limit is ignored. Tracing is on when the variable is
    /// set to anything other than `0` or `false`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var(ENV_MAX_OBJECTS) {
            match raw.trim().parse::<usize>() {
                Ok(limit) => config.max_objects = Some(limit),
                Err(_) => log::warn!("[Heap] ignoring {}={:?}: not a number", ENV_MAX_OBJECTS, raw),
            }
        }

        if let Ok(raw) = std::env::var(ENV_TRACE_REFCOUNTS) {
            config.trace_refcounts = !matches!(raw.trim(), "0" | "false" | "");
        }

        config
    }

    /// Set the initial slot capacity
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Cap the number of live objects
    pub fn with_max_objects(mut self, limit: usize) -> Self {
        self.max_objects = Some(limit);
        self
    }

    /// Enable or disable reference count tracing
    pub fn with_trace_refcounts(mut self, enabled: bool) -> Self {
        self.trace_refcounts = enabled;
        self
    }
}
