//! Codec configuration

use crate::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_NULL_SLOTS};

/// How object references are checked against object definitions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReferencePolicy {
    /// A reference must name an object defined earlier in the stream
    #[default]
    Strict,
    /// References may point forward; ids still undefined when the stream
    /// ends are reported as dangling
    ///
    /// Stock BinaryFormatter output writes the root object first and the
    /// objects it references after it, so it needs this mode.
    Deferred,
}

/// Options shared by the decode and encode passes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    pub reference_policy: ReferencePolicy,
    /// Maximum nesting of records inside member values
    pub max_depth: usize,
    /// Maximum number of null slots that null-run records may expand to,
    /// summed over the whole stream
    pub max_null_slots: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            reference_policy: ReferencePolicy::Strict,
            max_depth: DEFAULT_MAX_DEPTH,
            max_null_slots: DEFAULT_MAX_NULL_SLOTS,
        }
    }
}

impl CodecConfig {
    /// Configuration accepting forward references
    pub fn deferred() -> Self {
        Self {
            reference_policy: ReferencePolicy::Deferred,
            ..Self::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_null_slots(mut self, max_null_slots: usize) -> Self {
        self.max_null_slots = max_null_slots;
        self
    }
}
