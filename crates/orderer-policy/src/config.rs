//! Policy loading limits.

use serde::{Deserialize, Serialize};

/// Default bound on policy tree depth. A lone `SignedBy` has depth 1.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Configuration for policy compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Maximum depth of a policy tree.
    pub max_depth: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}
