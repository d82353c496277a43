//! Parser construction options.

/// Tunables recognized at parser construction. `Default` matches production
/// behavior.
#[derive(Clone, Copy, Debug)]
pub struct Options {
    /// When false, the external policy correlator is never invoked.
    pub enable_network_policy_correlation: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            enable_network_policy_correlation: true,
        }
    }
}
