//! Engine configuration.
//!
//! The engine consumes no environment variables and maintains no global
//! mutable registry. The only configurable surface is [`EngineConfig`], a
//! plain value constructed explicitly by the caller and handed to a
//! session at construction time.

/// Configuration accepted by session construction.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Whether `ORDERBY` compares string columns case-sensitively.
    ///
    /// Defaults to `true`, matching the frame library's default string
    /// ordering.
    pub case_sensitive_sort: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            case_sensitive_sort: true,
        }
    }
}

impl EngineConfig {
    /// Construct the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style override of [`EngineConfig::case_sensitive_sort`].
    pub fn with_case_sensitive_sort(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive_sort = case_sensitive;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_case_sensitive() {
        assert!(EngineConfig::default().case_sensitive_sort);
    }

    #[test]
    fn builder_overrides_case_sensitivity() {
        let cfg = EngineConfig::new().with_case_sensitive_sort(false);
        assert!(!cfg.case_sensitive_sort);
    }
}
