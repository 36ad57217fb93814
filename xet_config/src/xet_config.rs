use std::sync::OnceLock;

use crate::groups;

/// Top-level configuration, one field per group.
#[derive(Debug, Clone, Default)]
pub struct XetConfig {
    pub client: groups::client::ConfigValues,
    pub reconstruction: groups::reconstruction::ConfigValues,
}

impl XetConfig {
    /// Defaults with environment overrides applied.
    pub fn new() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(mut self) -> Self {
        self.client.apply_env_overrides();
        self.reconstruction.apply_env_overrides();
        self
    }
}

static XET_CONFIG: OnceLock<XetConfig> = OnceLock::new();

/// The process-wide configuration, built on first access.
pub fn xet_config() -> &'static XetConfig {
    XET_CONFIG.get_or_init(XetConfig::new)
}
