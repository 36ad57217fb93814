//! Runtime configuration.
//!
//! Each subsystem gets a group of values with compiled-in defaults that can
//! be overridden through `XET_{GROUP}_{FIELD}` environment variables, read
//! once at first access.

pub mod groups;
pub mod macros;
mod xet_config;

pub use crate::xet_config::{xet_config, XetConfig};

pub type ClientConfig = groups::client::ConfigValues;
pub type ReconstructionConfig = groups::reconstruction::ConfigValues;

/// Parses an environment override, falling back to the compiled default (with
/// a warning) when the value doesn't parse as the field's type.
pub fn parse_config_value<T: std::str::FromStr + Clone>(env_var: &str, raw: &str, default: T) -> T {
    match raw.parse() {
        Ok(v) => v,
        Err(_) => {
            tracing::warn!(env_var, raw, "unparsable configuration override, keeping default");
            default
        },
    }
}
