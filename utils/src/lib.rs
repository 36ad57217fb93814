pub mod auth;
pub mod serialization_utils;

pub use auth::AuthConfig;
