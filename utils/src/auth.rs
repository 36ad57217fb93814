/// Authentication info for talking to the CAS endpoint.
///
/// The token is obtained out of band (e.g. through the hub token exchange in
/// the `data` crate) and passed in here; nothing in the client stack refreshes
/// it on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub token: String,
    /// Unix timestamp (seconds) after which the token is no longer valid,
    /// if the issuer reported one.
    pub token_expiration: Option<u64>,
}

impl AuthConfig {
    pub fn new(token: String, token_expiration: Option<u64>) -> Self {
        Self {
            token,
            token_expiration,
        }
    }

    /// Builds an `AuthConfig` when a token is present, `None` otherwise.
    pub fn maybe_new(token: Option<String>, token_expiration: Option<u64>) -> Option<Self> {
        token.map(|token| Self {
            token,
            token_expiration,
        })
    }
}
