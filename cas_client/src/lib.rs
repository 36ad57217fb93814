//! Client-side access to a XET content-addressed store.
//!
//! The pieces fit together as: a [`Client`] resolves a file hash to
//! reconstruction info (terms plus presigned fetch hints), the
//! [`FileReconstructor`] turns the terms into parallel range downloads
//! through per-worker [`RangeFetcher`]s, and the extracted chunk bytes are
//! reassembled in strict term order into a [`DataOutput`] sink.

pub use error::{CasClientError, Result};
pub use http_client::{build_auth_http_client, build_http_client, RetryConfig};
pub use interface::{Client, RangeFetcher};
pub use local_client::{LocalClient, RandomFileContents, UploadedTerm};
pub use reconstruction::{DataOutput, FileReconstructor};
pub use remote_client::RemoteClient;

mod error;
pub mod http_client;
mod interface;
mod local_client;
mod reconstruction;
mod remote_client;
