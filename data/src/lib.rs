//! Download-side entry points: hub token exchange, the file downloader, and
//! batch helpers gluing them together.

pub mod data_client;
pub mod errors;
mod file_downloader;
mod hub_client;
mod logging;

pub use data_client::{download_async, download_from_hub, hub_token_from_env};
pub use file_downloader::FileDownloader;
pub use hub_client::{fetch_xet_read_token, HubRepo, XetReadToken, DEFAULT_HUB_ENDPOINT};
pub use logging::initialize_logging;
