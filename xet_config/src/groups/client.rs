crate::config_group!("client" => {

    /// Number of parallel download workers used when fetching
    /// reconstruction terms. Defaults to the CPU count.
    ///
    /// Override with `XET_CLIENT_NUM_DOWNLOAD_WORKERS`.
    ref num_download_workers: usize =
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);

    /// Maximum retry attempts for metadata API calls. Term range downloads
    /// never retry internally; their errors carry a retryable flag for the
    /// caller instead.
    ///
    /// Override with `XET_CLIENT_RETRY_MAX_ATTEMPTS`.
    ref retry_max_attempts: u32 = 3;

    /// Base delay for exponential retry backoff, in milliseconds.
    ///
    /// Override with `XET_CLIENT_RETRY_BASE_DELAY_MS`.
    ref retry_base_delay_ms: u64 = 300;

    /// Upper bound on retry backoff, in milliseconds.
    ///
    /// Override with `XET_CLIENT_RETRY_MAX_DELAY_MS`.
    ref retry_max_delay_ms: u64 = 6000;

    /// User-agent header sent on CAS API calls.
    ///
    /// Override with `XET_CLIENT_HTTP_USER_AGENT`.
    ref http_user_agent: String = concat!("xet-fetch/", env!("CARGO_PKG_VERSION")).to_string();
});
