use crate::config::DriverConfig;
use reqwest::Client;
use std::time::Duration;

/// Builds the HTTP client used to fetch listing pages
///
/// # Arguments
///
/// * `config` - The driver configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use review_harvest::config::DriverConfig;
/// use review_harvest::driver::build_http_client;
///
/// let client = build_http_client(&DriverConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &DriverConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}
