// HTTP client utilities
use crate::domain::error::IqmsError;
use crate::infrastructure::config::ServerConfig;
use reqwest::Client;

/// Create the shared HTTP client with pooling and the configured timeout
pub fn create_client(server: &ServerConfig) -> Result<Client, IqmsError> {
    Ok(Client::builder()
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(std::time::Duration::from_secs(30))
        .timeout(std::time::Duration::from_secs(server.timeout_secs))
        .user_agent(concat!("iqms-sync/", env!("CARGO_PKG_VERSION")))
        .build()?)
}
