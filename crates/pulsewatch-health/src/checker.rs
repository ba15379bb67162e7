//! Single HTTP health probe.

use std::time::Duration;

use pulsewatch_core::ServiceStatus;
use tracing::debug;

const USER_AGENT: &str = concat!("pulsewatch/", env!("CARGO_PKG_VERSION"));

/// Build the shared HTTP client used for every probe.
pub fn build_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().user_agent(USER_AGENT).build()
}

/// Perform an HTTP GET health probe against `url`.
///
/// Returns `Online` for exactly HTTP 200, `Degraded` for any other status
/// code, and `Offline` when the request cannot complete (connection error,
/// DNS failure, invalid URL, or `timeout` elapsed).
pub async fn http_probe(client: &reqwest::Client, url: &str, timeout: Duration) -> ServiceStatus {
    match client.get(url).timeout(timeout).send().await {
        Ok(resp) => {
            if resp.status() == reqwest::StatusCode::OK {
                ServiceStatus::Online
            } else {
                debug!(status = %resp.status(), %url, "health probe non-200");
                ServiceStatus::Degraded
            }
        }
        Err(e) if e.is_timeout() => {
            debug!(%url, "health probe timed out");
            ServiceStatus::Offline
        }
        Err(e) => {
            debug!(error = %e, %url, "health probe request failed");
            ServiceStatus::Offline
        }
    }
}
