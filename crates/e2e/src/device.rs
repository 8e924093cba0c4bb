//! Device reachability probing
//!
//! Before a session starts we check that the device management UI answers at
//! all, with bounded retries since embedded devices come up slowly after
//! power cycles. Also detects the HTTP-to-HTTPS redirect some variants enforce,
//! which the capability record declares via `http_redirect`.

use std::time::Duration;

use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

#[derive(Debug, Clone)]
pub struct DeviceProbe {
    base_url: String,
    max_attempts: usize,
    interval: Duration,
    request_timeout: Duration,
}

impl DeviceProbe {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            max_attempts: 10,
            interval: Duration::from_secs(2),
            request_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_attempts(mut self, max_attempts: usize, interval: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.interval = interval;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Wait until the device answers an HTTP request, up to the attempt
    /// bound. Any HTTP status counts as reachable; embedded firmware answers
    /// 401/redirect before login.
    pub async fn wait_until_reachable(&self) -> E2eResult<()> {
        let client = reqwest::Client::builder()
            .timeout(self.request_timeout)
            .danger_accept_invalid_certs(true)
            .build()?;

        for attempt in 1..=self.max_attempts {
            match client.get(&self.base_url).send().await {
                Ok(resp) => {
                    info!(
                        "Device reachable at {} (status {}, attempt {})",
                        self.base_url,
                        resp.status(),
                        attempt
                    );
                    return Ok(());
                }
                Err(e) => {
                    if attempt == 1 {
                        info!("Waiting for device at {}...", self.base_url);
                    }
                    if !e.is_connect() && !e.is_timeout() {
                        warn!("Probe error: {}", e);
                    }
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.interval).await;
            }
        }

        Err(E2eError::DeviceUnreachable {
            url: self.base_url.clone(),
            attempts: self.max_attempts,
        })
    }

    /// Whether plain HTTP is redirected to HTTPS. Redirects are not
    /// followed; a 3xx with an `https://` location is the signal.
    pub async fn detects_https_redirect(&self) -> E2eResult<bool> {
        let client = reqwest::Client::builder()
            .timeout(self.request_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .danger_accept_invalid_certs(true)
            .build()?;

        let resp = client.get(&self.base_url).send().await?;
        if !resp.status().is_redirection() {
            return Ok(false);
        }

        let redirected = resp
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|loc| loc.starts_with("https://"))
            .unwrap_or(false);

        Ok(redirected)
    }
}
