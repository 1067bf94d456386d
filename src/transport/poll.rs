// Pull API fallback: system and DNS stats fetched concurrently

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tokio::time::timeout;
use tracing::instrument;

use crate::error::TransportError;
use crate::version::user_agent;

pub const SYSTEM_STATS_PATH: &str = "/api/system/stats";
pub const DNS_STATS_PATH: &str = "/api/dns/stats";

/// Both halves of one poll cycle. Either may fail independently.
#[derive(Debug)]
pub struct PollOutcome {
    pub system: Result<Value, TransportError>,
    pub dns: Result<Value, TransportError>,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Poller {
    client: Client,
    system_url: String,
    dns_url: String,
    timeout: Duration,
}

impl Poller {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(user_agent())
            .build()?;
        Ok(Self {
            client,
            system_url: format!("{base_url}{SYSTEM_STATS_PATH}"),
            dns_url: format!("{base_url}{DNS_STATS_PATH}"),
            timeout: request_timeout,
        })
    }

    #[instrument(skip(self), fields(operation = "poll"))]
    pub async fn fetch(&self) -> PollOutcome {
        let (system, dns) = tokio::join!(
            self.get_json(&self.system_url),
            self.get_json(&self.dns_url)
        );
        PollOutcome {
            system,
            dns,
            received_at: Utc::now(),
        }
    }

    async fn get_json(&self, url: &str) -> Result<Value, TransportError> {
        let request = async {
            let response = self.client.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(TransportError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
            response
                .json::<Value>()
                .await
                .map_err(|e| TransportError::Http(format!("decoding {url}: {e}")))
        };
        match timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                operation: "poll request",
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}
