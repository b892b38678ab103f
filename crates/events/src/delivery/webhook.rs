//! Signed webhook delivery with exponential-backoff retry.
//!
//! The notification gateway (SMS / e-mail fan-out) receives each
//! [`BookingEvent`] as a JSON POST. The raw body is signed with
//! HMAC-SHA256 and the lowercase hex digest is sent in
//! [`SIGNATURE_HEADER`].

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use studio_core::signing::sign_hex;

use crate::bus::BookingEvent;

pub const SIGNATURE_HEADER: &str = "X-Studio-Signature";
pub const EVENT_HEADER: &str = "X-Studio-Event";

/// Backoff between attempts: 1s, 2s, 4s, then one final attempt.
const RETRY_DELAYS: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct WebhookDelivery {
    client: reqwest::Client,
    retry_delays: Vec<Duration>,
}

impl WebhookDelivery {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            client,
            retry_delays: RETRY_DELAYS.to_vec(),
        }
    }

    /// Override the backoff schedule.
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    /// Deliver an event, retrying on any failure until the schedule runs out.
    pub async fn deliver(
        &self,
        url: &str,
        secret: &str,
        event: &BookingEvent,
    ) -> Result<(), WebhookError> {
        let body = serde_json::to_string(event)?;
        let signature = sign_hex(secret, &body);

        for (attempt, delay) in self.retry_delays.iter().enumerate() {
            match self.try_send(url, &body, &signature, &event.event_type).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        url,
                        event_type = %event.event_type,
                        error = %e,
                        "Webhook delivery attempt failed, retrying"
                    );
                    tokio::time::sleep(*delay).await;
                }
            }
        }

        self.try_send(url, &body, &signature, &event.event_type)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    url,
                    event_type = %event.event_type,
                    error = %e,
                    "Webhook delivery failed after all retries"
                );
            })
    }

    async fn try_send(
        &self,
        url: &str,
        body: &str,
        signature: &str,
        event_type: &str,
    ) -> Result<(), WebhookError> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature)
            .header(EVENT_HEADER, event_type)
            .body(body.to_owned())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(WebhookError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

impl Default for WebhookDelivery {
    fn default() -> Self {
        Self::new()
    }
}
