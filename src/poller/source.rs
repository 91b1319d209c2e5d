//! Where payloads come from.

use std::future::Future;
use std::time::Duration;

use crate::error::TransportError;
use crate::models::RawPayload;

use super::state::SensorIdentity;

// ---

/// One request/response exchange with a sensor.
pub trait SensorSource: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<RawPayload, TransportError>> + Send;
}

/// `GET http://<address>/json` with a bounded timeout.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpSource {
    pub fn new(client: reqwest::Client, identity: &SensorIdentity, timeout: Duration) -> Self {
        Self {
            client,
            url: identity.url(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl SensorSource for HttpSource {
    async fn fetch(&self) -> Result<RawPayload, TransportError> {
        // ---
        tracing::trace!("GET {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        Ok(response.json::<RawPayload>().await?)
    }
}
