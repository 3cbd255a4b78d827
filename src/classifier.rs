//! Client for the external image verification service.
//!
//! The classifier receives a base64-encoded photo plus the target word and
//! answers with a verdict. Network failures, timeouts and unparseable
//! responses surface as `DomainError::Upstream`, which the admission flow
//! treats as "nothing happened" (no rows written), distinct from a
//! negative verdict.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Config;
use crate::domain::DomainError;

const CLASSIFY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct Classifier {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    image: &'a str,
    word: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Verdict {
    pub pass: bool,
    #[serde(default)]
    pub confidence: i32,
    #[serde(default)]
    pub is_screen_capture: bool,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl Classifier {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(CLASSIFY_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.classifier_url, &config.classifier_api_key)
    }

    pub async fn classify(&self, image: &str, word: &str) -> Result<Verdict, DomainError> {
        let url = format!("{}/v1/verify", self.base_url);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&VerifyRequest { image, word })
            .send()
            .await
            .map_err(|e| DomainError::Upstream(format!("Classifier request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(DomainError::Upstream(format!(
                "Classifier returned status: {}",
                resp.status()
            )));
        }

        let mut verdict: Verdict = resp
            .json()
            .await
            .map_err(|e| DomainError::Upstream(format!("Malformed classifier response: {}", e)))?;

        verdict.confidence = verdict.confidence.clamp(0, 100);
        Ok(verdict)
    }
}
