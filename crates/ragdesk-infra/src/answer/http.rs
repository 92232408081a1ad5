//! HttpAnswerService -- [`AnswerService`] over a remote JSON endpoint.
//!
//! `POST {base}/answer` with `{session_id, history, query}`; the response is
//! `{content, sources: [{document_name}]}`. The API key, if any, is held as
//! a [`SecretString`] and only exposed when building the `Authorization`
//! header.

use std::time::Duration;

use ragdesk_core::chat::answer::{Answer, AnswerRequest, AnswerService};
use ragdesk_types::chat::{Citation, Sender};
use ragdesk_types::error::AnswerError;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize)]
struct WireTurn<'a> {
    sender: Sender,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    session_id: Uuid,
    history: Vec<WireTurn<'a>>,
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    content: String,
    #[serde(default)]
    sources: Vec<Citation>,
}

pub struct HttpAnswerService {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    timeout: Duration,
}

impl HttpAnswerService {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            timeout,
        })
    }

    fn send_error(&self, err: reqwest::Error) -> AnswerError {
        if err.is_timeout() {
            AnswerError::Timeout(self.timeout)
        } else {
            AnswerError::Unavailable(format!("HTTP request failed: {err}"))
        }
    }

    fn status_error(&self, status: reqwest::StatusCode, body: String) -> AnswerError {
        match status.as_u16() {
            408 | 504 => AnswerError::Timeout(self.timeout),
            401 | 403 => AnswerError::Unavailable("authentication failed".to_string()),
            _ => AnswerError::Unavailable(format!("HTTP {status}: {body}")),
        }
    }
}

impl AnswerService for HttpAnswerService {
    async fn answer(&self, request: &AnswerRequest) -> Result<Answer, AnswerError> {
        let body = WireRequest {
            session_id: request.session_id,
            history: request
                .history
                .iter()
                .map(|m| WireTurn {
                    sender: m.sender,
                    content: &m.content,
                })
                .collect(),
            query: &request.query,
        };

        let mut builder = self.client.post(format!("{}/answer", self.base_url)).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder.send().await.map_err(|e| self.send_error(e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.status_error(status, body));
        }

        let parsed: WireResponse = response
            .json()
            .await
            .map_err(|e| AnswerError::Unavailable(format!("failed to parse response: {e}")))?;
        Ok(Answer {
            content: parsed.content,
            sources: parsed.sources,
        })
    }
}
