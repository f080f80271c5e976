//! Low-level HTTP transport
//!
//! One place for timeouts, bounded retries, bearer credentials and body
//! signing. Malformed response bodies become typed errors here, before any
//! payload reaches the rest of the core.

use std::time::Duration;

use reqwest::{header, Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::errors::CoreError;
use crate::signing::{RequestSigner, SIGNATURE_HEADER};

/// Bounded retry policy for transient failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub attempts: u32,

    /// Delay between attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 2,
            backoff: Duration::from_secs(1),
        }
    }
}

/// HTTP transport shared by all nucleus connections
pub struct HttpTransport {
    client: Client,
    retry: RetryPolicy,
    signer: Option<RequestSigner>,
}

impl HttpTransport {
    pub fn new(
        timeout: Duration,
        retry: RetryPolicy,
        signer: Option<RequestSigner>,
    ) -> Result<Self, CoreError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            retry,
            signer,
        })
    }

    /// Make a GET request, deserializing the JSON response.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        credential: Option<&SecretString>,
    ) -> Result<T, CoreError> {
        debug!("GET {}", url);
        let body = self
            .with_retries(|| async {
                let mut request = self.client.get(url.clone());
                if let Some(credential) = credential {
                    request = request.header(
                        header::AUTHORIZATION,
                        format!("Bearer {}", credential.expose_secret()),
                    );
                }
                self.execute(request).await
            })
            .await?;

        parse_body(&body)
    }

    /// Make a POST request with a JSON body, deserializing the JSON response.
    /// The body is serialized once so the signature and the wire bytes can
    /// never diverge.
    pub async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        url: Url,
        credential: Option<&SecretString>,
        body: &B,
    ) -> Result<T, CoreError> {
        debug!("POST {}", url);
        let payload = serde_json::to_vec(body)?;

        let body = self
            .with_retries(|| async {
                let mut request = self
                    .client
                    .post(url.clone())
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(payload.clone());
                if let Some(credential) = credential {
                    request = request.header(
                        header::AUTHORIZATION,
                        format!("Bearer {}", credential.expose_secret()),
                    );
                }
                if let Some(signer) = &self.signer {
                    request = request.header(SIGNATURE_HEADER, signer.signature(&payload));
                }
                self.execute(request).await
            })
            .await?;

        parse_body(&body)
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<String, CoreError> {
        let response = request.send().await.map_err(classify_send_error)?;

        let status = response.status();
        let body = response.text().await.map_err(classify_send_error)?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        Ok(body)
    }

    /// Retry transient failures a bounded number of times with a fixed
    /// backoff. Application-level HTTP errors are surfaced immediately.
    async fn with_retries<F, Fut>(&self, attempt: F) -> Result<String, CoreError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<String, CoreError>>,
    {
        let mut last_err = None;

        for round in 0..=self.retry.attempts {
            match attempt().await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && round < self.retry.attempts => {
                    warn!("Transient failure (attempt {}): {}", round + 1, e);
                    tokio::time::sleep(self.retry.backoff).await;
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| CoreError::Internal("retry loop exhausted".to_string())))
    }
}

fn classify_send_error(err: reqwest::Error) -> CoreError {
    if err.is_timeout() {
        CoreError::Timeout(err.to_string())
    } else if err.is_connect() {
        CoreError::ConnectionError(err.to_string())
    } else {
        CoreError::HttpError(err)
    }
}

fn status_error(status: StatusCode, body: &str) -> CoreError {
    if status.is_server_error() {
        // The nucleus itself is unhealthy; worth a bounded retry.
        CoreError::ConnectionError(format!("{}: {}", status, body))
    } else {
        CoreError::RemoteError(format!("{}: {}", status, body))
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, CoreError> {
    serde_json::from_str(body)
        .map_err(|e| CoreError::MalformedResponse(format!("unexpected response shape: {}", e)))
}
