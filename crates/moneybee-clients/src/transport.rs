//! Shared HTTP transport for collaborator clients
//!
//! One place owns deadlines, retries, breaker accounting, and error
//! classification so the per-service clients stay declarative.

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use moneybee_domain::CollaboratorError;

use crate::backoff::BackOff;
use crate::breaker::CircuitBreaker;
use crate::config::CollaboratorConfig;

pub(crate) struct Transport {
    service: &'static str,
    client: reqwest::Client,
    breaker: CircuitBreaker,
    config: CollaboratorConfig,
}

impl Transport {
    pub fn new(service: &'static str, config: CollaboratorConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .expect("failed to build HTTP client");

        let breaker = CircuitBreaker::new(
            service,
            config.breaker_failure_threshold,
            config.breaker_cooldown(),
        );

        Self {
            service,
            client,
            breaker,
            config,
        }
    }

    /// Issue a JSON request. 2xx decodes into `Some(T)`, 404 becomes
    /// `None`, everything else is classified. Transient failures are
    /// retried with backoff only when `idempotent`, since retrying a
    /// non-idempotent call could duplicate a side effect.
    pub async fn request_json<B, T>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
        idempotent: bool,
    ) -> Result<Option<T>, CollaboratorError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        if !self.breaker.is_allowed() {
            return Err(CollaboratorError::Unavailable {
                service: self.service,
                detail: "circuit open".to_string(),
            });
        }

        let mut backoff = BackOff::new(
            self.config.retry_attempts.saturating_sub(1),
            self.config.retry_base_delay(),
            2.0,
        );

        loop {
            match self.attempt(method.clone(), url, body).await {
                Ok(outcome) => {
                    self.breaker.record_success();
                    return outcome;
                }
                Err(err) => {
                    self.breaker.record_failure();
                    if !idempotent || backoff.is_finished() {
                        return Err(err);
                    }
                    debug!(
                        service = self.service,
                        attempt = backoff.attempts() + 1,
                        error = %err,
                        "Retrying collaborator call"
                    );
                    backoff.wait().await;
                }
            }
        }
    }

    /// One attempt. The outer `Result` is transient (retryable); the
    /// inner one is final.
    async fn attempt<B, T>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<Result<Option<T>, CollaboratorError>, CollaboratorError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                CollaboratorError::Timeout {
                    service: self.service,
                }
            } else {
                CollaboratorError::Unavailable {
                    service: self.service,
                    detail: e.to_string(),
                }
            }
        })?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(Ok(None));
        }

        if status.is_server_error() {
            return Err(CollaboratorError::Unavailable {
                service: self.service,
                detail: format!("status {}", status.as_u16()),
            });
        }

        if !status.is_success() {
            warn!(
                service = self.service,
                status = status.as_u16(),
                "Unexpected collaborator status"
            );
            return Ok(Err(CollaboratorError::Contract {
                service: self.service,
                detail: format!("status {}", status.as_u16()),
            }));
        }

        match response.json::<T>().await {
            Ok(value) => Ok(Ok(Some(value))),
            Err(e) => Ok(Err(CollaboratorError::Contract {
                service: self.service,
                detail: format!("undecodable body: {}", e),
            })),
        }
    }
}
