//! Auth service client

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use moneybee_domain::{CollaboratorError, KeyValidator};

use crate::config::CollaboratorConfig;
use crate::transport::Transport;

#[derive(Debug, Serialize)]
struct ValidateBody<'a> {
    api_key: &'a str,
}

#[derive(Debug, Deserialize)]
struct ValidateResponse {
    is_valid: bool,
}

pub struct HttpKeyValidator {
    transport: Transport,
    base_url: String,
}

impl HttpKeyValidator {
    pub fn new(base_url: String, config: CollaboratorConfig) -> Self {
        Self {
            transport: Transport::new("auth service", config),
            base_url,
        }
    }
}

#[async_trait]
impl KeyValidator for HttpKeyValidator {
    async fn validate(&self, api_key: &str) -> Result<bool, CollaboratorError> {
        let url = format!("{}/api/auth/validate", self.base_url);
        let body = ValidateBody { api_key };

        // validation does not mutate auth state; safe to retry
        let response: Option<ValidateResponse> = self
            .transport
            .request_json(Method::POST, &url, Some(&body), true)
            .await?;

        match response {
            Some(r) => Ok(r.is_valid),
            None => Err(CollaboratorError::Contract {
                service: "auth service",
                detail: "404 for a validate request".to_string(),
            }),
        }
    }
}
