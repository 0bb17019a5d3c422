//! Fraud screening client

use async_trait::async_trait;
use reqwest::Method;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use moneybee_domain::{CollaboratorError, FraudCheckRequest, FraudScreen};
use moneybee_types::RiskLevel;

use crate::config::CollaboratorConfig;
use crate::transport::Transport;

#[derive(Debug, Serialize)]
struct CheckBody {
    sender_id: Uuid,
    receiver_id: Uuid,
    amount: Decimal,
    sender_national_id: String,
}

#[derive(Debug, Deserialize)]
struct VerdictBody {
    risk_level: RiskLevel,
}

pub struct HttpFraudScreen {
    transport: Transport,
    base_url: String,
}

impl HttpFraudScreen {
    pub fn new(base_url: String, config: CollaboratorConfig) -> Self {
        Self {
            transport: Transport::new("fraud service", config),
            base_url,
        }
    }
}

#[async_trait]
impl FraudScreen for HttpFraudScreen {
    async fn check(&self, request: &FraudCheckRequest) -> Result<RiskLevel, CollaboratorError> {
        let url = format!("{}/api/fraud/check", self.base_url);
        let body = CheckBody {
            sender_id: request.sender_id,
            receiver_id: request.receiver_id,
            amount: request.amount_in_try,
            sender_national_id: request.sender_national_id.clone(),
        };

        // the fraud verdict is a pure function of its inputs, so a retry
        // cannot duplicate a side effect
        let verdict: Option<VerdictBody> = self
            .transport
            .request_json(Method::POST, &url, Some(&body), true)
            .await?;

        match verdict {
            Some(v) => Ok(v.risk_level),
            None => Err(CollaboratorError::Contract {
                service: "fraud service",
                detail: "404 for a check request".to_string(),
            }),
        }
    }
}
