//! Exchange-rate client

use async_trait::async_trait;
use reqwest::Method;
use rust_decimal::Decimal;
use serde::Deserialize;

use moneybee_domain::{CollaboratorError, RateSource};
use moneybee_types::Currency;

use crate::config::CollaboratorConfig;
use crate::transport::Transport;

#[derive(Debug, Deserialize)]
struct RateBody {
    rate: Decimal,
}

pub struct HttpRateSource {
    transport: Transport,
    base_url: String,
}

impl HttpRateSource {
    pub fn new(base_url: String, config: CollaboratorConfig) -> Self {
        Self {
            transport: Transport::new("exchange rate service", config),
            base_url,
        }
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    async fn get_rate(&self, from: Currency, to: Currency) -> Result<Decimal, CollaboratorError> {
        let url = format!("{}/api/rates?from={}&to={}", self.base_url, from, to);

        let body: Option<RateBody> = self
            .transport
            .request_json::<(), _>(Method::GET, &url, None, true)
            .await?;

        match body {
            Some(r) => Ok(r.rate),
            None => Err(CollaboratorError::Contract {
                service: "exchange rate service",
                detail: format!("no rate for {}->{}", from, to),
            }),
        }
    }
}
