//! Customer directory client

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use uuid::Uuid;

use moneybee_domain::{CollaboratorError, CustomerDirectory, CustomerRecord};
use moneybee_types::CustomerStatus;

use crate::config::CollaboratorConfig;
use crate::transport::Transport;

#[derive(Debug, Deserialize)]
struct CustomerBody {
    id: Uuid,
    national_id: String,
    status: CustomerStatus,
    kyc_verified: bool,
}

pub struct HttpCustomerDirectory {
    transport: Transport,
    base_url: String,
}

impl HttpCustomerDirectory {
    pub fn new(base_url: String, config: CollaboratorConfig) -> Self {
        Self {
            transport: Transport::new("customer service", config),
            base_url,
        }
    }
}

#[async_trait]
impl CustomerDirectory for HttpCustomerDirectory {
    async fn get_by_national_id(
        &self,
        national_id: &str,
    ) -> Result<Option<CustomerRecord>, CollaboratorError> {
        let url = format!(
            "{}/api/customers/by-national-id/{}",
            self.base_url, national_id
        );

        let body: Option<CustomerBody> = self
            .transport
            .request_json::<(), _>(Method::GET, &url, None, true)
            .await?;

        Ok(body.map(|c| CustomerRecord {
            id: c.id,
            national_id: c.national_id,
            status: c.status,
            kyc_verified: c.kyc_verified,
        }))
    }
}
