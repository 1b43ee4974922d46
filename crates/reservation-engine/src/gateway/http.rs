//! HTTP client for the inventory API.
//!
//! Every response is a `{ "data": [...] }` envelope. Anything other than a 200 with that shape
//! is a [`GatewayError`].

use super::{ExternalOrder, ExternalOrderRequest, GatewayError, InventoryGateway};
use crate::config::InventoryApiConfig;
use crate::model::Sku;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct InventorySummary {
    sku: Sku,
    sellable_qty: i64,
}

/// Inventory API client authenticated with a static key.
#[derive(Clone)]
pub struct HttpInventoryGateway {
    client: Client,
    api_url: String,
    api_key: String,
    facility_id: Option<String>,
}

impl HttpInventoryGateway {
    pub fn new(config: &InventoryApiConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::RequestFailed(e.to_string()))?;
        Ok(Self {
            client,
            api_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            facility_id: config.facility_id.clone(),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request
            .header("x-api-key", &self.api_key)
            .header("accept", "application/json");
        match &self.facility_id {
            Some(facility_id) => request.header("x-facility-id", facility_id),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        self.authorize(request)
            .send()
            .await
            .map_err(|e| GatewayError::RequestFailed(e.to_string()))
    }

    async fn envelope<T: DeserializeOwned>(response: Response) -> Result<Vec<T>, GatewayError> {
        match response.status() {
            StatusCode::OK => response
                .json::<Envelope<T>>()
                .await
                .map(|envelope| envelope.data)
                .map_err(|e| GatewayError::Malformed(e.to_string())),
            status => {
                let body = response.text().await.unwrap_or_default();
                warn!(status = status.as_u16(), "Inventory API returned an error");
                Err(GatewayError::ApiError {
                    status: status.as_u16(),
                    message: body,
                })
            }
        }
    }

    async fn single_order(response: Response) -> Result<ExternalOrder, GatewayError> {
        Self::envelope::<ExternalOrder>(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::Malformed("empty order envelope".to_string()))
    }
}

#[async_trait]
impl InventoryGateway for HttpInventoryGateway {
    #[instrument(skip(self))]
    async fn sellable_quantity(&self, sku: &Sku) -> Result<u32, GatewayError> {
        let mut request = self
            .client
            .get(format!("{}/inventory_summaries", self.api_url))
            .query(&[("sku", sku.0.as_str())]);
        if let Some(facility_id) = &self.facility_id {
            request = request.query(&[("facility_id", facility_id.as_str())]);
        }

        let summaries: Vec<InventorySummary> = Self::envelope(self.send(request).await?).await?;
        let matching: Vec<&InventorySummary> =
            summaries.iter().filter(|summary| &summary.sku == sku).collect();
        if matching.is_empty() {
            return Err(GatewayError::UnknownSku(sku.clone()));
        }
        let total: i64 = matching.iter().map(|summary| summary.sellable_qty.max(0)).sum();
        debug!(%sku, sellable = total, "Fetched sellable quantity");
        Ok(u32::try_from(total).unwrap_or(u32::MAX))
    }

    #[instrument(skip(self, request), fields(reference = %request.reference))]
    async fn create_order(&self, request: &ExternalOrderRequest) -> Result<ExternalOrder, GatewayError> {
        let call = self
            .client
            .post(format!("{}/orders", self.api_url))
            .json(request);
        Self::single_order(self.send(call).await?).await
    }

    #[instrument(skip(self, request), fields(reference = %request.reference))]
    async fn update_order(
        &self,
        external_id: &str,
        request: &ExternalOrderRequest,
    ) -> Result<ExternalOrder, GatewayError> {
        let call = self
            .client
            .put(format!("{}/orders/{external_id}", self.api_url))
            .json(request);
        Self::single_order(self.send(call).await?).await
    }
}
