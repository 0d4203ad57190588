use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::GatewayConfig,
    data_objects::{GatewayOrder, GatewayPayment, GatewayRefund, NewGatewayOrder, NewRefund},
    GatewayApiError,
};

#[derive(Clone)]
pub struct GatewayApi {
    config: GatewayConfig,
    client: Arc<Client>,
}

impl GatewayApi {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, GatewayApiError> {
        let url = self.url(path);
        trace!("Sending REST query: {url}");
        let mut req = self
            .client
            .request(method, url)
            .basic_auth(&self.config.key_id, Some(self.config.key_secret.reveal()));
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| GatewayApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| GatewayApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| GatewayApiError::RestResponseError(e.to_string()))?;
            Err(GatewayApiError::QueryError { status, message })
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    /// Creates a gateway order to open a checkout session against.
    pub async fn create_order(&self, new_order: NewGatewayOrder) -> Result<GatewayOrder, GatewayApiError> {
        debug!("Creating gateway order for receipt {}", new_order.receipt);
        let order = self.rest_query::<GatewayOrder, _>(Method::POST, "/orders", Some(new_order)).await?;
        info!("Created gateway order {} ({} {})", order.id, order.amount, order.currency);
        Ok(order)
    }

    pub async fn get_payment(&self, payment_id: &str) -> Result<GatewayPayment, GatewayApiError> {
        let path = format!("/payments/{payment_id}");
        self.rest_query::<GatewayPayment, ()>(Method::GET, &path, None).await
    }

    /// Issues a refund against a captured payment. The gateway reports the final outcome through
    /// its webhook; a success here only means the refund was accepted for processing.
    pub async fn create_refund(&self, payment_id: &str, refund: NewRefund) -> Result<GatewayRefund, GatewayApiError> {
        debug!("Requesting refund of {} against payment {payment_id}", refund.amount);
        let path = format!("/payments/{payment_id}/refund");
        let refund = self.rest_query::<GatewayRefund, _>(Method::POST, &path, Some(refund)).await?;
        info!("Gateway accepted refund {} for payment {payment_id}", refund.id);
        Ok(refund)
    }

    pub async fn get_refund(&self, payment_id: &str, refund_id: &str) -> Result<GatewayRefund, GatewayApiError> {
        let path = format!("/payments/{payment_id}/refunds/{refund_id}");
        self.rest_query::<GatewayRefund, ()>(Method::GET, &path, None).await
    }
}
