use bzr_common::Secret;
use log::*;

#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    /// Base URL of the gateway's REST API, without a trailing slash.
    pub base_url: String,
    pub key_id: String,
    pub key_secret: Secret<String>,
}

impl GatewayConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("BZR_GATEWAY_BASE_URL").unwrap_or_else(|_| {
            warn!("BZR_GATEWAY_BASE_URL not set, using https://api.gateway.test/v1 as default");
            "https://api.gateway.test/v1".to_string()
        });
        let key_id = std::env::var("BZR_GATEWAY_API_KEY").unwrap_or_else(|_| {
            warn!("BZR_GATEWAY_API_KEY not set, using (probably useless) default");
            "rzp_test_0000000000".to_string()
        });
        let key_secret = Secret::new(std::env::var("BZR_GATEWAY_API_SECRET").unwrap_or_else(|_| {
            warn!("BZR_GATEWAY_API_SECRET not set, using (probably useless) default");
            "00000000000000".to_string()
        }));
        Self { base_url, key_id, key_secret }
    }
}
