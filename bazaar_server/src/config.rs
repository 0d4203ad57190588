use std::env;

use bazaar_engine::PolicyLimits;
use bzr_common::Secret;
use chrono::Duration;
use gateway_tools::GatewayConfig;
use log::*;

const DEFAULT_BZR_HOST: &str = "127.0.0.1";
const DEFAULT_BZR_PORT: u16 = 8360;
const DEFAULT_PAYMENT_TIMEOUT: Duration = Duration::minutes(15);
const DEFAULT_ACCEPTANCE_WINDOW: Duration = Duration::days(7);
const DEFAULT_EXPIRY_SWEEP_INTERVAL: Duration = Duration::minutes(10);
const DEFAULT_COMPLETION_SWEEP_INTERVAL: Duration = Duration::minutes(30);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Credentials for the outbound gateway REST client.
    pub gateway: GatewayConfig,
    /// Shared secret for inbound webhook signatures and client-side payment signatures.
    pub webhook_secret: Secret<String>,
    /// How long a pending order may go unpaid before the expiry sweep claims it.
    pub payment_timeout: Duration,
    /// How long an accepted order stays open before the completion sweep settles it.
    pub acceptance_window: Duration,
    pub expiry_sweep_interval: Duration,
    pub completion_sweep_interval: Duration,
    pub limits: PolicyLimits,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_BZR_HOST.to_string(),
            port: DEFAULT_BZR_PORT,
            database_url: String::default(),
            gateway: GatewayConfig::default(),
            webhook_secret: Secret::default(),
            payment_timeout: DEFAULT_PAYMENT_TIMEOUT,
            acceptance_window: DEFAULT_ACCEPTANCE_WINDOW,
            expiry_sweep_interval: DEFAULT_EXPIRY_SWEEP_INTERVAL,
            completion_sweep_interval: DEFAULT_COMPLETION_SWEEP_INTERVAL,
            limits: PolicyLimits::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("BZR_HOST").ok().unwrap_or_else(|| DEFAULT_BZR_HOST.into());
        let port = env::var("BZR_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for BZR_PORT. {e} Using the default, {DEFAULT_BZR_PORT}, instead."
                    );
                    DEFAULT_BZR_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_BZR_PORT);
        let database_url = env::var("BZR_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ BZR_DATABASE_URL is not set. Please set it to the URL for the marketplace database.");
            String::default()
        });
        let webhook_secret = Secret::new(env::var("BZR_WEBHOOK_SECRET").unwrap_or_else(|_| {
            error!("🪛️ BZR_WEBHOOK_SECRET is not set. Webhook deliveries will not verify until it is.");
            String::default()
        }));
        let gateway = GatewayConfig::new_from_env_or_default();
        let payment_timeout = duration_from_env("BZR_PAYMENT_TIMEOUT_MINUTES", Duration::minutes, DEFAULT_PAYMENT_TIMEOUT);
        let acceptance_window = duration_from_env("BZR_ACCEPTANCE_WINDOW_DAYS", Duration::days, DEFAULT_ACCEPTANCE_WINDOW);
        let expiry_sweep_interval =
            duration_from_env("BZR_EXPIRY_SWEEP_INTERVAL_MINUTES", Duration::minutes, DEFAULT_EXPIRY_SWEEP_INTERVAL);
        let completion_sweep_interval = duration_from_env(
            "BZR_COMPLETION_SWEEP_INTERVAL_MINUTES",
            Duration::minutes,
            DEFAULT_COMPLETION_SWEEP_INTERVAL,
        );
        let defaults = PolicyLimits::default();
        let limits = PolicyLimits {
            max_orders_per_day: quota_from_env("BZR_MAX_ORDERS_PER_DAY", defaults.max_orders_per_day),
            max_cancellations_per_day: quota_from_env("BZR_MAX_CANCELLATIONS_PER_DAY", defaults.max_cancellations_per_day),
            max_deletes_per_hour: quota_from_env("BZR_MAX_DELETES_PER_HOUR", defaults.max_deletes_per_hour),
        };
        Self {
            host,
            port,
            database_url,
            gateway,
            webhook_secret,
            payment_timeout,
            acceptance_window,
            expiry_sweep_interval,
            completion_sweep_interval,
            limits,
        }
    }
}

fn duration_from_env(var: &str, unit: fn(i64) -> Duration, default: Duration) -> Duration {
    match env::var(var) {
        Ok(s) => match s.parse::<i64>() {
            Ok(n) if n > 0 => unit(n),
            _ => {
                warn!("🪛️ {s} is not a valid value for {var}. Using the default instead.");
                default
            },
        },
        Err(_) => default,
    }
}

fn quota_from_env(var: &str, default: u32) -> u32 {
    match env::var(var) {
        Ok(s) => s.parse::<u32>().unwrap_or_else(|e| {
            warn!("🪛️ {s} is not a valid value for {var}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => default,
    }
}
