//! Configuration module for studio-service.

use rust_decimal::Decimal;
use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::services::StudioPolicy;

#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub reminders: ReminderConfig,
    pub policy: PolicyConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct ReminderConfig {
    pub interval_secs: u64,
    pub resend_after_hours: i64,
    pub webhook_url: Option<String>,
}

impl ReminderConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

#[derive(Debug, Clone)]
pub struct PolicyConfig {
    pub payment_terms_days: i64,
    pub high_value_threshold: Decimal,
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl StudioConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME").unwrap_or_else(|_| "studio-service".to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database: DatabaseConfig {
                url: Secret::new(env::var("DATABASE_URL").map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!("DATABASE_URL is required"))
                })?),
                max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10),
                min_connections: parse_or("DATABASE_MIN_CONNECTIONS", 2),
            },
            reminders: ReminderConfig {
                interval_secs: parse_or("REMINDER_INTERVAL_SECS", 3600),
                resend_after_hours: parse_or("REMINDER_RESEND_AFTER_HOURS", 24),
                webhook_url: env::var("REMINDER_WEBHOOK_URL")
                    .ok()
                    .filter(|s| !s.is_empty()),
            },
            policy: PolicyConfig {
                payment_terms_days: parse_or("PAYMENT_TERMS_DAYS", 14),
                high_value_threshold: parse_or("HIGH_VALUE_THRESHOLD", Decimal::from(5000)),
            },
        })
    }

    /// Engine policy derived from configuration.
    pub fn studio_policy(&self) -> StudioPolicy {
        StudioPolicy {
            high_value_threshold: self.policy.high_value_threshold,
            payment_terms_days: self.policy.payment_terms_days,
            reminder_resend_after: chrono::Duration::hours(self.reminders.resend_after_hours),
        }
    }
}
