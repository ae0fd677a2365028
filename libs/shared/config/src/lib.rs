use std::env;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub payment_gateway_timeout_secs: u64,
    pub appointment_price_minor: i64,
    pub rollover_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            database_max_connections: 5,
            payment_gateway_timeout_secs: 30,
            appointment_price_minor: 30_000,
            rollover_interval_secs: 3_600,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("DATABASE_URL not set, using empty value");
                    String::new()
                }),
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", defaults.database_max_connections),
            payment_gateway_timeout_secs: parse_or("PAYMENT_GATEWAY_TIMEOUT_SECS", defaults.payment_gateway_timeout_secs),
            appointment_price_minor: parse_or("APPOINTMENT_PRICE_MINOR", defaults.appointment_price_minor),
            rollover_interval_secs: parse_or("ROLLOVER_INTERVAL_SECS", defaults.rollover_interval_secs),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.database_url.is_empty()
    }

    pub fn payment_gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.payment_gateway_timeout_secs.max(1))
    }

    pub fn rollover_interval(&self) -> Duration {
        Duration::from_secs(self.rollover_interval_secs.max(1))
    }
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_use_standard_consultation_price() {
        let config = AppConfig::default();
        assert_eq!(config.appointment_price_minor, 30_000);
        assert_eq!(config.payment_gateway_timeout(), Duration::from_secs(30));
        assert!(!config.is_configured());
    }

    #[test]
    fn test_zero_durations_are_clamped_to_one_second() {
        let config = AppConfig {
            payment_gateway_timeout_secs: 0,
            rollover_interval_secs: 0,
            ..AppConfig::default()
        };
        assert_eq!(config.payment_gateway_timeout(), Duration::from_secs(1));
        assert_eq!(config.rollover_interval(), Duration::from_secs(1));
    }
}
