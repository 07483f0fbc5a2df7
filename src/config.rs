use crate::domain::Decimal;
use crate::engine::CommissionRates;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub commission: CommissionRates,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let defaults = CommissionRates::default();
        let lead_platform_pct =
            parse_percent(&env_map, "LEAD_PLATFORM_RATE_PCT", defaults.lead_platform_pct)?;
        let request_platform_pct = parse_percent(
            &env_map,
            "REQUEST_PLATFORM_RATE_PCT",
            defaults.request_platform_pct,
        )?;

        let default_referrer_share_pct = match env_map.get("DEFAULT_REFERRER_SHARE_PCT") {
            None => defaults.default_referrer_share_pct,
            Some(raw) => raw
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|v| *v <= 100)
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "DEFAULT_REFERRER_SHARE_PCT".to_string(),
                        format!("must be an integer between 0 and 100, got {}", raw),
                    )
                })?,
        };

        Ok(Config {
            port,
            database_path,
            commission: CommissionRates {
                lead_platform_pct,
                request_platform_pct,
                default_referrer_share_pct,
            },
        })
    }
}

/// A percentage in [0, 100], decimals allowed ("7.5").
fn parse_percent(
    env_map: &HashMap<String, String>,
    key: &str,
    default: Decimal,
) -> Result<Decimal, ConfigError> {
    let Some(raw) = env_map.get(key) else {
        return Ok(default);
    };
    let value = Decimal::from_str_canonical(raw).map_err(|_| {
        ConfigError::InvalidValue(key.to_string(), format!("must be a decimal, got {}", raw))
    })?;
    if value.is_negative() || value > Decimal::hundred() {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("must be between 0 and 100, got {}", raw),
        ));
    }
    Ok(value)
}
