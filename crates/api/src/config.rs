//! Process configuration, read from the environment at startup.

use std::net::SocketAddr;

use thiserror::Error;

use capledger_core::Amount;
use capledger_ledger::{DEFAULT_WITHDRAWAL_LIMIT, LedgerConfig};

pub const BIND_ADDR_VAR: &str = "CAPLEDGER_BIND_ADDR";
pub const JWT_SECRET_VAR: &str = "JWT_SECRET";
pub const CAPACITY_LIMIT_VAR: &str = "CAPLEDGER_CAPACITY_LIMIT";
pub const WITHDRAWAL_LIMIT_VAR: &str = "CAPLEDGER_WITHDRAWAL_LIMIT";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub ledger: LedgerConfig,
}

impl ApiConfig {
    /// Config with the default bind address, for embedding the router directly.
    pub fn new(jwt_secret: impl Into<String>, ledger: LedgerConfig) -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: jwt_secret.into(),
            ledger,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the config from any variable source (the process environment in `from_env`).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = lookup(BIND_ADDR_VAR)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                var: BIND_ADDR_VAR,
                reason: e.to_string(),
            })?;

        let jwt_secret = lookup(JWT_SECRET_VAR).unwrap_or_else(|| {
            tracing::warn!("{JWT_SECRET_VAR} not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let capacity_limit = lookup(CAPACITY_LIMIT_VAR)
            .ok_or(ConfigError::Missing(CAPACITY_LIMIT_VAR))
            .and_then(|raw| parse_amount(CAPACITY_LIMIT_VAR, &raw))?;

        let withdrawal_limit = match lookup(WITHDRAWAL_LIMIT_VAR) {
            Some(raw) => parse_amount(WITHDRAWAL_LIMIT_VAR, &raw)?,
            None => DEFAULT_WITHDRAWAL_LIMIT,
        };

        let ledger = LedgerConfig::new(capacity_limit).with_withdrawal_limit(withdrawal_limit);
        ledger.validate().map_err(|e| ConfigError::Invalid {
            var: if capacity_limit == 0 {
                CAPACITY_LIMIT_VAR
            } else {
                WITHDRAWAL_LIMIT_VAR
            },
            reason: e.to_string(),
        })?;

        Ok(Self {
            bind_addr,
            jwt_secret,
            ledger,
        })
    }
}

impl core::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &"<redacted>")
            .field("ledger", &self.ledger)
            .finish()
    }
}

fn parse_amount(var: &'static str, raw: &str) -> Result<Amount, ConfigError> {
    raw.trim().parse::<Amount>().map_err(|e| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_capacity_is_set() {
        let config = ApiConfig::from_lookup(lookup(&[(CAPACITY_LIMIT_VAR, "10000")])).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(config.ledger, LedgerConfig::new(10_000));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = ApiConfig::from_lookup(lookup(&[
            (BIND_ADDR_VAR, "127.0.0.1:9000"),
            (JWT_SECRET_VAR, "s3cret"),
            (CAPACITY_LIMIT_VAR, "500"),
            (WITHDRAWAL_LIMIT_VAR, "50"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.ledger.withdrawal_limit, 50);
    }

    #[test]
    fn capacity_is_required() {
        assert_eq!(
            ApiConfig::from_lookup(lookup(&[])),
            Err(ConfigError::Missing(CAPACITY_LIMIT_VAR))
        );
    }

    #[test]
    fn zero_or_garbage_limits_are_invalid() {
        let zero = ApiConfig::from_lookup(lookup(&[(CAPACITY_LIMIT_VAR, "0")])).unwrap_err();
        assert!(matches!(zero, ConfigError::Invalid { var, .. } if var == CAPACITY_LIMIT_VAR));

        let garbage = ApiConfig::from_lookup(lookup(&[
            (CAPACITY_LIMIT_VAR, "100"),
            (WITHDRAWAL_LIMIT_VAR, "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(garbage, ConfigError::Invalid { var, .. } if var == WITHDRAWAL_LIMIT_VAR));
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let config = ApiConfig::new("hunter2", LedgerConfig::new(1));
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
