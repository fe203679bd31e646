//! Service configuration
//!
//! Read from environment variables, falling back to defaults.

use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::crypto::SignatureScheme;
use crate::oracle::GatewayConfig;
use crate::store::StoreConfig;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub allow_concurrent_requests: bool,
    /// Signers run by the simulated gateway
    pub oracle_signers: usize,
    /// Distinct signatures a proof needs
    pub oracle_threshold: usize,
    pub signature_scheme: SignatureScheme,
    pub delivery_delay_ms: u64,
    pub redeliver_callbacks: bool,
    pub event_buffer: usize,
    pub max_request_size: usize,
    pub snapshot_path: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            allow_concurrent_requests: false,
            oracle_signers: 3,
            oracle_threshold: 2,
            signature_scheme: SignatureScheme::Ed25519,
            delivery_delay_ms: 0,
            redeliver_callbacks: false,
            event_buffer: 256,
            max_request_size: 1024 * 1024,
            snapshot_path: None,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            bind_addr: parse_or(&lookup, "BIND_ADDR", defaults.bind_addr)?,
            allow_concurrent_requests: parse_or(
                &lookup,
                "ALLOW_CONCURRENT_REQUESTS",
                defaults.allow_concurrent_requests,
            )?,
            oracle_signers: parse_or(&lookup, "ORACLE_SIGNERS", defaults.oracle_signers)?,
            oracle_threshold: parse_or(&lookup, "ORACLE_THRESHOLD", defaults.oracle_threshold)?,
            signature_scheme: match lookup("ORACLE_SCHEME") {
                Some(raw) => raw.parse().map_err(|e| anyhow!("ORACLE_SCHEME: {}", e))?,
                None => defaults.signature_scheme,
            },
            delivery_delay_ms: parse_or(&lookup, "ORACLE_DELAY_MS", defaults.delivery_delay_ms)?,
            redeliver_callbacks: parse_or(&lookup, "ORACLE_REDELIVER", defaults.redeliver_callbacks)?,
            event_buffer: parse_or(&lookup, "EVENT_BUFFER", defaults.event_buffer)?,
            max_request_size: parse_or(&lookup, "MAX_REQUEST_SIZE", defaults.max_request_size)?,
            snapshot_path: lookup("SNAPSHOT_PATH")
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.oracle_threshold == 0 {
            bail!("ORACLE_THRESHOLD must be at least 1");
        }
        if self.oracle_threshold > self.oracle_signers {
            bail!(
                "ORACLE_THRESHOLD ({}) exceeds ORACLE_SIGNERS ({})",
                self.oracle_threshold,
                self.oracle_signers
            );
        }
        if self.event_buffer == 0 {
            bail!("EVENT_BUFFER must be at least 1");
        }
        Ok(())
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            allow_concurrent_requests: self.allow_concurrent_requests,
            event_buffer: self.event_buffer,
        }
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            delivery_delay: Duration::from_millis(self.delivery_delay_ms),
            redeliver: self.redeliver_callbacks,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<ServiceConfig> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ServiceConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:3000");
        assert_eq!(config.oracle_signers, 3);
        assert_eq!(config.oracle_threshold, 2);
        assert!(!config.allow_concurrent_requests);
        assert!(config.snapshot_path.is_none());
        assert!(config.gateway_config().delivery_delay.is_zero());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("BIND_ADDR", "0.0.0.0:8080"),
            ("ALLOW_CONCURRENT_REQUESTS", "true"),
            ("ORACLE_SCHEME", "secp256k1"),
            ("ORACLE_DELAY_MS", "250"),
            ("ORACLE_REDELIVER", "true"),
            ("SNAPSHOT_PATH", "/tmp/records.snapshot"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.signature_scheme, SignatureScheme::Ecdsa);
        assert!(config.store_config().allow_concurrent_requests);
        assert_eq!(config.gateway_config().delivery_delay, Duration::from_millis(250));
        assert!(config.gateway_config().redeliver);
        assert_eq!(config.snapshot_path, Some(PathBuf::from("/tmp/records.snapshot")));
    }

    #[test]
    fn test_rejects_bad_threshold() {
        assert!(config_from(&[("ORACLE_THRESHOLD", "0")]).is_err());
        assert!(config_from(&[("ORACLE_SIGNERS", "1"), ("ORACLE_THRESHOLD", "2")]).is_err());
        assert!(config_from(&[("ORACLE_SIGNERS", "1"), ("ORACLE_THRESHOLD", "1")]).is_ok());
    }

    #[test]
    fn test_rejects_unparseable_values() {
        assert!(config_from(&[("ORACLE_SIGNERS", "many")]).is_err());
        assert!(config_from(&[("BIND_ADDR", "localhost")]).is_err());
        assert!(config_from(&[("ORACLE_SCHEME", "rsa")]).is_err());
    }
}
