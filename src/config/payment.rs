//! Payment gateway configuration (Midtrans)

use std::net::IpAddr;

use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Midtrans gateway configuration.
///
/// The server key signs webhook notifications (SHA-512 over
/// order id + status code + gross amount + key) and must never be
/// exposed to clients. Sandbox keys carry the `SB-` prefix.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentConfig {
    /// Midtrans server key (secret, used for signature verification)
    pub midtrans_server_key: String,

    /// Midtrans client key (public, embedded in checkout pages)
    pub midtrans_client_key: Option<String>,

    /// Restrict the webhook endpoint to known gateway addresses
    #[serde(default)]
    pub ip_allowlist_enabled: bool,

    /// Allowed webhook source addresses (comma-separated)
    pub ip_allowlist: Option<String>,
}

impl PaymentConfig {
    /// Check if using a Midtrans sandbox key
    pub fn is_sandbox(&self) -> bool {
        self.midtrans_server_key.starts_with("SB-")
    }

    /// Parse the allowlist into addresses, skipping blanks.
    pub fn allowlist_addrs(&self) -> Vec<IpAddr> {
        self.ip_allowlist
            .as_ref()
            .map(|s| {
                s.split(',')
                    .filter_map(|entry| entry.trim().parse().ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Validate payment configuration against the running environment.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.midtrans_server_key.is_empty() {
            return Err(ValidationError::MissingRequired("MIDTRANS_SERVER_KEY"));
        }

        // Both "Mid-server-xxx" (production) and "SB-Mid-server-xxx" (sandbox)
        if !self.midtrans_server_key.contains("Mid-server-") {
            return Err(ValidationError::InvalidServerKey);
        }
        if *environment == Environment::Production && self.is_sandbox() {
            return Err(ValidationError::SandboxKeyInProduction);
        }

        if self.ip_allowlist_enabled {
            let raw_entries: Vec<&str> = self
                .ip_allowlist
                .as_deref()
                .unwrap_or("")
                .split(',')
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .collect();

            if raw_entries.is_empty() {
                return Err(ValidationError::EmptyIpAllowlist);
            }
            for entry in raw_entries {
                if entry.parse::<IpAddr>().is_err() {
                    return Err(ValidationError::InvalidAllowlistEntry(entry.to_string()));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox_config() -> PaymentConfig {
        PaymentConfig {
            midtrans_server_key: "SB-Mid-server-abcd1234".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_is_sandbox() {
        assert!(sandbox_config().is_sandbox());

        let config = PaymentConfig {
            midtrans_server_key: "Mid-server-abcd1234".to_string(),
            ..Default::default()
        };
        assert!(!config.is_sandbox());
    }

    #[test]
    fn test_validation_missing_server_key() {
        let config = PaymentConfig::default();
        assert!(config.validate(&Environment::Development).is_err());
    }

    #[test]
    fn test_validation_invalid_server_key_format() {
        let config = PaymentConfig {
            midtrans_server_key: "sk_test_xxx".to_string(),
            ..Default::default()
        };
        assert!(config.validate(&Environment::Development).is_err());
    }

    #[test]
    fn test_validation_sandbox_key_rejected_in_production() {
        let config = sandbox_config();
        assert!(config.validate(&Environment::Development).is_ok());
        assert!(config.validate(&Environment::Production).is_err());
    }

    #[test]
    fn test_validation_allowlist_enabled_but_empty() {
        let config = PaymentConfig {
            midtrans_server_key: "Mid-server-abcd1234".to_string(),
            ip_allowlist_enabled: true,
            ip_allowlist: None,
            ..Default::default()
        };
        assert!(config.validate(&Environment::Production).is_err());
    }

    #[test]
    fn test_validation_allowlist_rejects_garbage_entry() {
        let config = PaymentConfig {
            midtrans_server_key: "Mid-server-abcd1234".to_string(),
            ip_allowlist_enabled: true,
            ip_allowlist: Some("103.10.128.15, not-an-ip".to_string()),
            ..Default::default()
        };
        assert!(config.validate(&Environment::Production).is_err());
    }

    #[test]
    fn test_allowlist_parsing() {
        let config = PaymentConfig {
            midtrans_server_key: "Mid-server-abcd1234".to_string(),
            ip_allowlist_enabled: true,
            ip_allowlist: Some("103.10.128.15, 103.10.129.16".to_string()),
            ..Default::default()
        };
        assert!(config.validate(&Environment::Production).is_ok());

        let addrs = config.allowlist_addrs();
        assert_eq!(addrs.len(), 2);
        assert_eq!(addrs[0], "103.10.128.15".parse::<IpAddr>().unwrap());
    }
}
