use std::{collections::BTreeMap, path::Path};

use async_trait::async_trait;
use serde::{de::IgnoredAny, Deserialize};
use tracing::debug;

use super::{AgentOptions, OptionsError, OptionsSource};
use crate::{error::GenericError, model::AccountId};

/// Identity agent (SIA) configuration, as written on disk.
///
/// Only the fields relevant to service discovery are read; everything else in the file is ignored.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SiaConfig {
    #[serde(default)]
    domain: Option<String>,

    #[serde(default)]
    service: Option<String>,

    #[serde(default)]
    services: BTreeMap<String, IgnoredAny>,

    #[serde(default)]
    accounts: Vec<SiaAccount>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct SiaAccount {
    #[serde(default)]
    account: String,

    #[serde(default)]
    domain: Option<String>,

    #[serde(default)]
    service: Option<String>,
}

impl SiaConfig {
    /// Parses a configuration from its JSON representation.
    ///
    /// # Errors
    ///
    /// If the data is not a valid configuration document, an error is returned.
    pub fn from_slice(data: &[u8]) -> Result<Self, GenericError> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Resolves the configuration for the given account.
    ///
    /// When the configuration declares accounts, the entry for `account_id` must exist, and its domain takes precedence
    /// over the top-level one. Service names come from the keys of `services` when present, falling back to a
    /// comma-separated `service` declared on the account entry, and then at the top level.
    ///
    /// # Errors
    ///
    /// If the account is not declared, no domain can be determined, or a declared service name is empty, an error is
    /// returned.
    pub fn resolve(&self, account_id: &AccountId) -> Result<AgentOptions, OptionsError> {
        let entry = if self.accounts.is_empty() {
            None
        } else {
            let entry = self
                .accounts
                .iter()
                .find(|entry| entry.account.trim() == account_id.as_str())
                .ok_or_else(|| OptionsError::AccountMismatch {
                    account: account_id.clone(),
                    declared: self.accounts.iter().map(|entry| entry.account.clone()).collect(),
                })?;
            Some(entry)
        };

        let domain = entry
            .and_then(|entry| non_empty(entry.domain.as_deref()))
            .or_else(|| non_empty(self.domain.as_deref()))
            .ok_or_else(|| OptionsError::MissingDomain {
                account: account_id.clone(),
            })?;

        let services = if !self.services.is_empty() {
            self.services.keys().map(|name| name.trim().to_string()).collect::<Vec<_>>()
        } else {
            match entry
                .and_then(|entry| entry.service.as_deref())
                .or(self.service.as_deref())
            {
                Some(list) if !list.trim().is_empty() => list.split(',').map(|name| name.trim().to_string()).collect(),
                _ => Vec::new(),
            }
        };

        if services.iter().any(|name| name.is_empty()) {
            return Err(OptionsError::InvalidService {
                reason: "service names must not be empty".to_string(),
            });
        }

        Ok(AgentOptions::new(domain, account_id.clone(), services))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Loads identity agent options from the SIA configuration file on the local filesystem.
#[derive(Clone, Debug, Default)]
pub struct SiaConfigFile;

#[async_trait]
impl OptionsSource for SiaConfigFile {
    async fn load(&self, path: &Path, account_id: &AccountId) -> Result<AgentOptions, OptionsError> {
        let data = tokio::fs::read(path).await.map_err(|e| OptionsError::Load {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        let config = SiaConfig::from_slice(&data).map_err(|source| OptionsError::Load {
            path: path.to_path_buf(),
            source,
        })?;

        let options = config.resolve(account_id)?;
        debug!(
            config_path = %path.display(),
            account_id = %account_id,
            domain = options.domain(),
            services = options.services().len(),
            "Resolved identity agent options."
        );

        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    fn account(id: &str) -> AccountId {
        AccountId::new(id).unwrap()
    }

    fn parse(json: &str) -> SiaConfig {
        SiaConfig::from_slice(json.as_bytes()).unwrap()
    }

    #[test]
    fn account_entry_supplies_domain_and_service() {
        let config = parse(r#"{"accounts": [{"account": "1234", "domain": "sports", "service": "api"}]}"#);
        let options = config.resolve(&account("1234")).unwrap();

        assert_eq!(options.domain(), "sports");
        assert_eq!(options.services(), &["api".to_string()]);
        assert_eq!(options.account(), &account("1234"));
    }

    #[test]
    fn services_map_takes_precedence() {
        let config = parse(
            r#"{
                "services": {"ui": {"filename": "ui.pem"}, "api": {}},
                "accounts": [{"account": "1234", "domain": "sports", "service": "ignored"}]
            }"#,
        );
        let options = config.resolve(&account("1234")).unwrap();

        assert_eq!(options.services(), &["api".to_string(), "ui".to_string()]);
    }

    #[test]
    fn comma_separated_services() {
        let config = parse(r#"{"domain": "sports", "service": "api, ui"}"#);
        let options = config.resolve(&account("1234")).unwrap();

        assert_eq!(options.services(), &["api".to_string(), "ui".to_string()]);
    }

    #[test]
    fn no_services_declared() {
        let config = parse(r#"{"accounts": [{"account": "1234", "domain": "sports"}]}"#);
        let options = config.resolve(&account("1234")).unwrap();

        assert!(options.services().is_empty());
    }

    #[test]
    fn account_entry_domain_overrides_top_level() {
        let config = parse(r#"{"domain": "weather", "accounts": [{"account": "1234", "domain": "sports"}]}"#);
        assert_eq!(config.resolve(&account("1234")).unwrap().domain(), "sports");

        let config = parse(r#"{"domain": "weather", "accounts": [{"account": "1234", "domain": " "}]}"#);
        assert_eq!(config.resolve(&account("1234")).unwrap().domain(), "weather");
    }

    #[test]
    fn undeclared_account_is_rejected() {
        let config = parse(r#"{"accounts": [{"account": "1234", "domain": "sports"}]}"#);
        assert!(matches!(
            config.resolve(&account("5678")),
            Err(OptionsError::AccountMismatch { declared, .. }) if declared == vec!["1234".to_string()]
        ));
    }

    #[test]
    fn missing_domain_is_rejected() {
        let config = parse(r#"{"service": "api"}"#);
        assert!(matches!(
            config.resolve(&account("1234")),
            Err(OptionsError::MissingDomain { .. })
        ));
    }

    #[test]
    fn empty_service_name_is_rejected() {
        let config = parse(r#"{"domain": "sports", "service": "api,,ui"}"#);
        assert!(matches!(
            config.resolve(&account("1234")),
            Err(OptionsError::InvalidService { .. })
        ));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let config = parse(r#"{"version": "1.0.0", "ssh": false, "domain": "sports", "accounts": []}"#);
        assert_eq!(config.resolve(&account("1234")).unwrap().domain(), "sports");
    }

    #[tokio::test]
    async fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"accounts": [{"account": "1234", "domain": "sports", "service": "api"}]}"#)
            .unwrap();

        let options = SiaConfigFile.load(file.path(), &account("1234")).await.unwrap();
        assert_eq!(options.domain(), "sports");
    }

    #[tokio::test]
    async fn unreadable_or_malformed_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("sia_config");
        assert!(matches!(
            SiaConfigFile.load(&missing, &account("1234")).await,
            Err(OptionsError::Load { .. })
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        assert!(matches!(
            SiaConfigFile.load(file.path(), &account("1234")).await,
            Err(OptionsError::Load { .. })
        ));
    }
}
