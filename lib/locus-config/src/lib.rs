//! Layered configuration for Locus.
//!
//! Configuration is assembled from a number of sources (YAML files, prefixed environment variables, static values)
//! where sources added later take precedence over sources added earlier. The merged result is exposed as a
//! [`GenericConfiguration`], which can be queried by key and deserialized into typed values.
#![deny(warnings)]
#![deny(missing_docs)]

use std::{borrow::Cow, collections::HashSet, sync::Arc};

use figment::{
    error::Kind,
    providers::Env,
    value::{Dict, Value},
    Figment, Provider as _,
};
use serde::Deserialize;
use snafu::{ResultExt as _, Snafu};

mod provider;
use self::provider::ResolvedProvider;

/// A configuration error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum ConfigurationError {
    /// Environment variable prefix was empty.
    #[snafu(display("Environment variable prefix must not be empty."))]
    EmptyPrefix,

    /// Requested field was missing from the configuration.
    #[snafu(display("Missing field '{}' in configuration. {}", field, help_text))]
    MissingField {
        /// Help text describing how to set the missing field.
        help_text: String,

        /// Name of the missing field.
        field: Cow<'static, str>,
    },

    /// Requested field's data type was not the expected data type.
    #[snafu(display(
        "Expected value for field '{}' to be '{}', got '{}' instead.",
        field,
        expected_ty,
        actual_ty
    ))]
    InvalidFieldType {
        /// Name of the invalid field.
        ///
        /// This is a period-separated path to the field.
        field: String,

        /// Expected data type.
        expected_ty: String,

        /// Actual data type.
        actual_ty: String,
    },

    /// Generic configuration error.
    #[snafu(display("Failed to query configuration."))]
    Generic {
        /// Error source.
        source: anyhow::Error,
    },
}

impl From<figment::Error> for ConfigurationError {
    fn from(e: figment::Error) -> Self {
        match e.kind {
            Kind::InvalidType(actual_ty, expected_ty) => Self::InvalidFieldType {
                field: e.path.join("."),
                expected_ty,
                actual_ty: actual_ty.to_string(),
            },
            _ => Self::Generic { source: e.into() },
        }
    }
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
struct EnvironmentLookup {
    prefix: String,
}

impl EnvironmentLookup {
    // The prefix is already uppercased and carries its trailing underscore.
    fn transform_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.replace('.', "_").to_uppercase())
    }
}

/// A configuration loader that can pull from various sources.
///
/// Sources are merged in the order they are added, with later sources overriding earlier ones.
///
/// # Supported sources
///
/// - YAML file
/// - environment variables (must be prefixed; see [`from_environment`][Self::from_environment])
/// - static values (see [`from_values`][Self::from_values])
#[derive(Default)]
pub struct ConfigurationLoader {
    environment_lookups: HashSet<EnvironmentLookup>,
    providers: Vec<ResolvedProvider>,
}

impl ConfigurationLoader {
    /// Loads the given YAML configuration file.
    ///
    /// # Errors
    ///
    /// If the file could not be read, or if the file is not valid YAML, an error will be returned.
    pub fn from_yaml<P>(mut self, path: P) -> Result<Self, ConfigurationError>
    where
        P: AsRef<std::path::Path>,
    {
        let provider = ResolvedProvider::from_yaml(&path).map_err(anyhow::Error::from).context(Generic)?;
        self.providers.push(provider);
        Ok(self)
    }

    /// Attempts to load the given YAML configuration file, ignoring any errors.
    ///
    /// Errors include the file not existing, not being readable/accessible, and not being valid YAML.
    pub fn try_from_yaml<P>(mut self, path: P) -> Self
    where
        P: AsRef<std::path::Path>,
    {
        match ResolvedProvider::from_yaml(&path) {
            Ok(provider) => self.providers.push(provider),
            Err(e) => {
                tracing::debug!(error = %e, file_path = %path.as_ref().display(), "Unable to read YAML configuration file. Ignoring.");
            }
        }
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// The prefix given will have an underscore appended to it if it does not already end with one. For example, with a
    /// prefix of `locus`, any environment variable starting with `LOCUS_` would be matched.
    ///
    /// # Errors
    ///
    /// If the prefix is empty, an error will be returned.
    pub fn from_environment(mut self, prefix: &'static str) -> Result<Self, ConfigurationError> {
        if prefix.is_empty() {
            return Err(ConfigurationError::EmptyPrefix);
        }

        let prefix = if prefix.ends_with('_') {
            prefix.to_uppercase()
        } else {
            format!("{}_", prefix.to_uppercase())
        };

        // `Env` reads the process environment lazily, so snapshot it now to keep the merged configuration stable.
        let values = Env::prefixed(&prefix).data()?;
        if let Some(dict) = values.get(&figment::Profile::Default) {
            let mut dict = dict.clone();
            preserve_zero_padded_values(&prefix, &mut dict);
            self.providers
                .push(ResolvedProvider::from_dict(dict, "environment variables"));
            self.environment_lookups.insert(EnvironmentLookup { prefix });
        }
        Ok(self)
    }

    /// Loads configuration from static values.
    ///
    /// The value is expected to be a JSON object, whose keys become top-level configuration keys.
    ///
    /// # Errors
    ///
    /// If the value is not an object, an error will be returned.
    pub fn from_values(mut self, values: serde_json::Value) -> Result<Self, ConfigurationError> {
        let provider = ResolvedProvider::from_values(values)?;
        self.providers.push(provider);
        Ok(self)
    }

    /// Consumes the configuration loader and wraps it in a generic wrapper.
    pub fn into_generic(self) -> GenericConfiguration {
        let figment = self
            .providers
            .into_iter()
            .fold(Figment::new(), |figment, provider| figment.admerge(provider));

        GenericConfiguration {
            inner: Arc::new(Inner {
                figment,
                environment_lookups: self.environment_lookups,
            }),
        }
    }
}

/// Restores zero-padded digit strings that `Env` would otherwise parse as integers.
///
/// Identifiers such as `012345678901` are opaque text: reading them as numbers drops the leading zeros.
fn preserve_zero_padded_values(prefix: &str, dict: &mut Dict) {
    for (name, raw) in std::env::vars_os() {
        let (Ok(name), Ok(raw)) = (name.into_string(), raw.into_string()) else {
            continue;
        };
        let Some(key) = name.strip_prefix(prefix) else {
            continue;
        };

        let raw = raw.trim();
        if raw.len() > 1 && raw.starts_with('0') && raw.bytes().all(|b| b.is_ascii_digit()) {
            dict.insert(key.to_lowercase(), Value::from(raw.to_string()));
        }
    }
}

#[derive(Debug)]
struct Inner {
    figment: Figment,
    environment_lookups: HashSet<EnvironmentLookup>,
}

/// A generic configuration object.
///
/// This represents the merged configuration derived from [`ConfigurationLoader`] in its raw form. Values can be queried
/// by key, and can be extracted either as typed values or in their raw form.
///
/// Keys must be in the form of `a.b.c`, where periods (`.`) are used to indicate a nested value.
#[derive(Clone, Debug)]
pub struct GenericConfiguration {
    inner: Arc<Inner>,
}

impl GenericConfiguration {
    fn get<'a, T>(&self, key: &str) -> Result<T, ConfigurationError>
    where
        T: Deserialize<'a>,
    {
        match self.inner.figment.extract_inner(key) {
            Ok(value) => Ok(value),
            Err(e) if matches!(e.kind, Kind::MissingField(_)) => {
                // Environment variables never carry nesting, so `discovery.fetch_timeout_ms` is only ever present as
                // `discovery_fetch_timeout_ms` when it came from `LOCUS_DISCOVERY_FETCH_TIMEOUT_MS`.
                let fallback_key = key.replace('.', "_");
                self.inner
                    .figment
                    .extract_inner(&fallback_key)
                    .map_err(|fallback_e| self.lookup_error(key, fallback_e))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn lookup_error(&self, key: &str, e: figment::Error) -> ConfigurationError {
        match e.kind {
            Kind::MissingField(_) => {
                let mut valid_keys = self
                    .inner
                    .environment_lookups
                    .iter()
                    .map(|lookup| lookup.transform_key(key))
                    .collect::<Vec<_>>();
                valid_keys.insert(0, key.to_string());

                ConfigurationError::MissingField {
                    help_text: format!("Try setting `{}`.", valid_keys.join("` or `")),
                    field: Cow::Owned(key.to_string()),
                }
            }
            _ => e.into(),
        }
    }

    /// Gets a configuration value by key.
    ///
    /// ## Errors
    ///
    /// If the key does not exist in the configuration, or if the value could not be deserialized into `T`, an error
    /// variant will be returned.
    pub fn get_typed<'a, T>(&self, key: &str) -> Result<T, ConfigurationError>
    where
        T: Deserialize<'a>,
    {
        self.get(key)
    }

    /// Gets a configuration value by key, or the default value if a key does not exist or could not be deserialized.
    ///
    /// This swallows deserialization errors and should be used sparingly.
    pub fn get_typed_or_default<'a, T>(&self, key: &str) -> T
    where
        T: Default + Deserialize<'a>,
    {
        self.get(key).unwrap_or_default()
    }

    /// Gets a configuration value by key, if it exists.
    ///
    /// ## Errors
    ///
    /// If the key exists but the value could not be deserialized into `T`, an error will be returned.
    pub fn try_get_typed<'a, T>(&self, key: &str) -> Result<Option<T>, ConfigurationError>
    where
        T: Deserialize<'a>,
    {
        match self.get(key) {
            Ok(value) => Ok(Some(value)),
            Err(ConfigurationError::MissingField { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Attempts to deserialize the entire configuration as `T`.
    ///
    /// ## Errors
    ///
    /// If the value could not be deserialized into `T`, an error will be returned.
    pub fn as_typed<'a, T>(&self) -> Result<T, ConfigurationError>
    where
        T: Deserialize<'a>,
    {
        self.inner.figment.extract().map_err(Into::into)
    }
}
