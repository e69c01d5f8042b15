use std::io::Write as _;

use async_trait::async_trait;
use tempfile::NamedTempFile;

use crate::{
    credentials::{CallerIdentity, CredentialError, CredentialProvider},
    error::generic_error,
    model::AccountId,
};

/// A credential provider that always gives the same answer.
pub enum StaticCredentials {
    Account(AccountId),
    Unavailable,
    Malformed,
}

impl StaticCredentials {
    pub fn account(id: &str) -> Self {
        Self::Account(AccountId::new(id).unwrap())
    }

    pub fn unavailable() -> Self {
        Self::Unavailable
    }

    pub fn malformed() -> Self {
        Self::Malformed
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn caller_identity(&self) -> Result<CallerIdentity, CredentialError> {
        match self {
            Self::Account(account) => Ok(CallerIdentity::new(account.clone())),
            Self::Unavailable => Err(CredentialError::Unavailable {
                provider: self.name(),
                source: generic_error!("connection refused"),
            }),
            Self::Malformed => Err(CredentialError::Malformed {
                provider: self.name(),
                source: generic_error!("identity carries no account"),
            }),
        }
    }
}

/// Writes an identity agent configuration to a temporary file.
pub fn write_sia_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}
