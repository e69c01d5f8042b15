//! Amazon Resource Name parsing.
use crate::{
    error::{generic_error, GenericError},
    model::AccountId,
};

/// The components of an ARN.
///
/// ARNs have the form `arn:partition:service:region:account-id:resource`, where the resource itself may contain
/// colons.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ArnParts<'a> {
    partition: &'a str,
    service: &'a str,
    region: &'a str,
    account: &'a str,
    resource: &'a str,
}

impl<'a> ArnParts<'a> {
    /// Parses the given ARN.
    ///
    /// # Errors
    ///
    /// If the value is not a well-formed ARN, or its account component is not a run of ASCII digits, an error is
    /// returned.
    pub fn parse(arn: &'a str) -> Result<Self, GenericError> {
        let mut parts = arn.trim().splitn(6, ':');
        let (Some("arn"), Some(partition), Some(service), Some(region), Some(account), Some(resource)) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(generic_error!("'{}' is not a well-formed ARN.", arn));
        };

        if partition.is_empty() || service.is_empty() || resource.is_empty() {
            return Err(generic_error!("'{}' is not a well-formed ARN.", arn));
        }

        if account.is_empty() || !account.bytes().all(|b| b.is_ascii_digit()) {
            return Err(generic_error!("ARN '{}' does not carry an account identifier.", arn));
        }

        Ok(Self {
            partition,
            service,
            region,
            account,
            resource,
        })
    }

    /// Returns the partition (`aws`, `aws-cn`, ...).
    pub const fn partition(&self) -> &'a str {
        self.partition
    }

    /// Returns the service namespace (`iam`, `sts`, `ecs`, ...).
    pub const fn service(&self) -> &'a str {
        self.service
    }

    /// Returns the region, which is empty for global services.
    pub const fn region(&self) -> &'a str {
        self.region
    }

    /// Returns the resource path.
    pub const fn resource(&self) -> &'a str {
        self.resource
    }

    /// Returns the account identifier.
    pub fn account_id(&self) -> Result<AccountId, GenericError> {
        AccountId::new(self.account)
    }
}
