//! Student records read from bulk issuance input

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::address::Address;
use crate::error::CredifyError;

/// One row of a batch issuance request.
///
/// Immutable once read into a batch job; the coordinator works on a
/// resolved copy that carries the generated certificate id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub major: String,

    #[serde(default, alias = "issue_date")]
    pub issue_date: String,

    /// Base58 wallet that will own the credential leaf
    #[serde(default)]
    pub wallet: String,

    #[serde(default, skip_serializing_if = "Option::is_none", alias = "certificate_id")]
    pub certificate_id: Option<String>,

    /// Extra attributes appended to the metadata record
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty", alias = "additional_info")]
    pub additional_info: BTreeMap<String, String>,
}

impl StudentRecord {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        major: impl Into<String>,
        issue_date: impl Into<String>,
        wallet: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            major: major.into(),
            issue_date: issue_date.into(),
            wallet: wallet.into(),
            certificate_id: None,
            additional_info: BTreeMap::new(),
        }
    }

    pub fn with_certificate_id(mut self, id: impl Into<String>) -> Self {
        self.certificate_id = Some(id.into());
        self
    }

    /// Key used to attribute results back to this student
    pub fn key(&self) -> String {
        if self.email.trim().is_empty() {
            self.name.trim().to_string()
        } else {
            self.email.trim().to_string()
        }
    }

    /// Check the fields the certificate template cannot do without
    pub fn validate_fields(&self) -> Result<(), CredifyError> {
        if self.name.trim().is_empty() {
            return Err(CredifyError::validation("name required"));
        }
        if self.major.trim().is_empty() {
            return Err(CredifyError::validation("major required"));
        }
        if self.issue_date.trim().is_empty() {
            return Err(CredifyError::validation("issue date required"));
        }
        Ok(())
    }

    /// Parse the owner wallet
    pub fn wallet_address(&self) -> Result<Address, CredifyError> {
        if self.wallet.trim().is_empty() {
            return Err(CredifyError::validation("wallet required"));
        }
        Address::parse(&self.wallet)
            .map_err(|e| CredifyError::validation(format!("wallet {}", e)))
    }

    /// Full validation: template fields, then the wallet
    pub fn validate(&self) -> Result<Address, CredifyError> {
        self.validate_fields()?;
        self.wallet_address()
    }
}
