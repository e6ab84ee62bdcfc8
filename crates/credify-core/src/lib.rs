//! Credify Core
//!
//! Core domain types for Credify academic credentials.
//! This crate defines the data model, the error taxonomy and the
//! collaborator traits shared by issuance and verification.

pub mod address;
pub mod asset;
pub mod error;
pub mod issuance;
pub mod metadata;
pub mod student;
pub mod traits;

pub use address::{Address, AddressError, ADDRESS_LEN};
pub use asset::{AssetProof, CredentialAsset, Grouping, Ownership};
pub use error::{CredifyError, ErrorClass};
pub use issuance::{
    BatchOutcome, IssuanceResult, IssuanceStage, IssuanceStatus, MintReceipt, MintRequest,
    UploadTags,
};
pub use metadata::{Attribute, MetadataFile, MetadataProperties, MetadataRecord};
pub use student::StudentRecord;
pub use traits::{AssetQuery, ChainMintAdapter, ContentStore};
