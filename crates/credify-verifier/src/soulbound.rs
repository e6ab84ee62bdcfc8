//! Soulbound policy check

use credify_core::{CredentialAsset, CredifyError};
use credify_crypto::ProgramAuthority;

/// Decides whether a credential is still bound to its owner.
///
/// A credential is soulbound when its transfer delegate is the program
/// authority. The authority is derived once at construction.
#[derive(Debug, Clone, Copy)]
pub struct SoulboundPolicyChecker {
    authority: ProgramAuthority,
}

impl SoulboundPolicyChecker {
    pub fn new(authority: ProgramAuthority) -> Self {
        Self { authority }
    }

    pub fn for_program(program_id: &str) -> Result<Self, CredifyError> {
        Ok(Self::new(ProgramAuthority::for_program(program_id)?))
    }

    pub fn authority(&self) -> &ProgramAuthority {
        &self.authority
    }

    /// An asset without a delegate is never soulbound
    pub fn is_soulbound(&self, asset: &CredentialAsset) -> bool {
        self.authority
            .is_delegate(asset.ownership.delegate.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credify_core::Ownership;

    fn asset(delegate: Option<String>) -> CredentialAsset {
        CredentialAsset {
            id: "asset-X".into(),
            content: Default::default(),
            grouping: vec![],
            ownership: Ownership {
                owner: "Owner1".into(),
                delegate,
                delegated: true,
                frozen: false,
            },
            compression: None,
        }
    }

    fn checker() -> SoulboundPolicyChecker {
        SoulboundPolicyChecker::for_program(credify_crypto::DEFAULT_PROGRAM_ID).unwrap()
    }

    #[test]
    fn test_authority_delegate_is_soulbound() {
        let checker = checker();
        let delegate = checker.authority().address.to_base58();
        assert!(checker.is_soulbound(&asset(Some(delegate))));
    }

    #[test]
    fn test_absent_delegate_is_not_soulbound() {
        assert!(!checker().is_soulbound(&asset(None)));
    }

    #[test]
    fn test_other_delegate_is_not_soulbound() {
        let other = credify_core::Address::new([3u8; 32]).to_base58();
        assert!(!checker().is_soulbound(&asset(Some(other))));
        assert!(!checker().is_soulbound(&asset(Some("garbage".into()))));
    }
}
