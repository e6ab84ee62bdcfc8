//! Program-derived addresses
//!
//! A derived address is a SHA-256 digest of the seeds, a bump byte, the
//! program id and a fixed marker, accepted only when it does not decode to
//! a point on the ed25519 curve. Nobody holds a private key for it, so only
//! the program can sign on its behalf. The credential delegate must be the
//! address derived from [`AUTHORITY_SEED`].

use credify_core::{Address, CredifyError};
use curve25519_dalek::edwards::CompressedEdwardsY;
use thiserror::Error;

use crate::hash::sha256_multi;

/// Seed of the program authority account
pub const AUTHORITY_SEED: &[u8] = b"authority";

/// Default program id (the system program)
pub const DEFAULT_PROGRAM_ID: &str = "11111111111111111111111111111111";

pub const MAX_SEEDS: usize = 16;
pub const MAX_SEED_LEN: usize = 32;

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DerivationError {
    #[error("too many seeds: {0}, max 16")]
    TooManySeeds(usize),

    #[error("seed {index} is {len} bytes, max 32")]
    SeedTooLong { index: usize, len: usize },

    #[error("derived address lies on the curve")]
    OnCurve,

    #[error("no off-curve bump found")]
    NoViableBump,
}

impl From<DerivationError> for CredifyError {
    fn from(err: DerivationError) -> Self {
        CredifyError::Config(format!("address derivation failed: {}", err))
    }
}

/// Whether 32 bytes decode to a valid ed25519 point
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    CompressedEdwardsY(*bytes).decompress().is_some()
}

/// Derive an address from seeds that already include the bump byte
pub fn create_program_address(
    seeds: &[&[u8]],
    program_id: &Address,
) -> Result<Address, DerivationError> {
    if seeds.len() > MAX_SEEDS {
        return Err(DerivationError::TooManySeeds(seeds.len()));
    }
    if let Some((index, seed)) = seeds.iter().enumerate().find(|(_, s)| s.len() > MAX_SEED_LEN) {
        return Err(DerivationError::SeedTooLong {
            index,
            len: seed.len(),
        });
    }

    let mut parts: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 2);
    parts.extend_from_slice(seeds);
    parts.push(program_id.as_bytes());
    parts.push(PDA_MARKER);

    let digest = sha256_multi(&parts);
    if is_on_curve(&digest) {
        return Err(DerivationError::OnCurve);
    }
    Ok(Address::new(digest))
}

/// Search bumps from 255 down and return the first off-curve address
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Address,
) -> Result<(Address, u8), DerivationError> {
    if seeds.len() + 1 > MAX_SEEDS {
        return Err(DerivationError::TooManySeeds(seeds.len() + 1));
    }

    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut with_bump: Vec<&[u8]> = seeds.to_vec();
        with_bump.push(&bump_seed);

        match create_program_address(&with_bump, program_id) {
            Ok(address) => return Ok((address, bump)),
            Err(DerivationError::OnCurve) => continue,
            Err(e) => return Err(e),
        }
    }

    Err(DerivationError::NoViableBump)
}

/// The program authority that every credential must name as delegate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramAuthority {
    pub program_id: Address,
    pub address: Address,
    pub bump: u8,
}

impl ProgramAuthority {
    pub fn derive(program_id: Address) -> Result<Self, DerivationError> {
        let (address, bump) = find_program_address(&[AUTHORITY_SEED], &program_id)?;
        Ok(Self {
            program_id,
            address,
            bump,
        })
    }

    /// Authority for a base58 program id
    pub fn for_program(program_id: &str) -> Result<Self, CredifyError> {
        let program_id = Address::parse(program_id)?;
        Ok(Self::derive(program_id)?)
    }

    /// Whether `delegate` is this authority. An absent delegate never is.
    pub fn is_delegate(&self, delegate: Option<&str>) -> bool {
        delegate
            .and_then(|d| Address::parse(d).ok())
            .map(|d| d == self.address)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curve25519_dalek::constants::ED25519_BASEPOINT_COMPRESSED;

    fn default_program() -> Address {
        Address::parse(DEFAULT_PROGRAM_ID).unwrap()
    }

    #[test]
    fn test_basepoint_is_on_curve() {
        assert!(is_on_curve(ED25519_BASEPOINT_COMPRESSED.as_bytes()));
    }

    #[test]
    fn test_derived_address_is_off_curve() {
        let authority = ProgramAuthority::derive(default_program()).unwrap();
        assert!(!is_on_curve(authority.address.as_bytes()));
    }

    #[test]
    fn test_system_program_authority_vector() {
        let authority = ProgramAuthority::for_program("11111111111111111111111111111111").unwrap();
        assert_eq!(
            authority.address.to_base58(),
            "4nHcWcPuJQcuyFeXw17WXDz7NUdtLKoxrjV2AXmK6X5m"
        );
        assert_eq!(authority.bump, 255);
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let a = ProgramAuthority::derive(default_program()).unwrap();
        let b = ProgramAuthority::for_program(DEFAULT_PROGRAM_ID).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_bump_reproduces_address() {
        let program = default_program();
        let (address, bump) = find_program_address(&[AUTHORITY_SEED], &program).unwrap();
        let recreated = create_program_address(&[AUTHORITY_SEED, &[bump][..]], &program).unwrap();
        assert_eq!(address, recreated);
    }

    #[test]
    fn test_program_id_changes_address() {
        let a = ProgramAuthority::derive(default_program()).unwrap();
        let b = ProgramAuthority::derive(Address::new([7u8; 32])).unwrap();
        assert_ne!(a.address, b.address);
    }

    #[test]
    fn test_long_seed_rejected() {
        let long = [0u8; 33];
        let err = find_program_address(&[&long[..]], &default_program()).unwrap_err();
        assert_eq!(err, DerivationError::SeedTooLong { index: 0, len: 33 });
    }

    #[test]
    fn test_is_delegate() {
        let authority = ProgramAuthority::derive(default_program()).unwrap();
        let own = authority.address.to_base58();
        assert!(authority.is_delegate(Some(&own)));
        assert!(!authority.is_delegate(Some(DEFAULT_PROGRAM_ID)));
        assert!(!authority.is_delegate(Some("not-an-address")));
        assert!(!authority.is_delegate(None));
    }
}
