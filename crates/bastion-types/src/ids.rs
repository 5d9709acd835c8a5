//! Strong typed identifiers used throughout Bastion.
//!
//! Every 32-byte identifier is either a domain-separated BLAKE3 hash of a
//! human-readable name or, for [`Identity`], the raw Ed25519 verifying key.

use serde::{Deserialize, Serialize};

use crate::error::TypesError;

const OPERATION_TYPE_DOMAIN: &[u8] = b"bastion-operation-type-v1:";
const ROLE_DOMAIN: &[u8] = b"bastion-role-v1:";
const SELECTOR_DOMAIN: &[u8] = b"bastion-selector-v1:";

fn domain_hash(domain: &[u8], name: &str) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(domain);
    hasher.update(name.as_bytes());
    *hasher.finalize().as_bytes()
}

fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], TypesError> {
    let trimmed = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(trimmed).map_err(|e| TypesError::InvalidHex(e.to_string()))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| TypesError::InvalidLength {
            expected: N,
            got: bytes.len(),
        })
}

/// An actor known to the engine: requester, signer, relayer, target contract
/// or the engine itself.
///
/// The bytes are the actor's Ed25519 verifying key, so a meta-transaction
/// signature can be checked against the identity directly.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity([u8; 32]);

impl Identity {
    pub const ZERO: Identity = Identity([0u8; 32]);

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, TypesError> {
        decode_fixed::<32>(s).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Short display form (first 8 bytes hex).
    pub fn short_id(&self) -> String {
        hex::encode(&self.0[..8])
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "id:{}", self.short_id())
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Identity({})", self.short_id())
    }
}

/// Stable identifier for a class of sensitive state change.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationTypeId([u8; 32]);

impl OperationTypeId {
    /// Derive the identifier from the operation's canonical name.
    pub fn from_name(name: &str) -> Self {
        Self(domain_hash(OPERATION_TYPE_DOMAIN, name))
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for OperationTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "op:{}", hex::encode(&self.0[..8]))
    }
}

impl std::fmt::Debug for OperationTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OperationTypeId({})", hex::encode(&self.0[..8]))
    }
}

/// Role identifier, derived from the role name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleHash([u8; 32]);

impl RoleHash {
    pub const OWNER_ROLE_NAME: &'static str = "OWNER_ROLE";

    pub fn from_name(name: &str) -> Self {
        Self(domain_hash(ROLE_DOMAIN, name))
    }

    /// The protected single-member role standing in for the owner.
    pub fn owner() -> Self {
        Self::from_name(Self::OWNER_ROLE_NAME)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for RoleHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "role:{}", hex::encode(&self.0[..8]))
    }
}

impl std::fmt::Debug for RoleHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RoleHash({})", hex::encode(&self.0[..8]))
    }
}

/// Four-byte function selector.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Selector([u8; 4]);

impl Selector {
    pub const ZERO: Selector = Selector([0u8; 4]);

    /// Derive a selector from a function signature such as
    /// `updateAddress(address)`.
    pub fn from_signature(signature: &str) -> Self {
        let hash = domain_hash(SELECTOR_DOMAIN, signature);
        Self([hash[0], hash[1], hash[2], hash[3]])
    }

    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, TypesError> {
        decode_fixed::<4>(s).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 4]
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Selector(0x{})", hex::encode(self.0))
    }
}

/// Transaction record identifier. Allocated from 1; `TxId::UNALLOCATED`
/// marks a snapshot of a record that does not exist yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxId(pub u64);

impl TxId {
    pub const UNALLOCATED: TxId = TxId(0);

    pub fn is_allocated(&self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tx:{}", self.0)
    }
}

/// A 32-byte digest produced by the meta-transaction signing scheme.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digest([u8; 32]);

impl Digest {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

impl std::fmt::Debug for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Digest({})", hex::encode(&self.0[..8]))
    }
}
