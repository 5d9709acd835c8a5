use bastion_types::Digest;

/// Canonical, domain-separated byte encoder feeding a BLAKE3 hasher.
///
/// Fixed-width integers are little-endian. Variable-length fields carry a
/// `u64` length prefix so adjacent fields can never be re-split into a
/// different, colliding encoding.
pub struct CanonicalHasher {
    hasher: blake3::Hasher,
}

impl CanonicalHasher {
    /// Start an encoding under a versioned domain tag such as
    /// `bastion-metatx-v1`.
    pub fn new(domain: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(domain.len() as u64).to_le_bytes());
        hasher.update(domain.as_bytes());
        Self { hasher }
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.hasher.update(&[v]);
        self
    }

    pub fn u64(&mut self, v: u64) -> &mut Self {
        self.hasher.update(&v.to_le_bytes());
        self
    }

    pub fn u128(&mut self, v: u128) -> &mut Self {
        self.hasher.update(&v.to_le_bytes());
        self
    }

    /// Fixed-size field; the width is implied by the field position.
    pub fn fixed(&mut self, bytes: &[u8]) -> &mut Self {
        self.hasher.update(bytes);
        self
    }

    /// Variable-length field, length-prefixed.
    pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.hasher.update(&(bytes.len() as u64).to_le_bytes());
        self.hasher.update(bytes);
        self
    }

    /// Optional field: a presence byte followed by the value when present.
    pub fn optional<T>(
        &mut self,
        value: Option<&T>,
        encode: impl FnOnce(&mut Self, &T),
    ) -> &mut Self {
        match value {
            Some(v) => {
                self.u8(1);
                encode(self, v);
            }
            None => {
                self.u8(0);
            }
        }
        self
    }

    pub fn finish(&self) -> Digest {
        Digest::from_bytes(*self.hasher.finalize().as_bytes())
    }
}
