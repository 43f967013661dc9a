use crate::{MacaroonError, Result};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand_core::{OsRng, RngCore};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroize;

/// Size of an Ed25519 public key in bytes
pub const PUBLIC_KEY_SIZE: usize = ed25519_dalek::PUBLIC_KEY_LENGTH;

/// Size of an Ed25519 private key seed in bytes
pub const PRIVATE_KEY_SIZE: usize = ed25519_dalek::SECRET_KEY_LENGTH;

/// Size of an Ed25519 signature in bytes
pub const SIGNATURE_SIZE: usize = ed25519_dalek::SIGNATURE_LENGTH;

/// Discriminant prefixed to every signed id or caveat payload.
///
/// An id and a caveat with the same text never produce the same signed
/// message, so caveat text needs no restrictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    /// The macaroon's root identity
    Id = 0,
    /// A caveat appended to the chain
    Caveat = 1,
}

impl Tag {
    /// Returns `text` prefixed with this tag's discriminant byte
    pub fn payload(self, text: &str) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(text.len() + 1);
        bytes.push(self as u8);
        bytes.extend_from_slice(text.as_bytes());
        bytes
    }
}

/// An Ed25519 public key
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_SIZE]);

impl PublicKey {
    /// Wraps raw public key bytes.
    ///
    /// No curve-point validation happens here; an invalid point simply never
    /// verifies anything.
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the raw key bytes
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.0
    }

    /// Checks `signature` over `message` against this key.
    ///
    /// Returns false for malformed keys, mismatched keys and tampered
    /// messages alike. Uses strict verification so that small-order keys
    /// and malleable signatures are rejected.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        let signature = ed25519_dalek::Signature::from_bytes(&signature.0);
        key.verify_strict(message, &signature).is_ok()
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = MacaroonError;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; PUBLIC_KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| MacaroonError::InvalidKeyLength)?;
        Ok(Self(bytes))
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// An Ed25519 signature
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; SIGNATURE_SIZE]);

impl Signature {
    /// Wraps raw signature bytes
    pub fn from_bytes(bytes: [u8; SIGNATURE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the raw signature bytes
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Signature {
    type Error = MacaroonError;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; SIGNATURE_SIZE] = bytes
            .try_into()
            .map_err(|_| MacaroonError::InvalidFormat("signature must be 64 bytes".to_string()))?;
        Ok(Self(bytes))
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// An Ed25519 private key.
///
/// Not `Clone` and not serializable. The key material is zeroized when the
/// value is dropped.
pub struct PrivateKey(SigningKey);

impl PrivateKey {
    /// Builds a private key from its 32-byte seed
    pub fn from_seed(seed: &[u8; PRIVATE_KEY_SIZE]) -> Self {
        Self(SigningKey::from_bytes(seed))
    }

    /// Returns the public key paired with this private key
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key().to_bytes())
    }

    /// Signs `message`. Deterministic for a given key and message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.0.sign(message).to_bytes())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// A freshly generated public/private key pair
#[derive(Debug)]
pub struct KeyPair {
    /// The private half; keep it secret
    pub private: PrivateKey,
    /// The public half; safe to distribute
    pub public: PublicKey,
}

impl KeyPair {
    /// Generates a new key pair from the operating system's entropy source.
    ///
    /// # Errors
    /// `KeyGenerationFailed` if the entropy source cannot be read.
    pub fn generate() -> Result<Self> {
        Self::generate_with(&mut OsRng)
    }

    pub(crate) fn generate_with<R: RngCore + ?Sized>(rng: &mut R) -> Result<Self> {
        let mut seed = [0u8; PRIVATE_KEY_SIZE];
        rng.try_fill_bytes(&mut seed)
            .map_err(|e| MacaroonError::KeyGenerationFailed(e.to_string()))?;
        let private = PrivateKey::from_seed(&seed);
        seed.zeroize();

        let public = private.public_key();
        Ok(Self { private, public })
    }
}

fn fmt_hex(bytes: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&hex::encode(bytes))
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PublicKey(")?;
        fmt_hex(&self.0, f)?;
        f.write_str(")")
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_hex(&self.0, f)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Signature(")?;
        fmt_hex(&self.0, f)?;
        f.write_str(")")
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_hex(&self.0, f)
    }
}

// Hex strings in human-readable formats (JSON), raw bytes otherwise
// (MessagePack). serde has no built-in impls for 64-byte arrays.

fn serialize_fixed<S: Serializer>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    if serializer.is_human_readable() {
        serializer.serialize_str(&hex::encode(bytes))
    } else {
        serializer.serialize_bytes(bytes)
    }
}

struct FixedBytesVisitor<const N: usize>;

impl<'de, const N: usize> Visitor<'de> for FixedBytesVisitor<N> {
    type Value = [u8; N];

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{N} bytes or a hex string of {N} bytes")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
        let bytes = hex::decode(v).map_err(E::custom)?;
        self.visit_bytes(&bytes)
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> std::result::Result<Self::Value, E> {
        v.try_into()
            .map_err(|_| E::invalid_length(v.len(), &self))
    }

    fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error> {
        let mut out = [0u8; N];
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = seq
                .next_element()?
                .ok_or_else(|| <A::Error as de::Error>::invalid_length(i, &self))?;
        }
        if seq.next_element::<u8>()?.is_some() {
            return Err(de::Error::invalid_length(N + 1, &self));
        }
        Ok(out)
    }
}

fn deserialize_fixed<'de, D: Deserializer<'de>, const N: usize>(
    deserializer: D,
) -> std::result::Result<[u8; N], D::Error> {
    if deserializer.is_human_readable() {
        deserializer.deserialize_str(FixedBytesVisitor::<N>)
    } else {
        deserializer.deserialize_bytes(FixedBytesVisitor::<N>)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_fixed(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserialize_fixed::<D, PUBLIC_KEY_SIZE>(deserializer).map(Self)
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_fixed(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserialize_fixed::<D, SIGNATURE_SIZE>(deserializer).map(Self)
    }
}

#[cfg(test)]
pub(crate) struct FailingRng;

#[cfg(test)]
impl RngCore for FailingRng {
    fn next_u32(&mut self) -> u32 {
        panic!("entropy source unavailable")
    }

    fn next_u64(&mut self) -> u64 {
        panic!("entropy source unavailable")
    }

    fn fill_bytes(&mut self, _dest: &mut [u8]) {
        panic!("entropy source unavailable")
    }

    fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> std::result::Result<(), rand_core::Error> {
        let code = std::num::NonZeroU32::new(rand_core::Error::CUSTOM_START).unwrap();
        Err(rand_core::Error::from(code))
    }
}
