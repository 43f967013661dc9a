use crate::crypto::{PublicKey, Signature};
use crate::macaroon::{Macaroon, SignaturePair};
use crate::{MacaroonError, Result};
use serde::{Deserialize, Serialize};

/// Default maximum number of caveats accepted from untrusted input
pub const DEFAULT_MAX_CAVEATS: usize = 64;

/// Default maximum id length in bytes
pub const DEFAULT_MAX_ID_LEN: usize = 4096;

/// Default maximum caveat length in bytes
pub const DEFAULT_MAX_CAVEAT_LEN: usize = 4096;

/// Size limits applied when reassembling a macaroon from untrusted input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainLimits {
    /// Most caveats a decoded macaroon may carry
    pub max_caveats: usize,
    /// Longest id accepted, in bytes
    pub max_id_len: usize,
    /// Longest single caveat accepted, in bytes
    pub max_caveat_len: usize,
}

impl Default for ChainLimits {
    fn default() -> Self {
        Self {
            max_caveats: DEFAULT_MAX_CAVEATS,
            max_id_len: DEFAULT_MAX_ID_LEN,
            max_caveat_len: DEFAULT_MAX_CAVEAT_LEN,
        }
    }
}

impl ChainLimits {
    /// Limits that accept any size
    pub fn unbounded() -> Self {
        Self {
            max_caveats: usize::MAX,
            max_id_len: usize::MAX,
            max_caveat_len: usize::MAX,
        }
    }

    /// Sets the maximum caveat count
    pub fn with_max_caveats(mut self, max_caveats: usize) -> Self {
        self.max_caveats = max_caveats;
        self
    }

    /// Sets the maximum id length in bytes
    pub fn with_max_id_len(mut self, max_id_len: usize) -> Self {
        self.max_id_len = max_id_len;
        self
    }

    /// Sets the maximum length of each caveat in bytes
    pub fn with_max_caveat_len(mut self, max_caveat_len: usize) -> Self {
        self.max_caveat_len = max_caveat_len;
        self
    }

    fn check(&self, parts: &MacaroonParts) -> Result<()> {
        if parts.id.len() > self.max_id_len {
            return Err(MacaroonError::InvalidFormat(format!(
                "id is {} bytes, limit is {}",
                parts.id.len(),
                self.max_id_len
            )));
        }
        if parts.caveats.len() > self.max_caveats {
            return Err(MacaroonError::InvalidFormat(format!(
                "{} caveats, limit is {}",
                parts.caveats.len(),
                self.max_caveats
            )));
        }
        if let Some(caveat) = parts
            .caveats
            .iter()
            .find(|c| c.len() > self.max_caveat_len)
        {
            return Err(MacaroonError::InvalidFormat(format!(
                "caveat is {} bytes, limit is {}",
                caveat.len(),
                self.max_caveat_len
            )));
        }
        Ok(())
    }
}

/// The fields of a finalized macaroon, as plain data
///
/// Reassembly checks structure and size limits only. Signatures are checked
/// by [`Macaroon::verify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacaroonParts {
    /// Root identity
    pub id: String,

    /// Caveats in chain order
    #[serde(default)]
    pub caveats: Vec<String>,

    /// One public key per link, root first
    pub verification_keys: Vec<PublicKey>,

    /// One signature pair per link, root first
    pub signatures: Vec<SignaturePair>,

    /// Signature closing the chain
    pub final_signature: Signature,
}

impl MacaroonParts {
    fn check_shape(&self) -> Result<()> {
        let links = self.caveats.len() + 1;
        if self.verification_keys.len() != links {
            return Err(MacaroonError::InvalidFormat(format!(
                "expected {links} verification keys, found {}",
                self.verification_keys.len()
            )));
        }
        if self.signatures.len() != links {
            return Err(MacaroonError::InvalidFormat(format!(
                "expected {links} signature pairs, found {}",
                self.signatures.len()
            )));
        }
        Ok(())
    }
}

impl Macaroon {
    /// Copies a finalized macaroon's fields out as plain data.
    ///
    /// # Errors
    /// `NotFinalized` if the macaroon is still open. Open macaroons hold a
    /// private key and are never exported.
    pub fn to_parts(&self) -> Result<MacaroonParts> {
        let final_signature = *self.final_signature().ok_or(MacaroonError::NotFinalized)?;

        Ok(MacaroonParts {
            id: self.id().to_string(),
            caveats: self.caveats().to_vec(),
            verification_keys: self.verification_keys().to_vec(),
            signatures: self.signatures().to_vec(),
            final_signature,
        })
    }

    /// Reassembles a finalized macaroon using [`ChainLimits::default`]
    ///
    /// # Example
    /// ```
    /// use pkmacaroon::{KeyPair, Macaroon};
    ///
    /// let issuer = KeyPair::generate().unwrap();
    /// let mut original = Macaroon::new(&issuer.private, "user-42").unwrap();
    /// original.add_caveat("scope=read").unwrap();
    /// original.finalize().unwrap();
    ///
    /// let copy = Macaroon::from_parts(original.to_parts().unwrap()).unwrap();
    /// assert_eq!(copy.caveats(), original.caveats());
    /// assert!(copy.verify(&issuer.public).is_ok());
    /// ```
    pub fn from_parts(parts: MacaroonParts) -> Result<Self> {
        Self::from_parts_with_limits(parts, &ChainLimits::default())
    }

    /// Reassembles a finalized macaroon, enforcing `limits`.
    ///
    /// # Errors
    /// `InvalidFormat` if the key or signature count does not match the
    /// caveat count, or any limit is exceeded.
    pub fn from_parts_with_limits(parts: MacaroonParts, limits: &ChainLimits) -> Result<Self> {
        limits.check(&parts)?;
        parts.check_shape()?;

        let MacaroonParts {
            id,
            caveats,
            verification_keys,
            signatures,
            final_signature,
        } = parts;

        Ok(Self::from_closed_chain(
            id,
            caveats,
            verification_keys,
            signatures,
            final_signature,
        ))
    }
}
