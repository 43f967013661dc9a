use crate::crypto::{KeyPair, PrivateKey, PublicKey, Signature, Tag};
use crate::satisfier::Satisfier;
use crate::{MacaroonError, Result};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The two signatures attached to each link of the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignaturePair {
    /// Signature over this link's public key, made by the previous link's
    /// private key (the issuer's key for the root link)
    pub key_signature: Signature,

    /// Signature by this link's private key over its tagged id (root link)
    /// or tagged caveat
    pub content_signature: Signature,
}

/// Exactly one of the extension key and the final signature exists
#[derive(Debug)]
enum Phase {
    /// Still extensible; holds the key that may add the next caveat or close the chain
    Open(PrivateKey),
    /// Closed by the final signature over the tagged id
    Closed(Signature),
}

/// A public-key macaroon.
///
/// Built with [`Macaroon::new`], restricted with [`Macaroon::add_caveat`],
/// closed with [`Macaroon::finalize`], and checked by anyone holding the
/// issuer's public key with [`Macaroon::verify`].
///
/// An open macaroon holds a private key and must have a single owner while
/// it is being extended. A finalized macaroon is immutable and can be
/// verified concurrently.
#[derive(Debug)]
pub struct Macaroon {
    id: String,
    caveats: Vec<String>,
    /// Always `caveats.len() + 1` entries
    verification_keys: Vec<PublicKey>,
    /// Same length as `verification_keys`
    signatures: Vec<SignaturePair>,
    phase: Phase,
}

impl Macaroon {
    /// Mints a new, open macaroon.
    ///
    /// # Arguments
    /// * `issuer_key` - The issuer's long-lived private key
    /// * `id` - The macaroon's root identity
    ///
    /// # Errors
    /// `KeyGenerationFailed` if no fresh key pair could be generated.
    ///
    /// # Example
    /// ```
    /// use pkmacaroon::{KeyPair, Macaroon};
    ///
    /// let issuer = KeyPair::generate().unwrap();
    /// let macaroon = Macaroon::new(&issuer.private, "user-42").unwrap();
    /// assert!(!macaroon.is_finalized());
    /// ```
    pub fn new(issuer_key: &PrivateKey, id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let link = KeyPair::generate_with(&mut OsRng)?;

        let signature = SignaturePair {
            key_signature: issuer_key.sign(link.public.as_bytes()),
            content_signature: link.private.sign(&Tag::Id.payload(&id)),
        };

        debug!(id_len = id.len(), "minted macaroon");

        Ok(Self {
            id,
            caveats: Vec::new(),
            verification_keys: vec![link.public],
            signatures: vec![signature],
            phase: Phase::Open(link.private),
        })
    }

    /// Appends a caveat, extending the chain by one link.
    ///
    /// The current extension key vouches for a freshly generated key, which
    /// signs the caveat and becomes the new extension key.
    ///
    /// # Errors
    /// * `InvalidState` if the macaroon is already finalized
    /// * `KeyGenerationFailed` if no fresh key pair could be generated; the
    ///   macaroon is left unchanged
    ///
    /// # Example
    /// ```
    /// use pkmacaroon::{KeyPair, Macaroon};
    ///
    /// let issuer = KeyPair::generate().unwrap();
    /// let mut macaroon = Macaroon::new(&issuer.private, "user-42").unwrap();
    /// macaroon.add_caveat("expires=2099").unwrap();
    /// macaroon.add_caveat("scope=read").unwrap();
    /// assert_eq!(macaroon.caveats(), ["expires=2099", "scope=read"]);
    /// ```
    pub fn add_caveat(&mut self, caveat: impl Into<String>) -> Result<()> {
        self.add_caveat_with(caveat, &mut OsRng)
    }

    pub(crate) fn add_caveat_with<R: RngCore + ?Sized>(
        &mut self,
        caveat: impl Into<String>,
        rng: &mut R,
    ) -> Result<()> {
        let Phase::Open(extension_key) = &self.phase else {
            return Err(MacaroonError::InvalidState(
                "cannot add a caveat to a finalized macaroon",
            ));
        };

        let caveat = caveat.into();
        let link = KeyPair::generate_with(rng)?;

        let signature = SignaturePair {
            key_signature: extension_key.sign(link.public.as_bytes()),
            content_signature: link.private.sign(&Tag::Caveat.payload(&caveat)),
        };

        self.verification_keys.push(link.public);
        self.caveats.push(caveat);
        self.signatures.push(signature);
        self.phase = Phase::Open(link.private);

        debug!(id_len = self.id.len(), caveats = self.caveats.len(), "added caveat");
        Ok(())
    }

    /// Closes the chain so no further caveat can be added.
    ///
    /// The extension key signs the tagged id one last time and is then
    /// dropped, which zeroizes it.
    ///
    /// # Errors
    /// `InvalidState` if the macaroon is already finalized.
    pub fn finalize(&mut self) -> Result<()> {
        if self.close() {
            Ok(())
        } else {
            Err(MacaroonError::InvalidState(
                "macaroon is already finalized",
            ))
        }
    }

    pub(crate) fn into_finalized(mut self) -> Self {
        self.close();
        self
    }

    fn close(&mut self) -> bool {
        let Phase::Open(extension_key) = &self.phase else {
            return false;
        };

        let final_signature = extension_key.sign(&Tag::Id.payload(&self.id));
        self.phase = Phase::Closed(final_signature);

        debug!(id_len = self.id.len(), caveats = self.caveats.len(), "finalized macaroon");
        true
    }

    /// Checks the whole signature chain against the issuer's public key.
    ///
    /// Only chain integrity is checked; caveat conditions are not evaluated.
    /// Use [`Macaroon::authorize`] for that.
    ///
    /// # Errors
    /// * `NotFinalized` if the macaroon is still open
    /// * `BadSignature` if any link fails, whichever one it is
    ///
    /// # Example
    /// ```
    /// use pkmacaroon::{KeyPair, Macaroon, MacaroonError};
    ///
    /// let issuer = KeyPair::generate().unwrap();
    /// let mut macaroon = Macaroon::new(&issuer.private, "user-42").unwrap();
    /// assert_eq!(macaroon.verify(&issuer.public), Err(MacaroonError::NotFinalized));
    ///
    /// macaroon.finalize().unwrap();
    /// assert!(macaroon.verify(&issuer.public).is_ok());
    /// ```
    pub fn verify(&self, issuer_key: &PublicKey) -> Result<()> {
        let Phase::Closed(final_signature) = &self.phase else {
            return Err(MacaroonError::NotFinalized);
        };

        if self.chain_is_intact(issuer_key, final_signature) {
            Ok(())
        } else {
            debug!(
                id_len = self.id.len(),
                caveats = self.caveats.len(),
                "macaroon signature chain rejected"
            );
            Err(MacaroonError::BadSignature)
        }
    }

    fn chain_is_intact(&self, issuer_key: &PublicKey, final_signature: &Signature) -> bool {
        if self.verification_keys.len() != self.caveats.len() + 1
            || self.signatures.len() != self.verification_keys.len()
        {
            return false;
        }

        let contents = std::iter::once(Tag::Id.payload(&self.id))
            .chain(self.caveats.iter().map(|c| Tag::Caveat.payload(c)));

        // Each link's key is vouched for by its parent, then signs its content
        let mut parent = issuer_key;
        for ((key, pair), content) in self
            .verification_keys
            .iter()
            .zip(&self.signatures)
            .zip(contents)
        {
            if !parent.verify(key.as_bytes(), &pair.key_signature)
                || !key.verify(&content, &pair.content_signature)
            {
                return false;
            }
            parent = key;
        }

        parent.verify(&Tag::Id.payload(&self.id), final_signature)
    }

    /// Verifies the chain, then requires every caveat to be satisfied.
    ///
    /// Caveats are checked in chain order. The first unsatisfied caveat is
    /// reported as `CaveatNotSatisfied`, which is distinct from
    /// `BadSignature`.
    ///
    /// # Example
    /// ```
    /// use pkmacaroon::{KeyPair, Macaroon, MacaroonError};
    /// use pkmacaroon::satisfier::ExactSatisfier;
    ///
    /// let issuer = KeyPair::generate().unwrap();
    /// let mut macaroon = Macaroon::new(&issuer.private, "user-42").unwrap();
    /// macaroon.add_caveat("scope=read").unwrap();
    /// macaroon.finalize().unwrap();
    ///
    /// let allowed = ExactSatisfier::new(["scope=read"]);
    /// assert!(macaroon.authorize(&issuer.public, &allowed).is_ok());
    ///
    /// let denied = ExactSatisfier::new(["scope=write"]);
    /// assert_eq!(
    ///     macaroon.authorize(&issuer.public, &denied),
    ///     Err(MacaroonError::CaveatNotSatisfied("scope=read".to_string()))
    /// );
    /// ```
    pub fn authorize(&self, issuer_key: &PublicKey, satisfier: &impl Satisfier) -> Result<()> {
        self.verify(issuer_key)?;

        let denied = self.caveats.iter().enumerate().find(|(_, c)| !satisfier.satisfies(c));
        if let Some((index, caveat)) = denied {
            debug!(index, caveat_len = caveat.len(), "caveat not satisfied");
            return Err(MacaroonError::CaveatNotSatisfied(caveat.clone()));
        }

        Ok(())
    }

    /// Reassembles a finalized macaroon from fields that already satisfy the
    /// length invariant
    pub(crate) fn from_closed_chain(
        id: String,
        caveats: Vec<String>,
        verification_keys: Vec<PublicKey>,
        signatures: Vec<SignaturePair>,
        final_signature: Signature,
    ) -> Self {
        Self {
            id,
            caveats,
            verification_keys,
            signatures,
            phase: Phase::Closed(final_signature),
        }
    }

    /// Returns the macaroon's root identity
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the caveats in chain order
    pub fn caveats(&self) -> &[String] {
        &self.caveats
    }

    /// Returns the per-link public keys, root link first
    pub fn verification_keys(&self) -> &[PublicKey] {
        &self.verification_keys
    }

    /// Returns the per-link signature pairs, root link first
    pub fn signatures(&self) -> &[SignaturePair] {
        &self.signatures
    }

    /// Returns the final signature, or `None` while the macaroon is open
    pub fn final_signature(&self) -> Option<&Signature> {
        match &self.phase {
            Phase::Open(_) => None,
            Phase::Closed(signature) => Some(signature),
        }
    }

    /// Returns true once the macaroon has been finalized
    pub fn is_finalized(&self) -> bool {
        matches!(self.phase, Phase::Closed(_))
    }

    /// Returns the number of caveats in this macaroon
    pub fn caveat_count(&self) -> usize {
        self.caveats.len()
    }

    /// Returns true if this macaroon has no caveats
    pub fn is_unrestricted(&self) -> bool {
        self.caveats.is_empty()
    }
}
