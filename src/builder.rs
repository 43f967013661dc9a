use crate::crypto::PrivateKey;
use crate::macaroon::Macaroon;
use crate::Result;

/// An open macaroon whose only way out is [`MacaroonBuilder::finalize`].
///
/// Finalizing consumes the builder, so a closed macaroon can never be
/// extended through it. Use this instead of the `&mut` methods on
/// [`Macaroon`] when the phase is known statically.
///
/// # Example
/// ```
/// use pkmacaroon::{KeyPair, MacaroonBuilder};
///
/// let issuer = KeyPair::generate().unwrap();
/// let macaroon = MacaroonBuilder::new(&issuer.private, "user-42")
///     .unwrap()
///     .with_caveat("expires=2099")
///     .unwrap()
///     .with_caveat("scope=read")
///     .unwrap()
///     .finalize();
///
/// assert!(macaroon.verify(&issuer.public).is_ok());
/// ```
#[derive(Debug)]
pub struct MacaroonBuilder {
    macaroon: Macaroon,
}

impl MacaroonBuilder {
    /// Mints a new macaroon under `issuer_key`
    pub fn new(issuer_key: &PrivateKey, id: impl Into<String>) -> Result<Self> {
        Ok(Self {
            macaroon: Macaroon::new(issuer_key, id)?,
        })
    }

    /// Appends a caveat.
    ///
    /// # Errors
    /// `KeyGenerationFailed` only; the builder is unchanged on error.
    pub fn add_caveat(&mut self, caveat: impl Into<String>) -> Result<()> {
        self.macaroon.add_caveat(caveat)
    }

    /// Appends a caveat and returns the builder for chaining
    pub fn with_caveat(mut self, caveat: impl Into<String>) -> Result<Self> {
        self.add_caveat(caveat)?;
        Ok(self)
    }

    /// The macaroon's root identity
    pub fn id(&self) -> &str {
        self.macaroon.id()
    }

    /// Caveats added so far, in chain order
    pub fn caveats(&self) -> &[String] {
        self.macaroon.caveats()
    }

    /// Number of caveats added so far
    pub fn caveat_count(&self) -> usize {
        self.macaroon.caveat_count()
    }

    /// Closes the chain and hands back the finalized macaroon
    pub fn finalize(self) -> Macaroon {
        self.macaroon.into_finalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{KeyPair, MacaroonError};

    #[test]
    fn test_builder_roundtrip() {
        let issuer = KeyPair::generate().unwrap();
        let mut builder = MacaroonBuilder::new(&issuer.private, "an id").unwrap();

        for i in 0..5 {
            builder.add_caveat(format!("caveat {i}")).unwrap();
        }
        assert_eq!(builder.id(), "an id");
        assert_eq!(builder.caveat_count(), 5);
        assert_eq!(builder.caveats()[4], "caveat 4");

        let macaroon = builder.finalize();
        assert!(macaroon.is_finalized());
        assert_eq!(macaroon.verification_keys().len(), 6);
        assert!(macaroon.verify(&issuer.public).is_ok());
    }

    #[test]
    fn test_builder_output_cannot_be_extended() {
        let issuer = KeyPair::generate().unwrap();
        let mut macaroon = MacaroonBuilder::new(&issuer.private, "an id")
            .unwrap()
            .finalize();

        assert!(matches!(
            macaroon.add_caveat("late"),
            Err(MacaroonError::InvalidState(_))
        ));
        assert!(macaroon.verify(&issuer.public).is_ok());
    }

    #[test]
    fn test_builder_matches_dynamic_api_shape() {
        let issuer = KeyPair::generate().unwrap();
        let built = MacaroonBuilder::new(&issuer.private, "id")
            .unwrap()
            .with_caveat("a")
            .unwrap()
            .finalize();

        let mut dynamic = Macaroon::new(&issuer.private, "id").unwrap();
        dynamic.add_caveat("a").unwrap();
        dynamic.finalize().unwrap();

        // Fresh keys differ per build, the structure does not
        assert_eq!(built.caveats(), dynamic.caveats());
        assert_eq!(built.signatures().len(), dynamic.signatures().len());
        assert_ne!(built.verification_keys(), dynamic.verification_keys());
        assert!(built.verify(&issuer.public).is_ok());
        assert!(dynamic.verify(&issuer.public).is_ok());
    }
}
