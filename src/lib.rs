pub mod builder;
pub mod crypto;
pub mod error;
pub mod macaroon;
pub mod parts;
pub mod satisfier;
pub mod serialization;

pub use builder::MacaroonBuilder;
pub use crypto::{KeyPair, PrivateKey, PublicKey, Signature};
pub use error::MacaroonError;
pub use macaroon::{Macaroon, SignaturePair};
pub use parts::{ChainLimits, MacaroonParts};
pub use satisfier::Satisfier;

/// Result type for macaroon operations
pub type Result<T> = std::result::Result<T, MacaroonError>;
