use crate::parts::{ChainLimits, MacaroonParts};
use crate::{Macaroon, MacaroonError, Result};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

// Every encoding goes through `MacaroonParts`, so only finalized macaroons
// can be encoded and every decoded macaroon passes the structural checks.

impl Macaroon {
    /// Serializes this macaroon to JSON
    ///
    /// Keys and signatures are hex-encoded in the JSON output.
    ///
    /// # Example
    /// ```
    /// use pkmacaroon::{KeyPair, MacaroonBuilder};
    ///
    /// let issuer = KeyPair::generate().unwrap();
    /// let macaroon = MacaroonBuilder::new(&issuer.private, "my-identifier")
    ///     .unwrap()
    ///     .with_caveat("account = alice")
    ///     .unwrap()
    ///     .finalize();
    ///
    /// let json = macaroon.to_json().unwrap();
    /// assert!(json.contains("account = alice"));
    /// ```
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.to_parts()?)
            .map_err(|e| MacaroonError::DeserializationError(e.to_string()))
    }

    /// Serializes this macaroon to pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_parts()?)
            .map_err(|e| MacaroonError::DeserializationError(e.to_string()))
    }

    /// Deserializes a macaroon from JSON
    ///
    /// # Example
    /// ```
    /// use pkmacaroon::{KeyPair, Macaroon, MacaroonBuilder};
    ///
    /// let issuer = KeyPair::generate().unwrap();
    /// let original = MacaroonBuilder::new(&issuer.private, "my-identifier")
    ///     .unwrap()
    ///     .finalize();
    /// let json = original.to_json().unwrap();
    ///
    /// let decoded = Macaroon::from_json(&json).unwrap();
    /// assert!(decoded.verify(&issuer.public).is_ok());
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_json_with_limits(json, &ChainLimits::default())
    }

    /// Deserializes a macaroon from JSON, enforcing the given size limits
    pub fn from_json_with_limits(json: &str, limits: &ChainLimits) -> Result<Self> {
        let parts: MacaroonParts = serde_json::from_str(json)
            .map_err(|e| MacaroonError::DeserializationError(e.to_string()))?;
        Self::from_parts_with_limits(parts, limits)
    }

    /// Serializes this macaroon to MessagePack binary format
    pub fn to_msgpack(&self) -> Result<Vec<u8>> {
        rmp_serde::to_vec(&self.to_parts()?)
            .map_err(|e| MacaroonError::DeserializationError(e.to_string()))
    }

    /// Deserializes a macaroon from MessagePack binary format
    pub fn from_msgpack(data: &[u8]) -> Result<Self> {
        Self::from_msgpack_with_limits(data, &ChainLimits::default())
    }

    /// Deserializes a macaroon from MessagePack, enforcing the given size limits
    pub fn from_msgpack_with_limits(data: &[u8], limits: &ChainLimits) -> Result<Self> {
        let parts: MacaroonParts = rmp_serde::from_slice(data)
            .map_err(|e| MacaroonError::DeserializationError(e.to_string()))?;
        Self::from_parts_with_limits(parts, limits)
    }

    /// Serializes this macaroon to a base64-encoded string (MessagePack encoding)
    ///
    /// This uses URL-safe base64 encoding without padding, suitable for HTTP headers.
    ///
    /// # Example
    /// ```
    /// use pkmacaroon::{KeyPair, Macaroon, MacaroonBuilder};
    ///
    /// let issuer = KeyPair::generate().unwrap();
    /// let original = MacaroonBuilder::new(&issuer.private, "my-identifier")
    ///     .unwrap()
    ///     .with_caveat("scope=read")
    ///     .unwrap()
    ///     .finalize();
    ///
    /// let token = original.to_base64().unwrap();
    /// let decoded = Macaroon::from_base64(&token).unwrap();
    /// assert_eq!(decoded.caveats(), ["scope=read"]);
    /// ```
    pub fn to_base64(&self) -> Result<String> {
        let msgpack = self.to_msgpack()?;
        Ok(URL_SAFE_NO_PAD.encode(&msgpack))
    }

    /// Deserializes a macaroon from a base64-encoded string (MessagePack encoding)
    pub fn from_base64(b64: &str) -> Result<Self> {
        Self::from_base64_with_limits(b64, &ChainLimits::default())
    }

    /// Deserializes a base64-encoded macaroon, enforcing the given size limits
    ///
    /// # Example
    /// ```
    /// use pkmacaroon::{ChainLimits, KeyPair, Macaroon};
    ///
    /// let issuer = KeyPair::generate().unwrap();
    /// let mut original = Macaroon::new(&issuer.private, "batch-job").unwrap();
    /// for i in 0..100 {
    ///     original.add_caveat(format!("shard = {i}")).unwrap();
    /// }
    /// original.finalize().unwrap();
    /// let token = original.to_base64().unwrap();
    ///
    /// assert!(Macaroon::from_base64(&token).is_err());
    ///
    /// let limits = ChainLimits::default().with_max_caveats(128);
    /// let decoded = Macaroon::from_base64_with_limits(&token, &limits).unwrap();
    /// assert!(decoded.verify(&issuer.public).is_ok());
    /// ```
    pub fn from_base64_with_limits(b64: &str, limits: &ChainLimits) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(b64.as_bytes())
            .map_err(|e| MacaroonError::DeserializationError(e.to_string()))?;

        Self::from_msgpack_with_limits(&bytes, limits)
    }

    /// Serializes this macaroon to a hex string (MessagePack encoding)
    pub fn to_hex(&self) -> Result<String> {
        let msgpack = self.to_msgpack()?;
        Ok(hex::encode(&msgpack))
    }

    /// Deserializes a macaroon from a hex string (MessagePack encoding)
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        Self::from_hex_with_limits(hex_str, &ChainLimits::default())
    }

    /// Deserializes a hex-encoded macaroon, enforcing the given size limits
    pub fn from_hex_with_limits(hex_str: &str, limits: &ChainLimits) -> Result<Self> {
        let msgpack = hex::decode(hex_str)
            .map_err(|e| MacaroonError::DeserializationError(e.to_string()))?;
        Self::from_msgpack_with_limits(&msgpack, limits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyPair;
    use crate::parts::{DEFAULT_MAX_CAVEATS, DEFAULT_MAX_ID_LEN};

    fn sample(caveats: &[&str]) -> (KeyPair, Macaroon) {
        let issuer = KeyPair::generate().unwrap();
        let mut macaroon = Macaroon::new(&issuer.private, "my-identifier").unwrap();
        for caveat in caveats {
            macaroon.add_caveat(*caveat).unwrap();
        }
        macaroon.finalize().unwrap();
        (issuer, macaroon)
    }

    fn with_caveat_count(count: usize) -> (KeyPair, Macaroon) {
        let issuer = KeyPair::generate().unwrap();
        let mut macaroon = Macaroon::new(&issuer.private, "my-identifier").unwrap();
        for i in 0..count {
            macaroon.add_caveat(format!("shard = {i}")).unwrap();
        }
        macaroon.finalize().unwrap();
        (issuer, macaroon)
    }

    fn with_id_len(len: usize) -> (KeyPair, Macaroon) {
        let issuer = KeyPair::generate().unwrap();
        let mut macaroon = Macaroon::new(&issuer.private, "x".repeat(len)).unwrap();
        macaroon.finalize().unwrap();
        (issuer, macaroon)
    }

    #[test]
    fn test_open_macaroon_not_encodable() {
        let issuer = KeyPair::generate().unwrap();
        let macaroon = Macaroon::new(&issuer.private, "my-identifier").unwrap();

        assert_eq!(macaroon.to_json(), Err(MacaroonError::NotFinalized));
        assert_eq!(macaroon.to_msgpack(), Err(MacaroonError::NotFinalized));
        assert_eq!(macaroon.to_base64(), Err(MacaroonError::NotFinalized));
        assert_eq!(macaroon.to_hex(), Err(MacaroonError::NotFinalized));
    }

    #[test]
    fn test_json_roundtrip_with_caveats() {
        let (issuer, original) = sample(&["account = alice", "action = read"]);

        let json = original.to_json().unwrap();
        let decoded = Macaroon::from_json(&json).unwrap();

        assert_eq!(decoded.to_parts(), original.to_parts());
        assert!(decoded.verify(&issuer.public).is_ok());
    }

    #[test]
    fn test_json_pretty() {
        let (_, macaroon) = sample(&[]);

        let json = macaroon.to_json_pretty().unwrap();
        assert!(json.contains('\n'));
        assert!(json.contains("final_signature"));
        assert!(json.contains(&macaroon.verification_keys()[0].to_string()));
    }

    #[test]
    fn test_msgpack_roundtrip() {
        let (issuer, original) = sample(&["account = alice"]);

        let msgpack = original.to_msgpack().unwrap();
        let decoded = Macaroon::from_msgpack(&msgpack).unwrap();

        assert_eq!(decoded.to_parts(), original.to_parts());
        assert!(decoded.verify(&issuer.public).is_ok());
    }

    #[test]
    fn test_msgpack_is_compact() {
        let (_, macaroon) = sample(&["account = alice"]);

        let msgpack = macaroon.to_msgpack().unwrap();
        let json = macaroon.to_json().unwrap();

        // Raw bytes versus hex strings
        assert!(msgpack.len() < json.len());
    }

    #[test]
    fn test_base64_roundtrip() {
        let (issuer, original) = sample(&["account = alice"]);

        let b64 = original.to_base64().unwrap();
        let decoded = Macaroon::from_base64(&b64).unwrap();

        assert_eq!(decoded.to_parts(), original.to_parts());
        assert!(decoded.verify(&issuer.public).is_ok());
    }

    #[test]
    fn test_hex_roundtrip() {
        let (issuer, original) = sample(&["account = alice"]);

        let hex_str = original.to_hex().unwrap();
        let decoded = Macaroon::from_hex(&hex_str).unwrap();

        assert!(decoded.verify(&issuer.public).is_ok());
    }

    #[test]
    fn test_tampered_json_fails_verification() {
        let (issuer, original) = sample(&["expires=2099", "scope=read"]);

        let json = original.to_json().unwrap().replace("scope=read", "scope=write");
        let decoded = Macaroon::from_json(&json).unwrap();

        assert_eq!(
            decoded.verify(&issuer.public),
            Err(MacaroonError::BadSignature)
        );
    }

    #[test]
    fn test_structurally_broken_json() {
        let (_, original) = sample(&["a"]);

        let mut value: serde_json::Value = serde_json::from_str(&original.to_json().unwrap()).unwrap();
        value["caveats"] = serde_json::json!(["a", "b"]);

        assert!(matches!(
            Macaroon::from_json(&value.to_string()),
            Err(MacaroonError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_invalid_json() {
        let result = Macaroon::from_json("not valid json");
        assert!(matches!(result, Err(MacaroonError::DeserializationError(_))));
    }

    #[test]
    fn test_invalid_base64() {
        let result = Macaroon::from_base64("!!!invalid base64!!!");
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_hex() {
        let result = Macaroon::from_hex("zzz");
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_msgpack() {
        let result = Macaroon::from_msgpack(&[0xff, 0xff, 0xff]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cross_format_incompatibility() {
        let (_, macaroon) = sample(&[]);

        let json = macaroon.to_json().unwrap();
        let result = Macaroon::from_msgpack(json.as_bytes());
        assert!(result.is_err());
    }

    #[test]
    fn test_caveat_count_at_default_limit_decodes() {
        let (issuer, original) = with_caveat_count(DEFAULT_MAX_CAVEATS);

        let from_json = Macaroon::from_json(&original.to_json().unwrap()).unwrap();
        let from_msgpack = Macaroon::from_msgpack(&original.to_msgpack().unwrap()).unwrap();
        let from_base64 = Macaroon::from_base64(&original.to_base64().unwrap()).unwrap();
        let from_hex = Macaroon::from_hex(&original.to_hex().unwrap()).unwrap();

        for decoded in [from_json, from_msgpack, from_base64, from_hex] {
            assert_eq!(decoded.caveat_count(), DEFAULT_MAX_CAVEATS);
            assert!(decoded.verify(&issuer.public).is_ok());
        }
    }

    #[test]
    fn test_caveat_count_past_default_limit_rejected() {
        let (_, original) = with_caveat_count(DEFAULT_MAX_CAVEATS + 1);
        let expected = Err(MacaroonError::InvalidFormat(format!(
            "{} caveats, limit is {}",
            DEFAULT_MAX_CAVEATS + 1,
            DEFAULT_MAX_CAVEATS
        )));

        assert_eq!(Macaroon::from_json(&original.to_json().unwrap()).map(|_| ()), expected);
        assert_eq!(Macaroon::from_msgpack(&original.to_msgpack().unwrap()).map(|_| ()), expected);
        assert_eq!(Macaroon::from_base64(&original.to_base64().unwrap()).map(|_| ()), expected);
        assert_eq!(Macaroon::from_hex(&original.to_hex().unwrap()).map(|_| ()), expected);
    }

    #[test]
    fn test_caveat_count_past_default_limit_decodes_with_raised_limit() {
        let (issuer, original) = with_caveat_count(DEFAULT_MAX_CAVEATS + 1);
        let limits = ChainLimits::default().with_max_caveats(DEFAULT_MAX_CAVEATS + 1);

        let from_json = Macaroon::from_json_with_limits(&original.to_json().unwrap(), &limits).unwrap();
        let from_msgpack =
            Macaroon::from_msgpack_with_limits(&original.to_msgpack().unwrap(), &limits).unwrap();
        let from_base64 =
            Macaroon::from_base64_with_limits(&original.to_base64().unwrap(), &limits).unwrap();
        let from_hex = Macaroon::from_hex_with_limits(&original.to_hex().unwrap(), &limits).unwrap();

        for decoded in [from_json, from_msgpack, from_base64, from_hex] {
            assert_eq!(decoded.to_parts(), original.to_parts());
            assert!(decoded.verify(&issuer.public).is_ok());
        }
    }

    #[test]
    fn test_id_len_at_default_limit_decodes() {
        let (issuer, original) = with_id_len(DEFAULT_MAX_ID_LEN);

        let decoded = Macaroon::from_base64(&original.to_base64().unwrap()).unwrap();
        assert_eq!(decoded.id().len(), DEFAULT_MAX_ID_LEN);
        assert!(decoded.verify(&issuer.public).is_ok());
    }

    #[test]
    fn test_id_len_past_default_limit() {
        let (issuer, original) = with_id_len(DEFAULT_MAX_ID_LEN + 1);
        let json = original.to_json().unwrap();

        assert!(matches!(
            Macaroon::from_json(&json),
            Err(MacaroonError::InvalidFormat(_))
        ));

        let limits = ChainLimits::default().with_max_id_len(DEFAULT_MAX_ID_LEN + 1);
        let decoded = Macaroon::from_json_with_limits(&json, &limits).unwrap();
        assert!(decoded.verify(&issuer.public).is_ok());
    }

    #[test]
    fn test_lowered_limits_reject_small_token() {
        let (_, original) = sample(&["account = alice", "action = read"]);
        let limits = ChainLimits::default().with_max_caveats(1);

        assert!(matches!(
            Macaroon::from_hex_with_limits(&original.to_hex().unwrap(), &limits),
            Err(MacaroonError::InvalidFormat(_))
        ));
    }
}
