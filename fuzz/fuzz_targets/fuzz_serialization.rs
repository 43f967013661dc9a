#![no_main]

use libfuzzer_sys::fuzz_target;
use pkmacaroon::{KeyPair, Macaroon};

fuzz_target!(|data: &[u8]| {
    let key = KeyPair::generate().unwrap();

    // Fuzz MessagePack deserialization
    if let Ok(token) = Macaroon::from_msgpack(data) {
        // Anything that decodes is finalized and re-encodes
        assert!(token.is_finalized());
        let _ = token.to_msgpack().unwrap();
        let _ = token.to_base64();
        let _ = token.to_hex();
        let _ = token.to_json();

        // Verification must fail cleanly, never panic
        assert!(token.verify(&key.public).is_err());
    }

    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(token) = Macaroon::from_base64(s) {
            let _ = token.verify(&key.public);
        }

        if let Ok(token) = Macaroon::from_hex(s) {
            let _ = token.to_msgpack();
        }

        if let Ok(token) = Macaroon::from_json(s) {
            assert_eq!(
                token.verification_keys().len(),
                token.caveat_count() + 1
            );
            let _ = token.verify(&key.public);
        }
    }
});
