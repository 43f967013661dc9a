#![no_main]

use libfuzzer_sys::fuzz_target;
use pkmacaroon::{KeyPair, Macaroon, MacaroonError};

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }

    let issuer = KeyPair::generate().unwrap();
    let id = String::from_utf8_lossy(&data[..data.len() / 2]).into_owned();

    let mut token = Macaroon::new(&issuer.private, id).unwrap();
    for chunk in data[data.len() / 2..].chunks(16) {
        token.add_caveat(String::from_utf8_lossy(chunk)).unwrap();
    }
    token.finalize().unwrap();

    // Any chain built honestly verifies
    token.verify(&issuer.public).unwrap();

    // Flip one byte somewhere in the encoded chain; it must never verify
    let mut parts = token.to_parts().unwrap();
    let target = data[0] as usize % (parts.signatures.len() * 2 + 1);
    let byte = data[1] as usize;
    if target == parts.signatures.len() * 2 {
        let mut bytes = *parts.final_signature.as_bytes();
        bytes[byte % bytes.len()] ^= data[2] | 1;
        parts.final_signature = pkmacaroon::Signature::from_bytes(bytes);
    } else {
        let pair = &mut parts.signatures[target / 2];
        let signature = if target % 2 == 0 {
            &mut pair.key_signature
        } else {
            &mut pair.content_signature
        };
        let mut bytes = *signature.as_bytes();
        bytes[byte % bytes.len()] ^= data[2] | 1;
        *signature = pkmacaroon::Signature::from_bytes(bytes);
    }

    let tampered = Macaroon::from_parts_with_limits(parts, &pkmacaroon::ChainLimits::unbounded()).unwrap();
    assert_eq!(
        tampered.verify(&issuer.public),
        Err(MacaroonError::BadSignature)
    );
});
