use color_eyre::eyre::{Result, eyre};
use pkmacaroon::satisfier::ExactSatisfier;
use pkmacaroon::{KeyPair, Macaroon, MacaroonBuilder, MacaroonError};

fn main() -> Result<()> {
    color_eyre::install()?;

    println!("=== Public-Key Macaroon Basic Usage ===\n");

    // Step 1: The issuer's long-lived key pair. Only the public half is
    // needed to verify.
    let issuer = KeyPair::generate()?;
    println!("1. Issuer public key: {}", issuer.public);

    // Step 2: Mint and restrict
    let mut macaroon = Macaroon::new(&issuer.private, "user-42")?;
    macaroon.add_caveat("expires=2099")?;
    macaroon.add_caveat("scope=read")?;

    println!("\n2. Added caveats:");
    for (i, caveat) in macaroon.caveats().iter().enumerate() {
        println!("   {}. {}", i + 1, caveat);
    }

    // Step 3: Close the chain; the extension key is destroyed here
    macaroon.finalize()?;
    let token = macaroon.to_base64()?;
    println!("\n3. Finalized. Base64: {token}");

    // Step 4: A verifier holding only the public key
    let received = Macaroon::from_base64(&token)?;
    received.verify(&issuer.public)?;
    println!("\n4. Signature chain verified");

    let context = ExactSatisfier::new(["expires=2099", "scope=read"]);
    received.authorize(&issuer.public, &context)?;
    println!("   Caveats satisfied");

    // Step 5: Rewriting a caveat without re-signing
    println!("\n5. Rewriting scope=read to scope=write...");
    let mut parts = received.to_parts()?;
    parts.caveats[1] = "scope=write".to_string();
    let forged = Macaroon::from_parts(parts)?;
    match forged.verify(&issuer.public) {
        Err(MacaroonError::BadSignature) => println!("   Correctly rejected"),
        other => return Err(eyre!("forged macaroon not rejected: {other:?}")),
    }

    // Step 6: The typed builder cannot be extended after finalizing
    println!("\n6. Builder API...");
    let built = MacaroonBuilder::new(&issuer.private, "service-7")?
        .with_caveat("ip=10.0.0.0/8")?
        .finalize();
    built.verify(&issuer.public)?;
    println!("   Verified {} with {} caveat(s)", built.id(), built.caveat_count());

    println!("\n=== Example Complete ===");
    Ok(())
}
