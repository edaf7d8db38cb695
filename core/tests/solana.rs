use hwsign::{DeviceHandle, Error as HostError};
use hwsign_core::{apdu::ChainTag, engine::Error};
use hwsign_tests::vectors::*;

mod helpers;
use helpers::*;

#[tokio::test(flavor = "multi_thread")]
async fn sol_address() -> anyhow::Result<()> {
    init_logging();

    let e = TestEngine::with_mnemonic();
    let d = DeviceHandle::from(e.clone());

    let a = d
        .address(ChainTag::Solana, SOL_PATH.parse()?, 0, false)
        .await?;

    // Addresses are the base58 encoded public key
    let k = bs58::decode(&a.address).into_vec()?;
    assert_eq!(k.len(), 32);
    assert_eq!(&k[..], &a.public_key[..]);

    // Derivation is stable and account dependent
    let b = d
        .address(ChainTag::Solana, SOL_PATH.parse()?, 0, false)
        .await?;
    assert_eq!(a.address, b.address);

    let c = d
        .address(ChainTag::Solana, "m/44'/501'/1'/0'".parse()?, 0, false)
        .await?;
    assert_ne!(a.address, c.address);

    // No screens without show_display
    assert!(e.take_screens().is_empty());

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn sol_offchain_message() -> anyhow::Result<()> {
    init_logging();

    let e = TestEngine::with_mnemonic();

    // Verifies the signature over exactly preamble || message
    let r = hwsign_tests::message::solana_offchain(e.clone(), b"Hello", 0, None).await?;
    assert_eq!(r.signature.len(), 64);

    assert_eq!(
        e.take_screens(),
        vec!["Message(5 bytes)".to_string(), "Final(Solana)".to_string()]
    );

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn sol_offchain_domain() -> anyhow::Result<()> {
    init_logging();

    let e = TestEngine::with_mnemonic();

    hwsign_tests::message::solana_offchain(e.clone(), "héllo".as_bytes(), 1, Some([0x11; 32]))
        .await?;

    let screens = e.take_screens();
    assert_eq!(screens.len(), 3);
    assert_eq!(screens[0], "Message(6 bytes)");
    assert!(screens[1].starts_with("ApplicationDomain(1111"));
    assert_eq!(screens[2], "Final(Solana)");

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn sol_offchain_invalid_format() -> anyhow::Result<()> {
    init_logging();

    let e = TestEngine::with_mnemonic();
    let d = DeviceHandle::from(e.clone());

    // Restricted ASCII rejects non-printable content
    let r = d
        .sign_message(ChainTag::Solana, SOL_PATH.parse()?, b"Hello\n", 0, None)
        .await;
    assert!(
        matches!(r, Err(HostError::Device { code, .. }) if code == Error::InvalidMessage as u8),
        "unexpected result: {r:?}"
    );

    // Unknown formats
    let r = d
        .sign_message(ChainTag::Solana, SOL_PATH.parse()?, b"Hello", 3, None)
        .await;
    assert!(
        matches!(r, Err(HostError::Device { code, .. }) if code == Error::UnknownVariant as u8),
        "unexpected result: {r:?}"
    );

    // Nothing reaches the user
    assert!(e.take_screens().is_empty());

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn sol_non_standard_path() -> anyhow::Result<()> {
    init_logging();

    let e = TestEngine::with_mnemonic();
    let d = DeviceHandle::from(e.clone());

    let r = d
        .sign_message(ChainTag::Solana, "m/44'/501'/0'/0'/0'".parse()?, b"Hello", 0, None)
        .await;
    assert!(
        matches!(r, Err(HostError::Device { code, .. }) if code == Error::InvalidPath as u8),
        "unexpected result: {r:?}"
    );

    Ok(())
}
