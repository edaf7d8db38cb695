// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Message signing tests

use anyhow::anyhow;
use ed25519_dalek::{Signature, VerifyingKey};
use log::info;

use hwsign::{apdu::ChainTag, DeviceHandle, Exchange, MessageSignature};

use crate::vectors::{eth_recover, keccak256, sol_offchain_preamble, SOL_PATH};

/// Sign a solana offchain message, checking the signature covers
/// exactly the preamble followed by the message
pub async fn solana_offchain<T>(
    t: T,
    message: &[u8],
    format: u8,
    domain: Option<[u8; 32]>,
) -> anyhow::Result<MessageSignature>
where
    T: Exchange + Send + Sync,
{
    let d = DeviceHandle::from(t);

    info!("Signing {} byte offchain message", message.len());

    let r = d
        .sign_message(ChainTag::Solana, SOL_PATH.parse()?, message, format, domain)
        .await?;

    // Signer key is the base58 address
    let public_key: [u8; 32] = bs58::decode(&r.address)
        .into_vec()?
        .try_into()
        .map_err(|_| anyhow!("invalid solana address: {}", r.address))?;

    let mut signed = sol_offchain_preamble(
        &domain.unwrap_or_default(),
        format,
        &public_key,
        message.len(),
    );
    signed.extend_from_slice(message);

    let k = VerifyingKey::from_bytes(&public_key)?;
    let s = Signature::from_slice(&r.signature)?;
    k.verify_strict(&signed, &s)?;

    info!("Signature verified for: {}", r.address);

    Ok(r)
}

/// Sign an ethereum personal message, checking the recovered signer
pub async fn eth_personal<T>(
    t: T,
    path: &str,
    message: &[u8],
    address: &str,
) -> anyhow::Result<MessageSignature>
where
    T: Exchange + Send + Sync,
{
    let d = DeviceHandle::from(t);

    let r = d
        .sign_message(ChainTag::Ethereum, path.parse()?, message, 0, None)
        .await?;

    let mut m = format!("\x19Ethereum Signed Message:\n{}", message.len()).into_bytes();
    m.extend_from_slice(message);

    let recovered = eth_recover(&keccak256(&m), &r.signature)?;

    assert!(r.signature[64] >= 27, "personal signatures use 27 + v");
    assert_eq!(recovered, address.to_lowercase(), "recovered address mismatch");

    Ok(r)
}
