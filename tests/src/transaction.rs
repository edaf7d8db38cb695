// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Transaction signing tests

use log::{debug, info};

use hwsign::{apdu::ChainTag, DeviceHandle, Exchange, SignedTx, TxRequest};

use crate::vectors::{eth_recover, keccak256};

/// Ethereum transaction expectation
pub struct TransactionExpectation<'a> {
    pub name: &'a str,
    pub path: &'a str,
    pub chain_id: u64,
    /// Encoded transaction payload
    pub payload: Vec<u8>,
    /// Expected signer address
    pub address: &'a str,
}

/// Sign an ethereum transaction, checking the signature recovers
/// to the expected address over the Keccak-256 payload digest
pub async fn test<T>(t: T, tx: &TransactionExpectation<'_>) -> anyhow::Result<SignedTx>
where
    T: Exchange + Send + Sync,
{
    let d = DeviceHandle::from(t);

    info!(
        "Starting transaction '{}' ({} bytes)",
        tx.name,
        tx.payload.len()
    );

    let req = TxRequest::new(ChainTag::Ethereum, tx.path.parse()?, &tx.payload)
        .with_chain_id(tx.chain_id);
    let signed = d.sign_tx(&req).await?;

    debug!("Signatures: {:02x?}", signed.signatures);

    assert_eq!(signed.signatures.len(), 1, "expected single signature");
    assert_eq!(signed.signatures[0].len(), 65, "invalid signature length");
    assert_eq!(signed.address, tx.address, "signer address mismatch");

    // Check the signature covers the payload digest
    let digest = keccak256(&tx.payload);
    let recovered = eth_recover(&digest, &signed.signatures[0])?;

    info!("Transaction complete, recovered signer: {}", recovered);

    assert_eq!(recovered, tx.address.to_lowercase(), "recovered address mismatch");

    Ok(signed)
}
