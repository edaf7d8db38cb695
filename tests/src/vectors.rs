// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Shared test vectors and payload builders

use anyhow::anyhow;
use rlp::RlpStream;
use sha3::{Digest, Keccak256};

/// BIP-39 test mnemonic, shared between test utilities and targets
pub const MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

/// Ethereum account zero for [MNEMONIC]
pub const ETH_PATH: &str = "m/44'/60'/0'/0/0";

/// Expected ethereum address for [ETH_PATH]
pub const ETH_ADDRESS: &str = "0x9858EfFD232B4033E47d90003D41EC34EcaEda94";

/// Solana account zero
pub const SOL_PATH: &str = "m/44'/501'/0'/0'";

/// Offchain message signing domain
pub const SOL_SIGNING_DOMAIN: &[u8] = b"\xffsolana offchain";

/// One ether in wei
pub const ONE_ETH: u128 = 1_000_000_000_000_000_000;

/// ERC-20 `transfer(address,uint256)` selector
pub const ERC20_TRANSFER: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// Build a legacy EIP-155 transaction for signing
pub fn eth_legacy_tx(
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    to: &[u8],
    value: u128,
    data: &[u8],
    chain_id: u64,
) -> Vec<u8> {
    let mut s = RlpStream::new_list(9);
    s.append(&nonce)
        .append(&gas_price)
        .append(&gas_limit)
        .append(&to.to_vec())
        .append(&value)
        .append(&data.to_vec())
        .append(&chain_id)
        .append(&0u8)
        .append(&0u8);
    s.out().to_vec()
}

/// Build ERC-20 `transfer(to, amount)` call data
pub fn erc20_transfer(to: &[u8; 20], amount: u128) -> Vec<u8> {
    let mut d = ERC20_TRANSFER.to_vec();
    d.extend_from_slice(&[0u8; 12]);
    d.extend_from_slice(to);
    d.extend_from_slice(&[0u8; 16]);
    d.extend_from_slice(&amount.to_be_bytes());
    d
}

/// Address `0x00..01`
pub fn eth_address_one() -> [u8; 20] {
    let mut a = [0u8; 20];
    a[19] = 0x01;
    a
}

/// Keccak-256 digest
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut d = [0u8; 32];
    d.copy_from_slice(&Keccak256::digest(data));
    d
}

/// Recover the (lower case) ethereum address from a digest and `r || s || v` signature
pub fn eth_recover(digest: &[u8; 32], sig: &[u8]) -> anyhow::Result<String> {
    use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

    if sig.len() != 65 {
        return Err(anyhow!("invalid signature length: {}", sig.len()));
    }

    let s = Signature::from_slice(&sig[..64])?;
    let v = match sig[64] {
        v @ 0..=1 => v,
        v @ 27..=28 => v - 27,
        v => return Err(anyhow!("invalid recovery id: {}", v)),
    };
    let rid = RecoveryId::from_byte(v).ok_or_else(|| anyhow!("invalid recovery id"))?;

    let k = VerifyingKey::recover_from_prehash(digest, &s, rid)?;
    let p = k.to_encoded_point(false);

    let h = keccak256(&p.as_bytes()[1..]);
    Ok(format!("0x{}", hex::encode(&h[12..])))
}

/// Build the solana offchain message preamble for the provided signer key
pub fn sol_offchain_preamble(
    domain: &[u8; 32],
    format: u8,
    signer: &[u8],
    message_len: usize,
) -> Vec<u8> {
    let mut p = SOL_SIGNING_DOMAIN.to_vec();
    p.push(0);
    p.extend_from_slice(domain);
    p.extend_from_slice(&[format, 1]);
    p.extend_from_slice(signer);
    p.extend_from_slice(&(message_len as u16).to_le_bytes());
    p
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn legacy_tx_encoding() {
        let tx = eth_legacy_tx(9, 20_000_000_000, 21_000, &[0x35; 20], ONE_ETH, &[], 1);

        // EIP-155 example transaction
        assert_eq!(
            hex::encode(&tx),
            "ec098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a764000080018080"
        );
    }

    #[test]
    fn erc20_call_data() {
        let d = erc20_transfer(&[0x22; 20], 500_000);
        assert_eq!(d.len(), 68);
        assert_eq!(&d[..4], &ERC20_TRANSFER);
        assert_eq!(&d[16..36], &[0x22; 20]);
        assert_eq!(&d[65..], &[0x07, 0xa1, 0x20]);
    }
}
