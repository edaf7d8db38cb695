// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Alephium codec
//!
//! Decodes unsigned transactions, the transaction id (Blake2b-256 over the
//! unsigned transaction) is signed with BIP-340 schnorr.
//!
//! ## Unsigned transaction:
//! ```text
//! VERSION (u8) | NETWORK_ID (u8) | SCRIPT_OPT (0x00 | 0x01 BYTE_STRING)
//!   | GAS_AMOUNT (compact i32) | GAS_PRICE (compact u256)
//!   | INPUTS (compact len, [HINT (4) | KEY (32) | UNLOCK_SCRIPT])
//!   | OUTPUTS (compact len, [AMOUNT (compact u256) | LOCKUP_SCRIPT
//!       | LOCK_TIME (u64 BE) | TOKENS (compact len, [ID (32) | AMOUNT (compact u256)])
//!       | ADDITIONAL_DATA (BYTE_STRING)])
//! ```
//!
//! Outputs follow each other directly, any byte that does not decode as
//! the next output is rejected.

use heapless::Vec;

use hwsign_apdu::{path::DerivationPath, tx::SubpayloadKind, ChainTag};

use super::{
    base58, AccountTx, AddressStr, Chain, ChainTransaction, DecodeContext, SigningInput, Transfer,
    MAX_TRANSFERS,
};
use crate::{
    assembler::{HashKind, Window},
    codec::{Reader, U256},
    engine::Error,
    helpers::{blake2b256, fmt_hex},
    keychain::{Curve, KeyNode},
    signer::Scheme,
    tokens::{self, Namespace, TokenDescriptor, ALPH},
};

/// Supported transaction version
pub const TX_VERSION: u8 = 0;

/// Lockup script kinds
#[derive(Copy, Clone, PartialEq, Debug)]
#[repr(u8)]
pub enum LockupKind {
    P2pkh = 0x00,
    P2mpkh = 0x01,
    P2sh = 0x02,
    P2c = 0x03,
}

impl TryFrom<u8> for LockupKind {
    type Error = Error;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0x00 => Ok(Self::P2pkh),
            0x01 => Ok(Self::P2mpkh),
            0x02 => Ok(Self::P2sh),
            0x03 => Ok(Self::P2c),
            _ => Err(Error::UnknownVariant),
        }
    }
}

/// Unlock script kinds
const UNLOCK_P2PKH: u8 = 0x00;
const UNLOCK_P2MPKH: u8 = 0x01;
const UNLOCK_SAME_AS_PREVIOUS: u8 = 0x03;

pub struct Alephium;

/// P2PKH lockup hash for a compressed public key
fn pubkey_hash(public_key: &[u8]) -> [u8; 32] {
    blake2b256(public_key)
}

/// Read a lockup script, returning the raw script bytes
fn lockup_script<'a>(r: &mut Reader<'a>, payload: &'a [u8]) -> Result<&'a [u8], Error> {
    let start = r.offset();

    match LockupKind::try_from(r.u8()?)? {
        LockupKind::P2pkh | LockupKind::P2sh | LockupKind::P2c => {
            r.bytes(32)?;
        }
        LockupKind::P2mpkh => {
            let n = r.compact_len()?;
            for _ in 0..n {
                r.bytes(32)?;
            }
            let _m = r.compact_len()?;
        }
    }

    Ok(&payload[start..r.offset()])
}

/// Read and validate an unlock script
fn unlock_script(r: &mut Reader) -> Result<(), Error> {
    match r.u8()? {
        UNLOCK_P2PKH => {
            r.bytes(33)?;
        }
        UNLOCK_P2MPKH => {
            let n = r.compact_len()?;
            for _ in 0..n {
                r.bytes(33)?;
                let _index = r.compact_len()?;
            }
        }
        UNLOCK_SAME_AS_PREVIOUS => (),
        _ => return Err(Error::UnknownVariant),
    }
    Ok(())
}

impl Chain for Alephium {
    fn tag(&self) -> ChainTag {
        ChainTag::Alephium
    }

    fn name(&self) -> &'static str {
        "Alephium"
    }

    fn curve(&self) -> Curve {
        Curve::Secp256k1
    }

    fn native(&self) -> &'static TokenDescriptor {
        &ALPH
    }

    fn schemas(&self) -> &'static [&'static str] {
        &["m/44'/1234'/[0-100]'/0/[0-1000000]"]
    }

    fn address(&self, node: &KeyNode, _path: &[u32], _chain_id: u64) -> Result<AddressStr, Error> {
        let mut lockup = [0u8; 33];
        lockup[0] = LockupKind::P2pkh as u8;
        lockup[1..].copy_from_slice(&pubkey_hash(node.public_key()));

        base58(&lockup, false)
    }

    fn payload_hash(&self) -> Option<HashKind> {
        Some(HashKind::Blake2b256)
    }

    #[cfg_attr(feature = "noinline", inline(never))]
    fn decode<'a>(&self, payload: &'a [u8], ctx: &DecodeContext) -> Result<ChainTransaction<'a>, Error> {
        let mut r = Reader::new(payload);

        if r.u8()? != TX_VERSION {
            return Err(Error::UnknownVariant);
        }
        let _network_id = r.u8()?;

        // Script is delivered as a separate sub-payload for display
        let window = match r.u8()? {
            0x00 => None,
            0x01 => {
                let script = r.byte_string()?;
                Some(Window {
                    kind: SubpayloadKind::Script,
                    offset: r.offset() - script.len(),
                    length: script.len(),
                })
            }
            _ => return Err(Error::UnknownVariant),
        };

        let gas_amount = r.compact_i32()?;
        let gas_price = r.compact_u256()?;
        if gas_amount < 0 {
            return Err(Error::InvalidAmount);
        }

        let fee = U256::from(gas_amount as u64)
            .checked_mul(gas_price)
            .ok_or(Error::InvalidAmount)?;

        for _ in 0..r.compact_len()? {
            let _hint = r.u32_be()?;
            let _key = r.bytes(32)?;
            unlock_script(&mut r)?;
        }

        let node = ctx.keychain.derive(ctx.path, Curve::Secp256k1)?;
        let own_hash = pubkey_hash(node.public_key());

        let mut transfers = Vec::<Transfer, MAX_TRANSFERS>::new();

        for _ in 0..r.compact_len()? {
            let amount = r.compact_u256()?;
            let lockup = lockup_script(&mut r, payload)?;
            let _lock_time = r.u64_be()?;

            let is_change = lockup[0] == LockupKind::P2pkh as u8 && lockup[1..] == own_hash;
            let recipient = base58(lockup, false)?;

            if !is_change {
                transfers
                    .push(Transfer {
                        recipient: recipient.clone(),
                        amount,
                        token: &ALPH,
                        contract: None,
                    })
                    .map_err(|_| Error::InvalidLength)?;
            }

            for _ in 0..r.compact_len()? {
                let id = r.bytes(32)?;
                let amount = r.compact_u256()?;

                if is_change {
                    continue;
                }

                let token = tokens::lookup(Namespace::Alephium, id);
                let contract = match token.is_unknown() {
                    true => Some(super::address_str(&fmt_hex::<66>(id))?),
                    false => None,
                };

                transfers
                    .push(Transfer {
                        recipient: recipient.clone(),
                        amount,
                        token,
                        contract,
                    })
                    .map_err(|_| Error::InvalidLength)?;
            }

            let _additional_data = r.byte_string()?;
        }

        r.finish()?;

        Ok(ChainTransaction::Account(AccountTx {
            from: self.address(&node, ctx.path, ctx.chain_id)?,
            transfers,
            fee,
            raw_data: &[],
            memo: None,
            input: SigningInput {
                path: DerivationPath::from_slice(ctx.path)?,
                message: *ctx.digest,
                scheme: Scheme::Schnorr(None),
                suffix: None,
            },
            window,
        }))
    }
}

#[cfg(test)]
mod test {
    use hwsign_apdu::app_info::CurveFlags;

    use super::*;
    use crate::{
        chain::Subpayload,
        codec::{compact_i32, compact_u256},
        keychain::{Keychain, HARDENED},
    };

    const PATH: &[u32] = &[44 | HARDENED, 1234 | HARDENED, HARDENED, 0, 0];
    const SEED: [u8; 64] = [0x17; 64];

    fn own_hash() -> [u8; 32] {
        let k = Keychain::new(&SEED, CurveFlags::all());
        pubkey_hash(k.derive(PATH, Curve::Secp256k1).unwrap().public_key())
    }

    /// Build an unsigned transaction with a single P2PKH input
    fn build_tx(script: Option<&[u8]>, outputs: &[([u8; 32], u64, Option<[u8; 32]>)]) -> std::vec::Vec<u8> {
        let mut tx = std::vec![TX_VERSION, 0x00];

        match script {
            None => tx.push(0x00),
            Some(s) => {
                tx.push(0x01);
                tx.extend_from_slice(&compact_i32::encode(s.len() as i32));
                tx.extend_from_slice(s);
            }
        }

        tx.extend_from_slice(&compact_i32::encode(20_000));
        tx.extend_from_slice(&compact_u256::encode(&U256::from(100_000_000_000u64)));

        // Inputs
        tx.extend_from_slice(&compact_i32::encode(1));
        tx.extend_from_slice(&[0xaa; 4]);
        tx.extend_from_slice(&[0xbb; 32]);
        tx.push(UNLOCK_P2PKH);
        tx.extend_from_slice(&[0x02; 33]);

        // Outputs
        tx.extend_from_slice(&compact_i32::encode(outputs.len() as i32));
        for (hash, amount, token) in outputs {
            tx.extend_from_slice(&compact_u256::encode(&U256::from(*amount)));
            tx.push(LockupKind::P2pkh as u8);
            tx.extend_from_slice(hash);
            tx.extend_from_slice(&0u64.to_be_bytes());

            match token {
                None => tx.extend_from_slice(&compact_i32::encode(0)),
                Some(id) => {
                    tx.extend_from_slice(&compact_i32::encode(1));
                    tx.extend_from_slice(id);
                    tx.extend_from_slice(&compact_u256::encode(&U256::from(42)));
                }
            }

            tx.extend_from_slice(&compact_i32::encode(0));
        }

        tx
    }

    fn decode(tx: &[u8]) -> Result<ChainTransaction, Error> {
        let k = Keychain::new(&SEED, CurveFlags::all());
        let ctx = DecodeContext {
            keychain: &k,
            path: PATH,
            chain_id: 0,
            digest: &[0u8; 32],
        };
        Alephium.decode(tx, &ctx)
    }

    #[test]
    fn decode_transfer_with_change() {
        let alph = 10u64.pow(18);
        let tx = build_tx(None, &[([0x11; 32], alph, None), (own_hash(), 5 * alph, None)]);

        let t = decode(&tx).unwrap();

        // Change output is not displayed
        assert_eq!(t.transfers().len(), 1);

        let mut lockup = [0u8; 33];
        lockup[1..].copy_from_slice(&[0x11; 32]);
        assert_eq!(
            t.transfers()[0].recipient.as_str(),
            bs58::encode(&lockup).into_string()
        );

        let s = Alephium.describe_for_ui(&t, Subpayload::None).unwrap();
        assert_eq!(s.transfers[0].amount.as_str(), "1.0 ALPH");
        assert_eq!(s.fee.as_str(), "0.002 ALPH");

        assert_eq!(t.inputs()[0].scheme, Scheme::Schnorr(None));
    }

    #[test]
    fn decode_tokens() {
        let tx = build_tx(None, &[([0x11; 32], 1_000, Some([0x33; 32]))]);
        let t = decode(&tx).unwrap();

        assert_eq!(t.transfers().len(), 2);
        assert!(t.transfers()[1].token.is_unknown());
        assert_eq!(
            t.transfers()[1].contract.as_deref(),
            Some(hex::encode([0x33; 32]).as_str())
        );

        let s = Alephium.describe_for_ui(&t, Subpayload::None).unwrap();
        assert_eq!(s.transfers[1].amount.as_str(), "42 units");
    }

    #[test]
    fn script_window() {
        let script = [0x01, 0x02, 0x03, 0x04];
        let tx = build_tx(Some(&script), &[([0x11; 32], 1_000, None)]);
        let t = decode(&tx).unwrap();

        let w = t.window().unwrap();
        assert_eq!(w.kind, SubpayloadKind::Script);
        assert_eq!(&tx[w.offset..][..w.length], &script);
    }

    #[test]
    fn decode_errors() {
        let tx = build_tx(None, &[([0x11; 32], 1_000, None)]);

        // Unknown lockup script kind
        let mut t = tx.clone();
        let i = t.len() - 1 - 8 - 1 - 32 - 1;
        t[i] = 0x07;
        assert_eq!(decode(&t), Err(Error::UnknownVariant));

        // Trailing byte following the last output
        let mut t = tx.clone();
        t.push(0x00);
        assert_eq!(decode(&t), Err(Error::TrailingData));

        // Truncated
        assert_eq!(decode(&tx[..tx.len() - 3]), Err(Error::CodecUnderflow));

        // Unsupported version
        let mut t = tx;
        t[0] = 0x01;
        assert_eq!(decode(&t), Err(Error::UnknownVariant));
    }
}
