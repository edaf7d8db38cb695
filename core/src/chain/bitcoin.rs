// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Bitcoin codec
//!
//! Transactions are supplied in a device frame carrying the data needed to
//! compute per-input signature hashes (spent amounts, key paths) and to
//! verify change outputs. Legacy P2PKH inputs are signed with DER encoded
//! ECDSA over the SIGHASH_ALL double-SHA256 digest, taproot key-path inputs
//! with BIP-340 schnorr over the BIP-341 SIGHASH_DEFAULT digest.
//!
//! ## Frame:
//! ```text
//! VERSION (u32 LE) | INPUT_COUNT (compact_int)
//!   | [TXID (32) | VOUT (u32 LE) | SEQUENCE (u32 LE) | AMOUNT (u64 LE) | KIND (u8) | PATH]
//!   | OUTPUT_COUNT (compact_int)
//!   | [AMOUNT (u64 LE) | SCRIPT_PUBKEY (compact_int len) | CHANGE_PATH]
//!   | LOCK_TIME (u32 LE)
//!
//! PATH: DEPTH (u8) | [INDEX (u32 LE)], an empty change path marks an external output
//! ```

use bech32::{u5, Variant};
use heapless::Vec;
use sha2::{Digest, Sha256};

use hwsign_apdu::{path::DerivationPath, ChainTag, MAX_SIGNATURES};

use super::{
    base58, AddressStr, Chain, ChainTransaction, DecodeContext, MessageEncoding,
    MessageRequest, PreparedMessage, SigningInput, Transfer, UtxoTx, MAX_TRANSFERS,
};
use crate::{
    assembler::HashKind,
    codec::{compact_int, Reader, U256},
    engine::Error,
    helpers::{hash160, sha256, tagged_hash},
    keychain::{Curve, KeyNode, HARDENED},
    path,
    signer::{schnorr_public_key, Scheme, Tweak},
    tokens::{TokenDescriptor, BTC},
};

/// Maximum number of outputs, including change
pub const MAX_OUTPUTS: usize = 32;

/// SIGHASH_ALL, appended to legacy signatures
pub const SIGHASH_ALL: u8 = 0x01;

/// BIP-341 SIGHASH_DEFAULT
pub const SIGHASH_DEFAULT: u8 = 0x00;

const MESSAGE_PREFIX: &[u8] = b"\x18Bitcoin Signed Message:\n";

const OP_0: u8 = 0x00;
const OP_1: u8 = 0x51;
const OP_DUP: u8 = 0x76;
const OP_HASH160: u8 = 0xa9;
const OP_EQUAL: u8 = 0x87;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_CHECKSIG: u8 = 0xac;
const OP_RETURN: u8 = 0x6a;

/// Script pubkey storage (up to P2WSH / P2TR length)
pub type Script = Vec<u8, 34>;

/// Spend kind for inputs
#[derive(Copy, Clone, PartialEq, Debug)]
#[repr(u8)]
pub enum InputKind {
    /// Legacy pay-to-pubkey-hash
    P2pkh = 0x00,
    /// Taproot key-path spend
    P2tr = 0x01,
}

impl TryFrom<u8> for InputKind {
    type Error = Error;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0x00 => Ok(Self::P2pkh),
            0x01 => Ok(Self::P2tr),
            _ => Err(Error::UnknownVariant),
        }
    }
}

/// Address network parameters
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Network {
    pub hrp: &'static str,
    pub p2pkh: u8,
    pub p2sh: u8,
}

pub const MAINNET: Network = Network {
    hrp: "bc",
    p2pkh: 0x00,
    p2sh: 0x05,
};

pub const TESTNET: Network = Network {
    hrp: "tb",
    p2pkh: 0x6f,
    p2sh: 0xc4,
};

impl Network {
    /// Select network by chain id (0: mainnet, otherwise testnet)
    pub fn from_chain_id(chain_id: u64) -> Self {
        match chain_id {
            0 => MAINNET,
            _ => TESTNET,
        }
    }
}

struct Input<'a> {
    txid: &'a [u8],
    vout: u32,
    sequence: u32,
    amount: u64,
    kind: InputKind,
    path: DerivationPath,
    script_pubkey: Script,
}

struct Output<'a> {
    amount: u64,
    script: &'a [u8],
    change: bool,
}

pub struct Bitcoin;

fn script(parts: &[&[u8]]) -> Result<Script, Error> {
    let mut s = Script::new();
    for p in parts {
        s.extend_from_slice(p).map_err(|_| Error::InvalidLength)?;
    }
    Ok(s)
}

/// P2PKH script pubkey
pub fn p2pkh_script(h: &[u8; 20]) -> Result<Script, Error> {
    script(&[&[OP_DUP, OP_HASH160, 20], h, &[OP_EQUALVERIFY, OP_CHECKSIG]])
}

/// P2WPKH script pubkey
pub fn p2wpkh_script(h: &[u8; 20]) -> Result<Script, Error> {
    script(&[&[OP_0, 20], h])
}

/// P2TR script pubkey for a tweaked x-only key
pub fn p2tr_script(x: &[u8; 32]) -> Result<Script, Error> {
    script(&[&[OP_1, 32], x])
}

/// Script pubkey for a key, selected by the path purpose
fn script_for(node: &KeyNode, path: &[u32]) -> Result<Script, Error> {
    match path.first().map(|p| p & !HARDENED) {
        Some(44) => p2pkh_script(&hash160(node.public_key())),
        Some(84) => p2wpkh_script(&hash160(node.public_key())),
        Some(86) => p2tr_script(&schnorr_public_key(node, Some(Tweak { merkle_root: None }))?),
        _ => Err(Error::InvalidPath),
    }
}

/// Convert a witness program to base32 with the version prefix
fn witness_u5(version: u8, program: &[u8]) -> Result<Vec<u5, 64>, Error> {
    let mut out = Vec::new();
    let v = u5::try_from_u8(version).map_err(|_| Error::EncodingFailed)?;
    out.push(v).map_err(|_| Error::InvalidLength)?;

    let (mut acc, mut bits) = (0u32, 0u32);
    let mut push = |v: u32| {
        u5::try_from_u8((v & 0x1f) as u8)
            .map_err(|_| Error::EncodingFailed)
            .and_then(|v| out.push(v).map_err(|_| Error::InvalidLength))
    };

    for b in program {
        acc = ((acc << 8) | *b as u32) & 0x1fff;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            push(acc >> bits)?;
        }
    }
    if bits > 0 {
        push(acc << (5 - bits))?;
    }

    Ok(out)
}

/// Render a segwit address (bech32 for v0, bech32m for v1+)
pub fn segwit_address(network: &Network, version: u8, program: &[u8]) -> Result<AddressStr, Error> {
    let data = witness_u5(version, program)?;
    let variant = match version {
        0 => Variant::Bech32,
        _ => Variant::Bech32m,
    };

    let mut s = AddressStr::new();
    bech32::encode_to_fmt(&mut s, network.hrp, &data, variant)
        .map_err(|_| Error::EncodingFailed)?
        .map_err(|_| Error::EncodingFailed)?;

    Ok(s)
}

/// Render a base58check address with the provided version byte
fn base58_address(version: u8, hash: &[u8]) -> Result<AddressStr, Error> {
    let mut b = [0u8; 21];
    b[0] = version;
    b[1..].copy_from_slice(hash);
    base58(&b, true)
}

/// Render the address for an output script
pub fn script_address(network: &Network, s: &[u8]) -> Result<AddressStr, Error> {
    match s {
        [OP_DUP, OP_HASH160, 20, h @ .., OP_EQUALVERIFY, OP_CHECKSIG] if h.len() == 20 => {
            base58_address(network.p2pkh, h)
        }
        [OP_HASH160, 20, h @ .., OP_EQUAL] if h.len() == 20 => base58_address(network.p2sh, h),
        [OP_0, 20, p @ ..] if p.len() == 20 => segwit_address(network, 0, p),
        [OP_0, 32, p @ ..] if p.len() == 32 => segwit_address(network, 0, p),
        [OP_1, 32, p @ ..] if p.len() == 32 => segwit_address(network, 1, p),
        _ => Err(Error::UnknownVariant),
    }
}

fn read_path(r: &mut Reader) -> Result<DerivationPath, Error> {
    let depth = r.u8()?;

    let mut p = DerivationPath::new();
    for _ in 0..depth {
        p.push(r.u32_le()?)?;
    }

    Ok(p)
}

/// Write a CompactSize length prefixed script into a hasher
fn hash_script(h: &mut Sha256, s: &[u8]) {
    h.update(compact_int::encode(s.len() as u64));
    h.update(s);
}

/// Legacy SIGHASH_ALL digest for input `index`
fn legacy_sighash(
    version: u32,
    inputs: &[Input],
    outputs: &[Output],
    lock_time: u32,
    index: usize,
) -> [u8; 32] {
    let mut h = Sha256::new();

    h.update(version.to_le_bytes());
    h.update(compact_int::encode(inputs.len() as u64));
    for (i, input) in inputs.iter().enumerate() {
        h.update(input.txid);
        h.update(input.vout.to_le_bytes());
        match i == index {
            true => hash_script(&mut h, &input.script_pubkey),
            false => hash_script(&mut h, &[]),
        }
        h.update(input.sequence.to_le_bytes());
    }

    h.update(compact_int::encode(outputs.len() as u64));
    for o in outputs {
        h.update(o.amount.to_le_bytes());
        hash_script(&mut h, o.script);
    }

    h.update(lock_time.to_le_bytes());
    h.update((SIGHASH_ALL as u32).to_le_bytes());

    sha256(&h.finalize())
}

/// Transaction-wide BIP-341 hashes
struct TaprootHashes {
    prevouts: [u8; 32],
    amounts: [u8; 32],
    script_pubkeys: [u8; 32],
    sequences: [u8; 32],
    outputs: [u8; 32],
}

impl TaprootHashes {
    fn new(inputs: &[Input], outputs: &[Output]) -> Self {
        let (mut prevouts, mut amounts, mut spks, mut seqs, mut outs) = (
            Sha256::new(),
            Sha256::new(),
            Sha256::new(),
            Sha256::new(),
            Sha256::new(),
        );

        for i in inputs {
            prevouts.update(i.txid);
            prevouts.update(i.vout.to_le_bytes());
            amounts.update(i.amount.to_le_bytes());
            hash_script(&mut spks, &i.script_pubkey);
            seqs.update(i.sequence.to_le_bytes());
        }

        for o in outputs {
            outs.update(o.amount.to_le_bytes());
            hash_script(&mut outs, o.script);
        }

        Self {
            prevouts: prevouts.finalize().into(),
            amounts: amounts.finalize().into(),
            script_pubkeys: spks.finalize().into(),
            sequences: seqs.finalize().into(),
            outputs: outs.finalize().into(),
        }
    }

    /// BIP-341 SIGHASH_DEFAULT key-path digest for input `index`
    fn sighash(&self, version: u32, lock_time: u32, index: usize) -> [u8; 32] {
        tagged_hash(
            "TapSighash",
            &[
                // Epoch and hash type
                &[0x00, SIGHASH_DEFAULT],
                &version.to_le_bytes(),
                &lock_time.to_le_bytes(),
                &self.prevouts,
                &self.amounts,
                &self.script_pubkeys,
                &self.sequences,
                &self.outputs,
                // Key-path spend without annex
                &[0x00],
                &(index as u32).to_le_bytes(),
            ],
        )
    }
}

impl Chain for Bitcoin {
    fn tag(&self) -> ChainTag {
        ChainTag::Bitcoin
    }

    fn name(&self) -> &'static str {
        "Bitcoin"
    }

    fn curve(&self) -> Curve {
        Curve::Secp256k1
    }

    fn native(&self) -> &'static TokenDescriptor {
        &BTC
    }

    fn schemas(&self) -> &'static [&'static str] {
        &[
            "m/44'/0'/[0-100]'/[0-1]/[0-1000000]",
            "m/84'/0'/[0-100]'/[0-1]/[0-1000000]",
            "m/86'/0'/[0-100]'/[0-1]/[0-1000000]",
            "m/44'/1'/[0-100]'/[0-1]/[0-1000000]",
            "m/84'/1'/[0-100]'/[0-1]/[0-1000000]",
            "m/86'/1'/[0-100]'/[0-1]/[0-1000000]",
        ]
    }

    fn address(&self, node: &KeyNode, path: &[u32], chain_id: u64) -> Result<AddressStr, Error> {
        script_address(&Network::from_chain_id(chain_id), &script_for(node, path)?)
    }

    fn payload_hash(&self) -> Option<HashKind> {
        Some(HashKind::Sha256)
    }

    #[cfg_attr(feature = "noinline", inline(never))]
    fn decode<'a>(&self, payload: &'a [u8], ctx: &DecodeContext) -> Result<ChainTransaction<'a>, Error> {
        let network = Network::from_chain_id(ctx.chain_id);
        let mut r = Reader::new(payload);

        let version = r.u32_le()?;

        let mut inputs = Vec::<Input, MAX_SIGNATURES>::new();
        for _ in 0..r.compact_int()? {
            let txid = r.bytes(32)?;
            let vout = r.u32_le()?;
            let sequence = r.u32_le()?;
            let amount = r.u64_le()?;
            let kind = InputKind::try_from(r.u8()?)?;
            let key_path = read_path(&mut r)?;

            path::validate(key_path.as_ref(), self.schemas(), false)?;
            let node = ctx.keychain.derive(key_path.as_ref(), Curve::Secp256k1)?;

            let script_pubkey = match kind {
                InputKind::P2pkh => p2pkh_script(&hash160(node.public_key()))?,
                InputKind::P2tr => {
                    p2tr_script(&schnorr_public_key(&node, Some(Tweak { merkle_root: None }))?)?
                }
            };

            inputs
                .push(Input {
                    txid,
                    vout,
                    sequence,
                    amount,
                    kind,
                    path: key_path,
                    script_pubkey,
                })
                .map_err(|_| Error::InvalidLength)?;
        }

        let mut outputs = Vec::<Output, MAX_OUTPUTS>::new();
        for _ in 0..r.compact_int()? {
            let amount = r.u64_le()?;
            let len = r.compact_int()? as usize;
            let script = r.bytes(len)?;
            let change_path = read_path(&mut r)?;

            let change = change_path.depth() > 0;
            if change {
                let node = ctx.keychain.derive(change_path.as_ref(), Curve::Secp256k1)?;
                if script_for(&node, change_path.as_ref())?.as_slice() != script {
                    #[cfg(feature = "log")]
                    log::warn!("change output script mismatch");

                    return Err(Error::InvalidChange);
                }
            }

            outputs
                .push(Output {
                    amount,
                    script,
                    change,
                })
                .map_err(|_| Error::InvalidLength)?;
        }

        let lock_time = r.u32_le()?;
        r.finish()?;

        if inputs.is_empty() || outputs.is_empty() {
            return Err(Error::InvalidLength);
        }

        // Fee is the difference of spent and created amounts
        let total_in = inputs
            .iter()
            .try_fold(U256::zero(), |a, i| a.checked_add(U256::from(i.amount)))
            .ok_or(Error::InvalidAmount)?;
        let total_out = outputs
            .iter()
            .try_fold(U256::zero(), |a, o| a.checked_add(U256::from(o.amount)))
            .ok_or(Error::InvalidAmount)?;
        let fee = total_in
            .checked_sub(total_out)
            .ok_or(Error::InvalidAmount)?;

        let mut transfers = Vec::<Transfer, MAX_TRANSFERS>::new();
        let mut raw_data: &[u8] = &[];

        for o in outputs.iter().filter(|o| !o.change) {
            if let [OP_RETURN, data @ ..] = o.script {
                if !raw_data.is_empty() {
                    return Err(Error::InvalidLength);
                }
                raw_data = data;
                continue;
            }

            transfers
                .push(Transfer {
                    recipient: script_address(&network, o.script)?,
                    amount: U256::from(o.amount),
                    token: &BTC,
                    contract: None,
                })
                .map_err(|_| Error::InvalidLength)?;
        }

        let taproot = TaprootHashes::new(&inputs, &outputs);

        let mut signing = Vec::new();
        for (i, input) in inputs.iter().enumerate() {
            let (message, scheme, suffix) = match input.kind {
                InputKind::P2pkh => (
                    legacy_sighash(version, &inputs, &outputs, lock_time, i),
                    Scheme::EcdsaDer,
                    Some(SIGHASH_ALL),
                ),
                InputKind::P2tr => (
                    taproot.sighash(version, lock_time, i),
                    Scheme::Schnorr(Some(Tweak { merkle_root: None })),
                    None,
                ),
            };

            signing
                .push(SigningInput {
                    path: input.path.clone(),
                    message,
                    scheme,
                    suffix,
                })
                .map_err(|_| Error::InvalidLength)?;
        }

        Ok(ChainTransaction::Utxo(UtxoTx {
            inputs: signing,
            outputs: transfers,
            fee,
            raw_data,
        }))
    }

    fn prepare_message(&self, req: &MessageRequest, _node: &KeyNode) -> Result<PreparedMessage, Error> {
        Ok(PreparedMessage {
            data: Vec::from_slice(&message_digest(req.message)).map_err(|_| Error::InvalidLength)?,
            scheme: Scheme::EcdsaRecoverable,
            encoding: MessageEncoding::BitcoinCompact,
        })
    }
}

/// Signed message digest, double-SHA256 over the prefixed message
pub fn message_digest(message: &[u8]) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(MESSAGE_PREFIX);
    h.update(compact_int::encode(message.len() as u64));
    h.update(message);

    sha256(&h.finalize())
}
