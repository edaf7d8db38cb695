// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Chain codecs
//!
//! Each supported chain implements [`Chain`], providing path schemas,
//! address rendering, payload decoding to a [`ChainTransaction`] and
//! message preparation. Chains are looked up by [`ChainTag`] via [`lookup`].

use heapless::{String, Vec};

use hwsign_apdu::{path::DerivationPath, tx::SubpayloadKind, ChainTag, MAX_MESSAGE_LEN, MAX_SIGNATURES};

use crate::{
    assembler::{HashKind, Window},
    codec::U256,
    engine::Error,
    helpers::{blake2b256, fmt_token_val, fmt_unknown_val, AmountStr},
    keychain::{Curve, KeyNode, Keychain},
    orchestrator::{Summary, SummaryTransfer},
    path::{self, PathCheck},
    signer::{self, Scheme, Signature},
    tokens::TokenDescriptor,
};

pub mod alephium;
pub mod bitcoin;
pub mod ethereum;
pub mod solana;

/// Maximum number of transfers displayed for a transaction
pub const MAX_TRANSFERS: usize = 16;

/// Maximum rendered address length
pub const ADDRESS_LEN: usize = 96;

/// Rendered address string
pub type AddressStr = String<ADDRESS_LEN>;

/// Maximum prepared message length
pub const MAX_PREPARED_LEN: usize = MAX_MESSAGE_LEN + 128;

/// Create an address string from a str
pub(crate) fn address_str(s: &str) -> Result<AddressStr, Error> {
    let mut a = AddressStr::new();
    a.push_str(s).map_err(|_| Error::InvalidLength)?;
    Ok(a)
}

/// Render base58 (optionally with a double-SHA256 checksum)
pub(crate) fn base58(data: &[u8], check: bool) -> Result<AddressStr, Error> {
    let mut buff = [0u8; ADDRESS_LEN];

    let mut e = bs58::encode(data);
    if check {
        e = e.with_check();
    }
    let n = e.into(&mut buff[..]).map_err(|_| Error::EncodingFailed)?;

    let s = core::str::from_utf8(&buff[..n]).map_err(|_| Error::EncodingFailed)?;
    address_str(s)
}

/// Value transfer to a recipient
#[derive(Clone, PartialEq, Debug)]
pub struct Transfer {
    pub recipient: AddressStr,
    pub amount: U256,
    pub token: &'static TokenDescriptor,
    /// Token contract / id, rendered for unknown tokens
    pub contract: Option<AddressStr>,
}

/// Key, message and scheme for a single signature
#[derive(Clone, PartialEq, Debug)]
pub struct SigningInput {
    pub path: DerivationPath,
    pub message: [u8; 32],
    pub scheme: Scheme,
    /// Byte appended to the encoded signature (ie. bitcoin sighash type)
    pub suffix: Option<u8>,
}

/// UTXO model transaction
#[derive(Clone, PartialEq, Debug)]
pub struct UtxoTx<'a> {
    pub inputs: Vec<SigningInput, MAX_SIGNATURES>,
    /// External outputs (verified change is not displayed)
    pub outputs: Vec<Transfer, MAX_TRANSFERS>,
    pub fee: U256,
    pub raw_data: &'a [u8],
}

/// Account model transaction
#[derive(Clone, PartialEq, Debug)]
pub struct AccountTx<'a> {
    pub from: AddressStr,
    pub transfers: Vec<Transfer, MAX_TRANSFERS>,
    pub fee: U256,
    pub raw_data: &'a [u8],
    pub memo: Option<&'a [u8]>,
    pub input: SigningInput,
    /// Sub-payload (script / contract bytecode) window for separate display
    pub window: Option<Window>,
}

/// Decoded chain transaction
#[derive(Clone, PartialEq, Debug)]
pub enum ChainTransaction<'a> {
    Utxo(UtxoTx<'a>),
    Account(AccountTx<'a>),
}

impl<'a> ChainTransaction<'a> {
    pub fn transfers(&self) -> &[Transfer] {
        match self {
            ChainTransaction::Utxo(t) => &t.outputs,
            ChainTransaction::Account(t) => &t.transfers,
        }
    }

    pub fn fee(&self) -> &U256 {
        match self {
            ChainTransaction::Utxo(t) => &t.fee,
            ChainTransaction::Account(t) => &t.fee,
        }
    }

    pub fn raw_data(&self) -> &'a [u8] {
        match self {
            ChainTransaction::Utxo(t) => t.raw_data,
            ChainTransaction::Account(t) => t.raw_data,
        }
    }

    pub fn window(&self) -> Option<Window> {
        match self {
            ChainTransaction::Utxo(_) => None,
            ChainTransaction::Account(t) => t.window,
        }
    }

    pub fn inputs(&self) -> &[SigningInput] {
        match self {
            ChainTransaction::Utxo(t) => &t.inputs,
            ChainTransaction::Account(t) => core::slice::from_ref(&t.input),
        }
    }
}

/// Context for transaction decoding
pub struct DecodeContext<'a> {
    pub keychain: &'a Keychain<'a>,
    /// Request signing path
    pub path: &'a [u32],
    /// Chain id (where applicable)
    pub chain_id: u64,
    /// Payload digest computed during assembly
    pub digest: &'a [u8; 32],
}

/// Sub-payload state at the time of display
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Subpayload<'a> {
    /// No sub-payload declared
    None,
    /// Provided by the host and checked against the payload window
    Provided(SubpayloadKind, &'a [u8]),
    /// Skipped by the host, displayed as a digest of the window
    Skipped(SubpayloadKind, [u8; 32]),
}

/// Message signing request
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct MessageRequest<'a> {
    pub message: &'a [u8],
    pub domain: Option<[u8; 32]>,
    pub version: u8,
    pub format: u8,
}

/// Signature output encoding for messages
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum MessageEncoding {
    /// Signature bytes as produced by the signer
    Raw,
    /// `(27 + 4 + recid) || r || s`, compressed key recoverable form
    BitcoinCompact,
    /// `r || s || (27 + recid)`
    EthereumPersonal,
}

/// Message prepared for signing
pub struct PreparedMessage {
    /// Bytes passed to the signer (a prehash for ECDSA schemes)
    pub data: Vec<u8, MAX_PREPARED_LEN>,
    pub scheme: Scheme,
    pub encoding: MessageEncoding,
}

/// Chain codec capabilities
pub trait Chain: Sync {
    fn tag(&self) -> ChainTag;

    /// Display name
    fn name(&self) -> &'static str;

    /// Signing curve
    fn curve(&self) -> Curve;

    /// Native token
    fn native(&self) -> &'static TokenDescriptor;

    /// Accepted path schemas
    fn schemas(&self) -> &'static [&'static str];

    /// Validate a derivation path against the chain schemas
    fn validate_path(&self, path: &[u32], strict: bool) -> Result<PathCheck, Error> {
        path::validate(path, self.schemas(), strict)
    }

    /// Render the address for a key
    fn address(&self, node: &KeyNode, path: &[u32], chain_id: u64) -> Result<AddressStr, Error>;

    /// Payload hash, `None` where transaction signing is not supported
    fn payload_hash(&self) -> Option<HashKind> {
        None
    }

    /// Decode an assembled payload
    fn decode<'a>(&self, _payload: &'a [u8], _ctx: &DecodeContext) -> Result<ChainTransaction<'a>, Error> {
        Err(Error::UnsupportedChainFeature)
    }

    /// Build the display summary for a decoded transaction
    fn describe_for_ui<'a>(
        &self,
        tx: &ChainTransaction<'a>,
        subpayload: Subpayload<'a>,
    ) -> Result<Summary<'a>, Error> {
        describe(self.name(), self.native(), tx, subpayload)
    }

    /// Sign each input of a decoded transaction
    fn sign(
        &self,
        tx: &ChainTransaction,
        keychain: &Keychain,
        aux: &[u8; 32],
    ) -> Result<Vec<Signature, MAX_SIGNATURES>, Error> {
        let mut sigs = Vec::new();

        for input in tx.inputs() {
            let node = keychain.derive(input.path.as_ref(), self.curve())?;
            let mut s = signer::sign(&node, input.scheme, &input.message, aux)?;

            if let Some(b) = input.suffix {
                s.bytes.push(b).map_err(|_| Error::SignError)?;
            }

            sigs.push(s).map_err(|_| Error::InvalidLength)?;
        }

        Ok(sigs)
    }

    /// Prepare a message for signing
    fn prepare_message(&self, _req: &MessageRequest, _node: &KeyNode) -> Result<PreparedMessage, Error> {
        Err(Error::UnsupportedChainFeature)
    }
}

/// Render an amount for a token
pub fn fmt_amount(amount: &U256, token: &TokenDescriptor) -> AmountStr {
    match token.is_unknown() {
        true => fmt_unknown_val(amount),
        false => fmt_token_val(amount, token.decimals, token.symbol),
    }
}

/// Generic transaction summary construction
pub fn describe<'a>(
    chain: &'static str,
    native: &'static TokenDescriptor,
    tx: &ChainTransaction<'a>,
    subpayload: Subpayload<'a>,
) -> Result<Summary<'a>, Error> {
    let mut transfers = Vec::new();

    for t in tx.transfers() {
        let unknown_contract = match t.token.is_unknown() {
            true => t.contract.clone(),
            false => None,
        };

        transfers
            .push(SummaryTransfer {
                recipient: t.recipient.clone(),
                amount: fmt_amount(&t.amount, t.token),
                unknown_contract,
            })
            .map_err(|_| Error::InvalidLength)?;
    }

    Ok(Summary {
        chain,
        transfers,
        raw_data: tx.raw_data(),
        subpayload,
        fee: fmt_amount(tx.fee(), native),
    })
}

/// Digest used to display skipped sub-payloads
pub fn subpayload_digest(data: &[u8]) -> [u8; 32] {
    blake2b256(data)
}

static BITCOIN: bitcoin::Bitcoin = bitcoin::Bitcoin;
static ETHEREUM: ethereum::Ethereum = ethereum::Ethereum;
static ALEPHIUM: alephium::Alephium = alephium::Alephium;
static SOLANA: solana::Solana = solana::Solana;

/// Fetch the codec for a chain
pub fn lookup(tag: ChainTag) -> &'static dyn Chain {
    match tag {
        ChainTag::Bitcoin => &BITCOIN,
        ChainTag::Ethereum => &ETHEREUM,
        ChainTag::Alephium => &ALEPHIUM,
        ChainTag::Solana => &SOLANA,
    }
}

#[cfg(test)]
mod test {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn registry() {
        for tag in ChainTag::iter() {
            let c = lookup(tag);
            assert_eq!(c.tag(), tag);
            assert!(!c.schemas().is_empty());
        }

        // Transaction support
        assert!(lookup(ChainTag::Ethereum).payload_hash().is_some());
        assert!(lookup(ChainTag::Solana).payload_hash().is_none());
    }
}
