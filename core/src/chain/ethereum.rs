// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Ethereum codec
//!
//! Supports legacy (optionally EIP-155) and EIP-1559 transactions, the
//! signing digest is Keccak-256 over the assembled payload. ERC-20
//! `transfer(address,uint256)` calls are displayed as token transfers.

use core::fmt::Write;

use heapless::{String, Vec};
use sha3::{Digest, Keccak256};

use hwsign_apdu::{path::DerivationPath, tx::SubpayloadKind, ChainTag};

use super::{
    address_str, AccountTx, AddressStr, Chain, ChainTransaction, DecodeContext, MessageEncoding,
    MessageRequest, PreparedMessage, SigningInput, Transfer,
};
use crate::{
    assembler::{HashKind, Window},
    codec::{rlp, U256},
    engine::Error,
    helpers::{eip55, keccak256},
    keychain::{Curve, KeyNode},
    signer::Scheme,
    tokens::{self, Namespace, TokenDescriptor, ETH},
};

/// EIP-2718 type for EIP-1559 transactions
pub const EIP1559_TX_TYPE: u8 = 0x02;

/// ERC-20 `transfer(address,uint256)` selector
pub const ERC20_TRANSFER: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// Default chain id where neither the request nor the payload provide one
pub const DEFAULT_CHAIN_ID: u64 = 1;

const PERSONAL_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n";

/// Recipient rendered for contract creation
const NEW_CONTRACT: &str = "new contract";

pub struct Ethereum;

/// Transaction fields common to legacy and EIP-1559 encodings
struct TxFields<'a> {
    chain_id: Option<u64>,
    gas_limit: U256,
    /// Gas price, or max fee per gas for EIP-1559
    gas_price: U256,
    to: &'a [u8],
    value: U256,
    data: &'a [u8],
}

/// Compute the ethereum address for a compressed secp256k1 public key
pub fn address_bytes(public_key: &[u8]) -> Result<[u8; 20], Error> {
    let vk = k256::ecdsa::VerifyingKey::from_sec1_bytes(public_key)
        .map_err(|_| Error::InvalidKey)?;
    let p = vk.to_encoded_point(false);

    let h = keccak256(&p.as_bytes()[1..]);

    let mut a = [0u8; 20];
    a.copy_from_slice(&h[12..]);
    Ok(a)
}

fn render(addr: &[u8]) -> Result<AddressStr, Error> {
    let a: &[u8; 20] = addr.try_into().map_err(|_| Error::InvalidLength)?;
    address_str(&eip55(a))
}

/// Match an ERC-20 transfer call, returning the recipient and amount
pub fn erc20_transfer(data: &[u8]) -> Option<(&[u8], U256)> {
    if data.len() != 68 || data[..4] != ERC20_TRANSFER {
        return None;
    }

    // Address argument is left padded to 32 bytes
    if data[4..16].iter().any(|b| *b != 0) {
        return None;
    }

    let mut amount = [0u8; 32];
    amount.copy_from_slice(&data[36..68]);

    Some((&data[16..36], U256::from_big_endian(&amount)))
}

/// Decode a legacy transaction, `[nonce, gas_price, gas_limit, to, value, data]`
/// with optional EIP-155 `[chain_id, 0, 0]` suffix
fn decode_legacy(buff: &[u8]) -> Result<TxFields, Error> {
    let r = rlp::list(buff)?;

    let chain_id = match r.item_count()? {
        6 => None,
        9 => {
            let chain_id = rlp::u64(&r, 6)?;

            // Signature fields are empty prior to signing
            if !rlp::bytes(&r, 7)?.is_empty() || !rlp::bytes(&r, 8)?.is_empty() {
                return Err(Error::UnknownVariant);
            }

            Some(chain_id)
        }
        _ => return Err(Error::UnknownVariant),
    };

    let _nonce = rlp::u256(&r, 0)?;

    Ok(TxFields {
        chain_id,
        gas_price: rlp::u256(&r, 1)?,
        gas_limit: rlp::u256(&r, 2)?,
        to: rlp::bytes(&r, 3)?,
        value: rlp::u256(&r, 4)?,
        data: rlp::bytes(&r, 5)?,
    })
}

/// Decode an EIP-1559 transaction body, `[chain_id, nonce, max_priority_fee,
/// max_fee, gas_limit, to, value, data, access_list]`
fn decode_eip1559(buff: &[u8]) -> Result<TxFields, Error> {
    let r = rlp::list(buff)?;
    if r.item_count()? != 9 {
        return Err(Error::UnknownVariant);
    }

    let _nonce = rlp::u256(&r, 1)?;
    let _max_priority_fee = rlp::u256(&r, 2)?;

    // Access list entries are not displayed, but must be well formed
    let access_list = r.at(8)?;
    if !access_list.is_list() {
        return Err(Error::UnknownVariant);
    }
    for entry in access_list.iter() {
        if !entry.is_list() {
            return Err(Error::UnknownVariant);
        }
    }

    Ok(TxFields {
        chain_id: Some(rlp::u64(&r, 0)?),
        gas_price: rlp::u256(&r, 3)?,
        gas_limit: rlp::u256(&r, 4)?,
        to: rlp::bytes(&r, 5)?,
        value: rlp::u256(&r, 6)?,
        data: rlp::bytes(&r, 7)?,
    })
}

/// Offset of a sub-slice within the payload
fn offset_of(payload: &[u8], inner: &[u8]) -> usize {
    inner.as_ptr() as usize - payload.as_ptr() as usize
}

impl Chain for Ethereum {
    fn tag(&self) -> ChainTag {
        ChainTag::Ethereum
    }

    fn name(&self) -> &'static str {
        "Ethereum"
    }

    fn curve(&self) -> Curve {
        Curve::Secp256k1
    }

    fn native(&self) -> &'static TokenDescriptor {
        &ETH
    }

    fn schemas(&self) -> &'static [&'static str] {
        &[
            "m/44'/60'/[0-100]'/0/[0-1000000]",
            "m/44'/60'/[0-1000000]'/0'/0",
            "m/44'/1'/[0-100]'/0/[0-1000000]",
        ]
    }

    fn address(&self, node: &KeyNode, _path: &[u32], _chain_id: u64) -> Result<AddressStr, Error> {
        render(&address_bytes(node.public_key())?)
    }

    fn payload_hash(&self) -> Option<HashKind> {
        Some(HashKind::Keccak256)
    }

    #[cfg_attr(feature = "noinline", inline(never))]
    fn decode<'a>(&self, payload: &'a [u8], ctx: &DecodeContext) -> Result<ChainTransaction<'a>, Error> {
        let tx = match payload.first() {
            Some(&EIP1559_TX_TYPE) => decode_eip1559(&payload[1..])?,
            // Other typed transactions
            Some(t) if *t < 0xc0 => return Err(Error::UnknownVariant),
            _ => decode_legacy(payload)?,
        };

        let chain_id = match (tx.chain_id, ctx.chain_id) {
            (Some(id), _) => id,
            (None, 0) => DEFAULT_CHAIN_ID,
            (None, id) => id,
        };

        let fee = tx
            .gas_limit
            .checked_mul(tx.gas_price)
            .ok_or(Error::InvalidAmount)?;

        let node = ctx.keychain.derive(ctx.path, Curve::Secp256k1)?;
        let from = render(&address_bytes(node.public_key())?)?;

        let mut transfers = Vec::new();
        let mut raw_data: &[u8] = &[];
        let mut window = None;

        let transfer = match (tx.to.len(), erc20_transfer(tx.data)) {
            (20, Some((recipient, amount))) if tx.value.is_zero() => {
                let token = tokens::lookup(Namespace::Ethereum(chain_id), tx.to);

                #[cfg(feature = "log")]
                if token.is_unknown() {
                    log::debug!("unknown ERC-20 contract");
                }

                Transfer {
                    recipient: render(recipient)?,
                    amount,
                    token,
                    contract: Some(render(tx.to)?),
                }
            }
            (20, _) => {
                raw_data = tx.data;

                Transfer {
                    recipient: render(tx.to)?,
                    amount: tx.value,
                    token: &ETH,
                    contract: None,
                }
            }
            (0, _) => {
                if !tx.data.is_empty() {
                    window = Some(Window {
                        kind: SubpayloadKind::ContractBytecode,
                        offset: offset_of(payload, tx.data),
                        length: tx.data.len(),
                    });
                }

                Transfer {
                    recipient: address_str(NEW_CONTRACT)?,
                    amount: tx.value,
                    token: &ETH,
                    contract: None,
                }
            }
            _ => return Err(Error::InvalidLength),
        };

        transfers.push(transfer).map_err(|_| Error::InvalidLength)?;

        let path = DerivationPath::from_slice(ctx.path)?;

        Ok(ChainTransaction::Account(AccountTx {
            from,
            transfers,
            fee,
            raw_data,
            memo: None,
            input: SigningInput {
                path,
                message: *ctx.digest,
                scheme: Scheme::EcdsaRecoverable,
                suffix: None,
            },
            window,
        }))
    }

    fn prepare_message(&self, req: &MessageRequest, _node: &KeyNode) -> Result<PreparedMessage, Error> {
        let mut len = String::<20>::new();
        write!(&mut len, "{}", req.message.len()).map_err(|_| Error::EncodingFailed)?;

        let mut h = Keccak256::new();
        h.update(PERSONAL_PREFIX);
        h.update(len.as_bytes());
        h.update(req.message);

        Ok(PreparedMessage {
            data: Vec::from_slice(&h.finalize()).map_err(|_| Error::InvalidLength)?,
            scheme: Scheme::EcdsaRecoverable,
            encoding: MessageEncoding::EthereumPersonal,
        })
    }
}

#[cfg(test)]
mod test {
    use hwsign_apdu::app_info::CurveFlags;

    use super::*;
    use crate::{
        chain::Subpayload,
        keychain::{Keychain, HARDENED},
    };

    /// BIP-39 seed for `abandon x11 about`, empty passphrase
    const SEED: &str = "5eb00bbddcf069084889a8ab9155568165f5c453ccb85e70811aaed6f6da5fc19a5ac40b389cd370d086206dec8aa6c43daea6690f20ad3d8d48b2d2ce9e38e4";

    const PATH: &[u32] = &[44 | HARDENED, 60 | HARDENED, HARDENED, 0, 0];

    /// Encode a legacy EIP-155 transaction for signing
    fn legacy_tx(gas_price: u64, to: &[u8], value: u128, data: &[u8], chain_id: u64) -> std::vec::Vec<u8> {
        let mut s = ::rlp::RlpStream::new_list(9);
        s.append(&9u64)
            .append(&gas_price)
            .append(&21_000u64)
            .append(&to.to_vec())
            .append(&value)
            .append(&data.to_vec())
            .append(&chain_id)
            .append_empty_data()
            .append_empty_data();
        s.out().to_vec()
    }

    fn decode_with<'a>(payload: &'a [u8], seed: &[u8], digest: &[u8; 32]) -> Result<ChainTransaction<'a>, Error> {
        let keychain = Keychain::new(seed, CurveFlags::all());
        let ctx = DecodeContext {
            keychain: &keychain,
            path: PATH,
            chain_id: 0,
            digest,
        };
        Ethereum.decode(payload, &ctx)
    }

    #[test]
    fn address_vector() {
        let seed = hex::decode(SEED).unwrap();
        let k = Keychain::new(&seed, CurveFlags::all());
        let n = k.derive(PATH, Curve::Secp256k1).unwrap();

        assert_eq!(
            Ethereum.address(&n, PATH, 1).unwrap().as_str(),
            "0x9858EfFD232B4033E47d90003D41EC34EcaEda94"
        );
    }

    #[test]
    fn decode_native_transfer() {
        let seed = hex::decode(SEED).unwrap();
        let mut to = [0u8; 20];
        to[19] = 0x01;

        let value = 10u128.pow(18);
        let tx = legacy_tx(20_000_000_000, &to, value, &[], 1);
        let digest = keccak256(&tx);

        let t = decode_with(&tx, &seed, &digest).unwrap();

        assert_eq!(t.transfers().len(), 1);
        assert_eq!(
            t.transfers()[0].recipient.as_str(),
            "0x0000000000000000000000000000000000000001"
        );
        assert_eq!(t.transfers()[0].amount, U256::from(value));
        assert_eq!(t.inputs()[0].message, digest);

        let s = Ethereum.describe_for_ui(&t, Subpayload::None).unwrap();
        assert_eq!(s.transfers[0].amount.as_str(), "1.0 ETH");
        assert_eq!(s.fee.as_str(), "0.00042 ETH");
        assert!(s.raw_data.is_empty());
    }

    #[test]
    fn decode_erc20_transfer() {
        let seed = hex::decode(SEED).unwrap();

        let mut data = [0u8; 68];
        data[..4].copy_from_slice(&ERC20_TRANSFER);
        data[35] = 0x22;
        data[65..].copy_from_slice(&[0x07, 0xa1, 0x20]);

        // Unknown contract
        let tx = legacy_tx(1, &[0x11; 20], 0, &data, 1);
        let t = decode_with(&tx, &seed, &[0u8; 32]).unwrap();

        let s = Ethereum.describe_for_ui(&t, Subpayload::None).unwrap();
        assert_eq!(s.transfers[0].amount.as_str(), "500000 units");
        assert!(s.transfers[0].unknown_contract.is_some());
        assert!(s.raw_data.is_empty());

        // USDT
        let usdt = hex::decode("dac17f958d2ee523a2206206994597c13d831ec7").unwrap();
        let tx = legacy_tx(1, &usdt, 0, &data, 1);
        let t = decode_with(&tx, &seed, &[0u8; 32]).unwrap();

        let s = Ethereum.describe_for_ui(&t, Subpayload::None).unwrap();
        assert_eq!(s.transfers[0].amount.as_str(), "0.5 USDT");
        assert_eq!(s.transfers[0].unknown_contract, None);
    }

    #[test]
    fn decode_contract_creation() {
        let seed = hex::decode(SEED).unwrap();
        let code = [0x60, 0x80, 0x60, 0x40, 0x52];

        let tx = legacy_tx(1, &[], 0, &code, 1);
        let t = decode_with(&tx, &seed, &[0u8; 32]).unwrap();

        let w = t.window().unwrap();
        assert_eq!(w.kind, SubpayloadKind::ContractBytecode);
        assert_eq!(&tx[w.offset..][..w.length], &code);
        assert_eq!(t.transfers()[0].recipient.as_str(), NEW_CONTRACT);
    }

    #[test]
    fn decode_eip1559_transfer() {
        let seed = hex::decode(SEED).unwrap();

        // [1, 0, 1 gwei, 2 gwei, 21000, 0x22.., 1 wei, "", []]
        let mut body = std::vec![0x01, 0x80, 0x84, 0x3b, 0x9a, 0xca, 0x00, 0x84, 0x77, 0x35, 0x94, 0x00, 0x82, 0x52, 0x08, 0x94];
        body.extend_from_slice(&[0x22; 20]);
        body.extend_from_slice(&[0x01, 0x80, 0xc0]);

        let mut tx = std::vec![EIP1559_TX_TYPE, 0xc0 + body.len() as u8];
        tx.extend_from_slice(&body);

        let t = decode_with(&tx, &seed, &[0u8; 32]).unwrap();
        assert_eq!(t.transfers()[0].amount, U256::from(1));
        assert_eq!(*t.fee(), U256::from(21_000u64 * 2_000_000_000));

        // Unsupported transaction type
        tx[0] = 0x01;
        assert_eq!(
            decode_with(&tx, &seed, &[0u8; 32]),
            Err(Error::UnknownVariant)
        );
    }

    #[test]
    fn decode_errors() {
        let seed = hex::decode(SEED).unwrap();
        let tx = legacy_tx(1, &[0x22; 20], 0, &[], 1);

        // Trailing bytes
        let mut t = tx.clone();
        t.push(0x00);
        assert_eq!(decode_with(&t, &seed, &[0u8; 32]), Err(Error::TrailingData));

        // Truncated
        assert_eq!(
            decode_with(&tx[..tx.len() - 4], &seed, &[0u8; 32]),
            Err(Error::CodecUnderflow)
        );

        // Invalid recipient length
        let t = legacy_tx(1, &[0x22; 19], 0, &[], 1);
        assert_eq!(decode_with(&t, &seed, &[0u8; 32]), Err(Error::InvalidLength));
    }

    #[test]
    fn personal_message_digest() {
        let seed = hex::decode(SEED).unwrap();
        let k = Keychain::new(&seed, CurveFlags::all());
        let n = k.derive(PATH, Curve::Secp256k1).unwrap();

        let req = MessageRequest {
            message: b"hello",
            domain: None,
            version: 0,
            format: 0,
        };
        let p = Ethereum.prepare_message(&req, &n).unwrap();

        assert_eq!(p.data.as_slice(), &keccak256(b"\x19Ethereum Signed Message:\n5hello"));
        assert_eq!(p.encoding, MessageEncoding::EthereumPersonal);
    }
}
