// Copyright (c) 2022-2023 The MobileCoin Foundation

use encdec::Encode;
use heapless::Vec;

use hwsign_apdu::{
    prelude::*, ApduError, HWS_PROTO_VERSION, MAX_SIGNATURES,
};

use crate::{
    chain::AddressStr,
    consts::{APP_NAME, APP_VERSION},
    signer::{Signature, MAX_SIGNATURE_LEN},
};

/// [`Engine`][super::Engine] outputs (in response to events), typically encoded to response [APDUs][crate::apdu]
#[derive(Clone, PartialEq, Debug)]
pub enum Output {
    None,

    /// Application info
    Info {
        flags: AppFlags,
        curves: CurveFlags,
        root_fingerprint: u32,
    },

    /// Derived address
    Address {
        path: DerivationPath,
        address: AddressStr,
        public_key: Vec<u8, 33>,
    },

    /// Request the next payload chunk
    ChunkRequest {
        length: u32,
    },

    /// Request the next piece of the declared sub-payload
    SubpayloadRequest {
        kind: SubpayloadKind,
        total: u32,
        offset: u32,
        length: u32,
    },

    /// Signed transaction
    Signed {
        address: AddressStr,
        signatures: Vec<Signature, MAX_SIGNATURES>,
    },

    /// Signed message
    MessageSignature {
        address: AddressStr,
        signature: Vec<u8, MAX_SIGNATURE_LEN>,
    },

    /// Request acknowledged
    Ack,
}

impl Output {
    /// Encode an [`Output`] object to a response [APDU]
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        match self {
            Output::None => Ok(0),
            Output::Info {
                flags,
                curves,
                root_fingerprint,
            } => InfoResp::new(
                HWS_PROTO_VERSION,
                APP_NAME,
                APP_VERSION,
                *flags,
                *curves,
                *root_fingerprint,
            )
            .encode(buff),
            Output::Address {
                path,
                address,
                public_key,
            } => AddressResp {
                path: path.clone(),
                address,
                public_key,
            }
            .encode(buff),
            Output::ChunkRequest { length } => ChunkRequestResp { length: *length }.encode(buff),
            Output::SubpayloadRequest {
                kind,
                total,
                offset,
                length,
            } => SubpayloadRequestResp {
                kind: *kind,
                total: *total,
                offset: *offset,
                length: *length,
            }
            .encode(buff),
            Output::Signed {
                address,
                signatures,
            } => {
                let mut s = Vec::<&[u8], MAX_SIGNATURES>::new();
                for sig in signatures {
                    s.push(&sig.bytes).map_err(|_| ApduError::InvalidLength)?;
                }

                SignedResp {
                    address,
                    signatures: s,
                }
                .encode(buff)
            }
            Output::MessageSignature { address, signature } => {
                MessageSignatureResp { signature, address }.encode(buff)
            }
            Output::Ack => AckResp.encode(buff),
        }
    }

    /// Check whether the output suspends a request pending host input
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            Output::ChunkRequest { .. } | Output::SubpayloadRequest { .. }
        )
    }
}
