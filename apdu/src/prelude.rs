//! Prelude to simplify downstream use of APDU objects
//!

pub use crate::{
    address::{AddressFlags, AddressReq, AddressResp},
    app_info::{AppFlags, CurveFlags, InfoReq, InfoResp},
    control::{AckResp, CancelReq, FailureResp},
    message::{MessageSignatureResp, SignMessageReq},
    path::{DerivationPath, HARDENED},
    response_kind,
    tx::{
        ChunkAck, ChunkRequestResp, SignTxFlags, SignTxInit, SignedResp, SubpayloadAck,
        SubpayloadKind, SubpayloadRequestResp,
    },
    ApduError, ApduResponse, ApduStatic, ChainTag, ResponseKind,
};
