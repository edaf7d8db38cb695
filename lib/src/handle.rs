// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Handle for connected signing devices
//!
//! This provides methods for interacting with the device
//! and is generic over [Exchange] transports

use std::{fmt::Debug, sync::Arc, time::Duration};

use encdec::{Decode, Encode};
use log::{debug, warn};
use tokio::sync::Mutex;

use hwsign_apdu::{prelude::*, MAX_CHUNK_LEN};

use crate::{Error, Exchange};

/// Response buffer length, sufficient for [SignedResp] with [MAX_SIGNATURES][hwsign_apdu::MAX_SIGNATURES]
const RESP_BUFF_LEN: usize = 4096;

/// Signing handle for a connected [Exchange] transport.
///
/// Requests are serialised across clones of the handle, with a
/// transaction holding the transport until it completes.
#[derive(Clone)]
pub struct DeviceHandle<T: Exchange> {
    /// Transport for communication
    t: Arc<Mutex<T>>,
    /// Timeout for requests requiring user interaction
    user_timeout: Duration,
    /// Timeout for APDU requests
    request_timeout: Duration,
    /// Expected root fingerprint (zero to disable)
    fingerprint: u32,
}

/// Create a [DeviceHandle] wrapper from a type implementing [Exchange]
impl<T: Exchange> From<T> for DeviceHandle<T> {
    fn from(t: T) -> Self {
        Self {
            t: Arc::new(Mutex::new(t)),
            user_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(2),
            fingerprint: 0,
        }
    }
}

/// Application information
#[derive(Clone, Debug, PartialEq)]
pub struct AppInfo {
    pub app_name: String,
    pub app_version: String,
    pub protocol_version: u8,
    pub flags: AppFlags,
    pub curves: CurveFlags,
    pub root_fingerprint: u32,
}

/// Address derived by the device
#[derive(Clone, Debug, PartialEq)]
pub struct Address {
    pub path: DerivationPath,
    pub address: String,
    pub public_key: Vec<u8>,
}

/// Signed transaction, one signature per input
#[derive(Clone, Debug, PartialEq)]
pub struct SignedTx {
    pub address: String,
    pub signatures: Vec<Vec<u8>>,
}

/// Signed message
#[derive(Clone, Debug, PartialEq)]
pub struct MessageSignature {
    pub address: String,
    pub signature: Vec<u8>,
}

/// Transaction signing request
#[derive(Clone, Debug, PartialEq)]
pub struct TxRequest<'a> {
    pub chain: ChainTag,
    pub path: DerivationPath,
    pub chain_id: u64,
    pub flags: SignTxFlags,
    /// Serialized transaction payload
    pub payload: &'a [u8],
    /// Sub-payload provided on request, otherwise only a digest is displayed
    pub subpayload: Option<&'a [u8]>,
}

impl<'a> TxRequest<'a> {
    pub fn new(chain: ChainTag, path: DerivationPath, payload: &'a [u8]) -> Self {
        Self {
            chain,
            path,
            chain_id: 0,
            flags: SignTxFlags::empty(),
            payload,
            subpayload: None,
        }
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn with_flags(mut self, flags: SignTxFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_subpayload(mut self, subpayload: &'a [u8]) -> Self {
        self.subpayload = Some(subpayload);
        self
    }
}

/// Timeout class for a request
#[derive(Copy, Clone, PartialEq, Debug)]
enum Wait {
    Request,
    User,
}

impl<T: Exchange + Send + Sync> DeviceHandle<T> {
    /// Set request and user interaction timeouts
    pub fn with_timeouts(mut self, request: Duration, user: Duration) -> Self {
        self.request_timeout = request;
        self.user_timeout = user;
        self
    }

    /// Bind requests to the wallet with the provided root fingerprint
    pub fn with_fingerprint(mut self, fingerprint: u32) -> Self {
        self.fingerprint = fingerprint;
        self
    }

    /// Fetch application info
    pub async fn info(&self) -> Result<AppInfo, Error<T::Error>> {
        let t = self.t.lock().await;
        self.info_locked(&t).await
    }

    /// Derive an address, displaying it for confirmation where `show_display` is set
    pub async fn address(
        &self,
        chain: ChainTag,
        path: DerivationPath,
        chain_id: u64,
        show_display: bool,
    ) -> Result<Address, Error<T::Error>> {
        let t = self.t.lock().await;
        let mut buff = [0u8; RESP_BUFF_LEN];

        debug!("Requesting {} address for path: {}", chain, path);

        // Address requests carry no fingerprint, check via info
        if self.fingerprint != 0 {
            self.info_locked(&t).await?;
        }

        let req = AddressReq::new(chain, path, show_display).with_chain_id(chain_id);
        let n = self.exchange(&t, &req, &mut buff, Wait::User).await?;
        let (r, _) = AddressResp::decode(&buff[..n])?;

        Ok(Address {
            path: r.path,
            address: r.address.to_string(),
            public_key: r.public_key.to_vec(),
        })
    }

    /// Sign a transaction, answering chunk and sub-payload requests until
    /// the device completes or rejects the request
    pub async fn sign_tx(&self, tx: &TxRequest<'_>) -> Result<SignedTx, Error<T::Error>> {
        let t = self.t.lock().await;

        let total = match u32::try_from(tx.payload.len()) {
            Ok(n) if n > 0 => n,
            _ => return Err(Error::InvalidLength),
        };

        let r = self.sign_tx_locked(&t, tx, total).await;

        // Abandon any device-side request once signing has started
        if let Err(e) = &r {
            warn!("Signing failed ({}), cancelling request", e);
            let _ = self.cancel_locked(&t).await;
        }

        r
    }

    /// Sign a message using the provided format and (optional) domain
    pub async fn sign_message(
        &self,
        chain: ChainTag,
        path: DerivationPath,
        message: &[u8],
        format: u8,
        domain: Option<[u8; 32]>,
    ) -> Result<MessageSignature, Error<T::Error>> {
        let t = self.t.lock().await;
        let mut buff = [0u8; RESP_BUFF_LEN];

        debug!("Signing {} byte {} message", message.len(), chain);

        let mut req = SignMessageReq::new(chain, path, message)
            .with_format(format)
            .with_fingerprint(self.fingerprint);
        if let Some(d) = domain {
            req = req.with_domain(d);
        }

        let n = self.exchange(&t, &req, &mut buff, Wait::User).await?;
        let (r, _) = MessageSignatureResp::decode(&buff[..n])?;

        Ok(MessageSignature {
            address: r.address.to_string(),
            signature: r.signature.to_vec(),
        })
    }

    /// Cancel any in-flight request
    pub async fn cancel(&self) -> Result<(), Error<T::Error>> {
        let t = self.t.lock().await;
        self.cancel_locked(&t).await
    }

    async fn info_locked(&self, t: &T) -> Result<AppInfo, Error<T::Error>> {
        let mut buff = [0u8; 256];

        debug!("Requesting app info");

        let n = self.exchange(t, &InfoReq {}, &mut buff, Wait::Request).await?;
        let (r, _) = InfoResp::decode(&buff[..n])?;

        let info = AppInfo {
            app_name: r.name.to_string(),
            app_version: r.version.to_string(),
            protocol_version: r.proto,
            flags: r.flags,
            curves: r.curves,
            root_fingerprint: r.root_fingerprint,
        };

        if self.fingerprint != 0
            && info.flags.contains(AppFlags::UNLOCKED)
            && info.root_fingerprint != self.fingerprint
        {
            return Err(Error::WalletMismatch);
        }

        Ok(info)
    }

    async fn sign_tx_locked(
        &self,
        t: &T,
        tx: &TxRequest<'_>,
        total: u32,
    ) -> Result<SignedTx, Error<T::Error>> {
        let mut buff = [0u8; RESP_BUFF_LEN];
        let payload = tx.payload;

        debug!(
            "Starting {} transaction ({} bytes) for path: {}",
            tx.chain, total, tx.path
        );

        // Start with the initial chunk
        let initial = &payload[..payload.len().min(MAX_CHUNK_LEN)];
        let mut offset = initial.len();

        let req = SignTxInit::new(tx.chain, tx.path.clone(), total, initial)
            .with_chain_id(tx.chain_id)
            .with_fingerprint(self.fingerprint)
            .with_flags(tx.flags);
        let mut n = self.exchange(t, &req, &mut buff, Wait::User).await?;

        // Answer requests until signed
        loop {
            match response_kind(&buff[..n])? {
                ResponseKind::ChunkRequest => {
                    let (r, _) = ChunkRequestResp::decode(&buff[..n])?;
                    let len = r.length as usize;

                    if len == 0 || len > MAX_CHUNK_LEN || offset + len > payload.len() {
                        warn!("Invalid chunk request: {} bytes at {}", len, offset);
                        return Err(Error::UnexpectedResponse);
                    }

                    debug!("Sending chunk {}..{}", offset, offset + len);

                    let chunk = &payload[offset..][..len];
                    offset += len;

                    n = self
                        .exchange(t, &ChunkAck::new(chunk), &mut buff, Wait::User)
                        .await?;
                }
                ResponseKind::SubpayloadRequest => {
                    let (r, _) = SubpayloadRequestResp::decode(&buff[..n])?;
                    let (offset, len) = (r.offset as usize, r.length as usize);

                    if len > MAX_CHUNK_LEN {
                        warn!("Invalid sub-payload request: {} bytes at {}", len, offset);
                        return Err(Error::UnexpectedResponse);
                    }

                    let data: &[u8] = match (tx.subpayload, offset) {
                        (Some(s), _) if s.len() == r.total as usize => s
                            .get(offset..offset + len)
                            .ok_or(Error::UnexpectedResponse)?,
                        (Some(s), 0) => {
                            warn!(
                                "Sub-payload length mismatch (expected {}, have {}), skipping",
                                r.total,
                                s.len()
                            );
                            &[]
                        }
                        (None, 0) => &[],
                        _ => return Err(Error::UnexpectedResponse),
                    };

                    debug!(
                        "Sending {} sub-payload {}..{} of {}",
                        r.kind,
                        offset,
                        offset + data.len(),
                        r.total
                    );

                    n = self
                        .exchange(t, &SubpayloadAck::new(data), &mut buff, Wait::User)
                        .await?;
                }
                ResponseKind::Signed => {
                    let (r, _) = SignedResp::decode(&buff[..n])?;

                    debug!("Signed with {} signature(s)", r.signatures.len());

                    return Ok(SignedTx {
                        address: r.address.to_string(),
                        signatures: r.signatures.iter().map(|s| s.to_vec()).collect(),
                    });
                }
                _ => return Err(Error::UnexpectedResponse),
            }
        }
    }

    async fn cancel_locked(&self, t: &T) -> Result<(), Error<T::Error>> {
        let mut buff = [0u8; 256];

        debug!("Cancelling request");

        match self.exchange(t, &CancelReq, &mut buff, Wait::Request).await {
            Ok(n) => {
                AckResp::decode(&buff[..n])?;
                Ok(())
            }
            // Cancelled an in-flight request
            Err(Error::UserDenied) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Encode and issue a request, mapping failure responses to errors
    async fn exchange<REQ>(
        &self,
        t: &T,
        req: &REQ,
        buff: &mut [u8],
        wait: Wait,
    ) -> Result<usize, Error<T::Error>>
    where
        REQ: Encode<Error = ApduError> + ApduStatic + Debug,
    {
        let mut req_buff = vec![0u8; req.encode_len()?];
        let req_len = req.encode(&mut req_buff)?;

        let f = t.exchange(REQ::CLA, REQ::INS, &req_buff[..req_len], buff);

        let r = match wait {
            Wait::Request => tokio::time::timeout(self.request_timeout, f).await?,
            Wait::User => tokio::time::timeout(self.user_timeout, f)
                .await
                .map_err(|_| Error::UserTimeout)?,
        };
        let n = r.map_err(Error::Transport)?;

        if let Ok(ResponseKind::Failure) = response_kind(&buff[..n]) {
            let (f, _) = FailureResp::decode(&buff[..n])?;
            debug!("Device failure: {} (0x{:02x})", f.message, f.code);

            return Err(Error::device(f.code, f.message));
        }

        Ok(n)
    }
}
