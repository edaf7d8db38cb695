//! Transport abstraction for exchanging APDUs with signing devices
//!
// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::{
    fmt::{Debug, Display},
    sync::Arc,
};

use async_trait::async_trait;

#[cfg(feature = "transport_tcp")]
pub use tcp::{TcpOptions, TransportTcp};

/// Exchange encoded request / response APDUs with a device
#[async_trait]
pub trait Exchange {
    type Error: Debug + Display + Send + Sync + 'static;

    /// Issue an encoded request with the provided class and instruction,
    /// writing the response to `resp` and returning the response length
    async fn exchange(
        &self,
        cla: u8,
        ins: u8,
        req: &[u8],
        resp: &mut [u8],
    ) -> Result<usize, Self::Error>;
}

/// [Exchange] implementation for shared transports
#[async_trait]
impl<T: Exchange + Send + Sync> Exchange for Arc<T> {
    type Error = T::Error;

    async fn exchange(
        &self,
        cla: u8,
        ins: u8,
        req: &[u8],
        resp: &mut [u8],
    ) -> Result<usize, Self::Error> {
        self.as_ref().exchange(cla, ins, req, resp).await
    }
}

#[cfg(feature = "transport_tcp")]
mod tcp {
    use std::{
        io::{Error as IoError, ErrorKind},
        net::{IpAddr, Ipv4Addr, SocketAddr},
    };

    use async_trait::async_trait;
    use log::{debug, trace};
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpStream,
        sync::Mutex,
    };

    use super::Exchange;

    /// Status word for successful APDU exchanges
    const SW_OK: [u8; 2] = [0x90, 0x00];

    /// TCP transport options (defaults to a local emulator APDU port)
    #[derive(Clone, Debug, PartialEq)]
    pub struct TcpOptions {
        pub addr: IpAddr,
        pub port: u16,
    }

    impl Default for TcpOptions {
        fn default() -> Self {
            Self {
                addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
                port: 9999,
            }
        }
    }

    /// TCP transport, framing extended-length APDUs with a 4-byte length prefix
    pub struct TransportTcp {
        s: Mutex<TcpStream>,
    }

    impl TransportTcp {
        /// Connect to a device via TCP
        pub async fn new(opts: TcpOptions) -> Result<Self, IoError> {
            debug!("Connecting to {}:{}", opts.addr, opts.port);

            let s = TcpStream::connect(SocketAddr::new(opts.addr, opts.port)).await?;

            Ok(Self { s: Mutex::new(s) })
        }
    }

    #[async_trait]
    impl Exchange for TransportTcp {
        type Error = IoError;

        async fn exchange(
            &self,
            cla: u8,
            ins: u8,
            req: &[u8],
            resp: &mut [u8],
        ) -> Result<usize, Self::Error> {
            let req_len = u16::try_from(req.len())
                .map_err(|_| IoError::new(ErrorKind::InvalidInput, "request too long"))?;

            // Build framed APDU: CLA, INS, P1, P2, extended LC, DATA
            let mut b = Vec::with_capacity(4 + 7 + req.len());
            b.extend_from_slice(&(7 + req.len() as u32).to_be_bytes());
            b.extend_from_slice(&[cla, ins, 0x00, 0x00, 0x00]);
            b.extend_from_slice(&req_len.to_be_bytes());
            b.extend_from_slice(req);

            trace!("tx: {}", hex::encode(&b));

            let mut s = self.s.lock().await;
            s.write_all(&b).await?;

            // Read response length, data and status word
            let mut len = [0u8; 4];
            s.read_exact(&mut len).await?;

            let n = u32::from_be_bytes(len) as usize;
            if n > resp.len() {
                return Err(IoError::new(ErrorKind::InvalidData, "response too long"));
            }
            s.read_exact(&mut resp[..n]).await?;

            let mut sw = [0u8; 2];
            s.read_exact(&mut sw).await?;

            trace!("rx: {} (sw: {})", hex::encode(&resp[..n]), hex::encode(sw));

            if sw != SW_OK {
                return Err(IoError::new(
                    ErrorKind::Other,
                    format!("status 0x{:02x}{:02x}", sw[0], sw[1]),
                ));
            }

            Ok(n)
        }
    }
}
