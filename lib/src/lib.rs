// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Hardware wallet signing API Library
//!
//! Provides a [DeviceHandle] for issuing address, transaction and message
//! signing requests to a device via an [Exchange] transport. Transactions
//! are split into chunks and sub-payload requests answered automatically,
//! see [hwsign_apdu] for the underlying protocol.

/// Transports and the [Exchange] abstraction
pub mod transport;
pub use transport::Exchange;

/// Re-export `hwsign-apdu` for consumers
pub use hwsign_apdu::{self as apdu};

mod handle;
pub use handle::{Address, AppInfo, DeviceHandle, MessageSignature, SignedTx, TxRequest};

mod error;
pub use error::Error;

/// TCP device handle
#[cfg(feature = "transport_tcp")]
pub type TcpHandle = DeviceHandle<transport::TransportTcp>;

#[cfg(feature = "transport_tcp")]
impl TcpHandle {
    /// Connect to a device (or emulator) via TCP
    pub async fn connect(opts: transport::TcpOptions) -> Result<Self, Error<std::io::Error>> {
        let t = transport::TransportTcp::new(opts)
            .await
            .map_err(Error::Transport)?;

        Ok(Self::from(t))
    }
}
