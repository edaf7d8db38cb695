// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Address derivation tests

use log::info;

use hwsign::{apdu::ChainTag, DeviceHandle, Exchange};

/// Fetch an address from the device and check it matches the expected value
pub async fn test<T>(
    t: T,
    chain: ChainTag,
    path: &str,
    chain_id: u64,
    show_display: bool,
    expected: &str,
) -> anyhow::Result<()>
where
    T: Exchange + Send + Sync,
{
    let d = DeviceHandle::from(t);

    info!("Requesting {} address for path: {}", chain, path);

    let a = d
        .address(chain, path.parse()?, chain_id, show_display)
        .await?;

    info!("received address: '{}'", a.address);

    assert_eq!(a.address, expected, "address mismatch");
    assert_eq!(a.path.to_string(), path, "path mismatch");

    Ok(())
}
