use hwsign_core::apdu::ChainTag;

mod helpers;
use helpers::*;

/// BIP-0084 / BIP-0086 account zero for the shared test mnemonic
const ADDRESSES: &[(&str, &str)] = &[
    ("m/44'/0'/0'/0/0", "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA"),
    ("m/84'/0'/0'/0/0", "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu"),
    (
        "m/86'/0'/0'/0/0",
        "bc1p5cyxnuxmeuwuvkwfem96lqzszd02n6xdcjrs20cac6yqjjwudpxqkedrcr",
    ),
];

#[tokio::test(flavor = "multi_thread")]
async fn btc_addresses() -> anyhow::Result<()> {
    init_logging();

    let e = TestEngine::with_mnemonic();

    for (path, expected) in ADDRESSES {
        hwsign_tests::address::test(e.clone(), ChainTag::Bitcoin, path, 0, true, expected).await?;
    }

    let screens = e.take_screens();
    assert_eq!(screens.len(), ADDRESSES.len());
    assert!(screens.iter().all(|s| s.starts_with("Address(Bitcoin")));

    Ok(())
}
