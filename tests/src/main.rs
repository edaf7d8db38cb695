// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::net::IpAddr;

use clap::{Parser, Subcommand};
use log::{debug, info, LevelFilter};
use strum::{Display, EnumString, EnumVariantNames};

use hwsign::{
    apdu::ChainTag,
    transport::{TcpOptions, TransportTcp},
    Exchange,
};
use hwsign_tests::vectors::*;

/// Test CLI arguments
///
/// Targets MUST be initialised with the shared test mnemonic
#[derive(Clone, Debug, Parser)]
pub struct Opts {
    #[clap(subcommand)]
    pub test: Tests,

    /// Target address (emulator APDU port)
    #[clap(long, default_value = "127.0.0.1", env)]
    pub addr: IpAddr,

    /// Target port
    #[clap(long, default_value = "9999", env)]
    pub port: u16,

    /// Log level
    #[clap(long, default_value = "debug", env)]
    pub log_level: LevelFilter,

    /// Enable logging for transports
    #[clap(long)]
    pub log_transports: bool,
}

/// Test modes
#[derive(Clone, PartialEq, Debug, Subcommand, Display, EnumString, EnumVariantNames)]
#[strum(serialize_all = "snake_case")]
pub enum Tests {
    /// Test ethereum address derivation
    EthAddress {
        /// Display the address for confirmation
        #[clap(long)]
        show: bool,
    },
    /// Test ethereum native transfer signing
    EthTransfer {
        /// Transfer value (wei)
        #[clap(long, default_value = "1000000000000000000")]
        value: u128,
        /// EIP-155 chain id
        #[clap(long, default_value = "1")]
        chain_id: u64,
    },
    /// Test ERC-20 transfer signing
    Erc20Transfer {
        /// Token contract (hex)
        #[clap(long)]
        contract: String,
        /// Transfer amount (token base units)
        #[clap(long, default_value = "500000")]
        amount: u128,
    },
    /// Test ethereum personal message signing
    EthMessage {
        #[clap(long, default_value = "Hello")]
        message: String,
    },
    /// Test solana offchain message signing
    SolanaMessage {
        #[clap(long, default_value = "Hello")]
        message: String,
        /// Offchain message format (0: restricted ASCII, 1: limited UTF-8, 2: extended UTF-8)
        #[clap(long, default_value = "0")]
        format: u8,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load command line options
    let opts = Opts::parse();

    // Setup logging
    let mut c = simplelog::ConfigBuilder::new();
    if !opts.log_transports {
        c.add_filter_ignore_str("hwsign::transport");
    }

    let _ = simplelog::SimpleLogger::init(opts.log_level, c.build());

    debug!("options: {:?}", opts);

    info!("Running test '{}' via {}:{}", opts.test, opts.addr, opts.port);

    // Connect to target and execute test
    let t = TransportTcp::new(TcpOptions {
        addr: opts.addr,
        port: opts.port,
    })
    .await?;

    execute(t, opts.test).await?;

    info!("Test OK!");

    Ok(())
}

/// Execute a test with the provided transport
async fn execute<T>(target: T, test: Tests) -> anyhow::Result<()>
where
    T: Exchange + Send + Sync,
{
    use hwsign_tests::*;

    match test {
        Tests::EthAddress { show } => {
            address::test(target, ChainTag::Ethereum, ETH_PATH, 1, show, ETH_ADDRESS).await?
        }
        Tests::EthTransfer { value, chain_id } => {
            let payload = eth_legacy_tx(
                0,
                20_000_000_000,
                21_000,
                &eth_address_one(),
                value,
                &[],
                chain_id,
            );
            let tx = transaction::TransactionExpectation {
                name: "eth_transfer",
                path: ETH_PATH,
                chain_id,
                payload,
                address: ETH_ADDRESS,
            };
            transaction::test(target, &tx).await?;
        }
        Tests::Erc20Transfer { contract, amount } => {
            let contract = hex::decode(contract.trim_start_matches("0x"))?;
            let data = erc20_transfer(&[0x22; 20], amount);

            let tx = transaction::TransactionExpectation {
                name: "erc20_transfer",
                path: ETH_PATH,
                chain_id: 1,
                payload: eth_legacy_tx(0, 20_000_000_000, 60_000, &contract, 0, &data, 1),
                address: ETH_ADDRESS,
            };
            transaction::test(target, &tx).await?;
        }
        Tests::EthMessage { message: m } => {
            message::eth_personal(target, ETH_PATH, m.as_bytes(), ETH_ADDRESS).await?;
        }
        Tests::SolanaMessage { message: m, format } => {
            message::solana_offchain(target, m.as_bytes(), format, None).await?;
        }
    }

    Ok(())
}
