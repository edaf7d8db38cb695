// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Static token tables
//!
//! Tokens are keyed by `(namespace, contract)`, lookups for tokens not in
//! the table return [`UNKNOWN`]. Amounts for unknown tokens are rendered
//! as raw units, decimals are never guessed.

use const_decoder::Decoder;

/// Token lookup namespace
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Namespace {
    /// Ethereum compatible chain, by EIP-155 chain id
    Ethereum(u64),
    /// Alephium mainnet
    Alephium,
    /// Native assets without a contract
    Native,
}

/// Token kind
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TokenKind {
    Native,
    Erc20,
    AlephiumToken,
    Unknown,
}

/// Token information for rendering / display
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct TokenDescriptor {
    pub symbol: &'static str,
    pub decimals: u8,
    pub namespace: Namespace,
    pub address: &'static [u8],
    pub kind: TokenKind,
}

impl TokenDescriptor {
    pub fn is_unknown(&self) -> bool {
        self.kind == TokenKind::Unknown
    }
}

/// Sentinel for tokens not present in the tables
pub const UNKNOWN: TokenDescriptor = TokenDescriptor {
    symbol: "",
    decimals: 0,
    namespace: Namespace::Native,
    address: &[],
    kind: TokenKind::Unknown,
};

pub const BTC: TokenDescriptor = native("BTC", 8);
pub const ETH: TokenDescriptor = native("ETH", 18);
pub const ALPH: TokenDescriptor = native("ALPH", 18);
pub const SOL: TokenDescriptor = native("SOL", 9);

const fn native(symbol: &'static str, decimals: u8) -> TokenDescriptor {
    TokenDescriptor {
        symbol,
        decimals,
        namespace: Namespace::Native,
        address: &[],
        kind: TokenKind::Native,
    }
}

const fn erc20(symbol: &'static str, decimals: u8, address: &'static [u8]) -> TokenDescriptor {
    TokenDescriptor {
        symbol,
        decimals,
        namespace: Namespace::Ethereum(1),
        address,
        kind: TokenKind::Erc20,
    }
}

const fn alph(symbol: &'static str, decimals: u8, id: &'static [u8]) -> TokenDescriptor {
    TokenDescriptor {
        symbol,
        decimals,
        namespace: Namespace::Alephium,
        address: id,
        kind: TokenKind::AlephiumToken,
    }
}

const USDT_ETH: [u8; 20] = Decoder::Hex.decode(b"dac17f958d2ee523a2206206994597c13d831ec7");
const USDC_ETH: [u8; 20] = Decoder::Hex.decode(b"a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
const DAI_ETH: [u8; 20] = Decoder::Hex.decode(b"6b175474e89094c44da98b954eedeac495271d0f");
const WETH_ETH: [u8; 20] = Decoder::Hex.decode(b"c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
const LINK_ETH: [u8; 20] = Decoder::Hex.decode(b"514910771af9ca656af840dff83e8264ecf986ca");

const USDT_ALPH: [u8; 32] =
    Decoder::Hex.decode(b"556d9582463fe44fbd108aedc9f409f69086dc78d994b88ea6c9e65f8bf98e00");
const WETH_ALPH: [u8; 32] =
    Decoder::Hex.decode(b"19246e8c2899bc258a1156e08466e3cdd3323da756d8a543c7fc911847b96f00");
const AYIN_ALPH: [u8; 32] =
    Decoder::Hex.decode(b"1a281053ba8601a658368594da034c2e99a0fb951b86498d05e76aedfe666800");

/// Known tokens
pub const TOKENS: &[TokenDescriptor] = &[
    erc20("USDT", 6, &USDT_ETH),
    erc20("USDC", 6, &USDC_ETH),
    erc20("DAI", 18, &DAI_ETH),
    erc20("WETH", 18, &WETH_ETH),
    erc20("LINK", 18, &LINK_ETH),
    alph("USDT", 6, &USDT_ALPH),
    alph("WETH", 18, &WETH_ALPH),
    alph("AYIN", 18, &AYIN_ALPH),
];

/// Lookup a token by namespace and contract address / token id
pub fn lookup(namespace: Namespace, contract: &[u8]) -> &'static TokenDescriptor {
    TOKENS
        .iter()
        .find(|t| t.namespace == namespace && t.address == contract)
        .unwrap_or(&UNKNOWN)
}
