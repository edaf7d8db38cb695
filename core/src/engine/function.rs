// Copyright (c) 2022-2023 The MobileCoin Foundation

use zeroize::Zeroize;

use hwsign_apdu::{path::DerivationPath, ChainTag};

/// Context for an in-flight transaction signing request
#[derive(Clone, PartialEq, Debug)]
pub struct TxContext {
    pub chain: ChainTag,
    /// Request signing path
    pub path: DerivationPath,
    pub chain_id: u64,
    /// Skip overview / detail screens
    pub turbo: bool,
    /// Path accepted outside of the chain schemas
    pub non_standard: bool,
    /// Payload digest, set once assembly completes
    pub digest: [u8; 32],
}

/// Request context shared between events
pub struct Function {
    inner: FunctionType,
}

impl Default for Function {
    fn default() -> Self {
        Self::new()
    }
}

/// Enum for internal request contexts
enum FunctionType {
    None,
    SignTx(TxContext),
}

impl Function {
    /// Create a new / empty function context
    pub const fn new() -> Self {
        Self {
            inner: FunctionType::None,
        }
    }

    /// Setup transaction signing context
    pub fn tx_init(&mut self, ctx: TxContext) {
        self.clear();
        self.inner = FunctionType::SignTx(ctx);
    }

    /// Fetch the transaction context
    pub fn tx(&self) -> Option<&TxContext> {
        match &self.inner {
            FunctionType::SignTx(t) => Some(t),
            _ => None,
        }
    }

    /// Fetch the transaction context for modification
    pub fn tx_mut(&mut self) -> Option<&mut TxContext> {
        match &mut self.inner {
            FunctionType::SignTx(t) => Some(t),
            _ => None,
        }
    }

    /// Clear function context
    pub fn clear(&mut self) {
        if let FunctionType::SignTx(t) = &mut self.inner {
            t.digest.zeroize();
        }

        self.inner = FunctionType::None;
    }
}
