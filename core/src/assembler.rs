// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Chunked payload assembly
//!
//! Payloads larger than the initial chunk are streamed from the host via
//! strictly serialized chunk requests. A running hash is maintained while
//! assembling and checked against a hash recomputed over the buffer before
//! the payload is released for decoding.

use heapless::Vec;
use sha2::{Digest, Sha256};
use sha3::Keccak256;
use zeroize::Zeroize;

use hwsign_apdu::tx::SubpayloadKind;

use crate::{
    consts::{CHUNK_SIZE, MAX_PAYLOAD_LEN},
    engine::Error,
    helpers::Blake2b256,
};

/// Payload hash algorithms
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum HashKind {
    Keccak256,
    Blake2b256,
    Sha256,
}

/// Running payload hasher
#[derive(Clone)]
enum Hasher {
    Keccak256(Keccak256),
    Blake2b256(Blake2b256),
    Sha256(Sha256),
}

impl Hasher {
    fn new(kind: HashKind) -> Self {
        match kind {
            HashKind::Keccak256 => Hasher::Keccak256(Keccak256::new()),
            HashKind::Blake2b256 => Hasher::Blake2b256(Blake2b256::new()),
            HashKind::Sha256 => Hasher::Sha256(Sha256::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Keccak256(h) => h.update(data),
            Hasher::Blake2b256(h) => h.update(data),
            Hasher::Sha256(h) => h.update(data),
        }
    }

    fn finalize(self) -> [u8; 32] {
        match self {
            Hasher::Keccak256(h) => h.finalize().into(),
            Hasher::Blake2b256(h) => h.finalize().into(),
            Hasher::Sha256(h) => h.finalize().into(),
        }
    }

    fn kind(&self) -> HashKind {
        match self {
            Hasher::Keccak256(_) => HashKind::Keccak256,
            Hasher::Blake2b256(_) => HashKind::Blake2b256,
            Hasher::Sha256(_) => HashKind::Sha256,
        }
    }
}

/// Compute a one-shot payload hash
pub fn payload_hash(kind: HashKind, data: &[u8]) -> [u8; 32] {
    let mut h = Hasher::new(kind);
    h.update(data);
    h.finalize()
}

/// Byte window within the assembled payload delivered separately
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Window {
    pub kind: SubpayloadKind,
    pub offset: usize,
    pub length: usize,
}

/// Chunked payload assembler
pub struct Assembler {
    buff: Vec<u8, MAX_PAYLOAD_LEN>,
    total: usize,
    requested: Option<usize>,
    hasher: Option<Hasher>,
    window: Option<Window>,
    /// Sub-payload bytes received and checked against the window
    window_received: usize,
    window_requested: Option<usize>,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler {
    pub const fn new() -> Self {
        Self {
            buff: Vec::new(),
            total: 0,
            requested: None,
            hasher: None,
            window: None,
            window_received: 0,
            window_requested: None,
        }
    }

    /// Start assembly with the initial chunk and declared total length
    /// (`0` where the initial chunk is the whole payload)
    pub fn start(&mut self, initial: &[u8], total: usize, hash: HashKind) -> Result<(), Error> {
        self.clear();

        let total = match total {
            0 => initial.len(),
            t => t,
        };

        if total < initial.len() || total > MAX_PAYLOAD_LEN {
            return Err(Error::InvalidLength);
        }

        self.total = total;
        self.buff
            .extend_from_slice(initial)
            .map_err(|_| Error::InvalidLength)?;

        let mut h = Hasher::new(hash);
        h.update(initial);
        self.hasher = Some(h);

        Ok(())
    }

    /// Bytes remaining to be received
    pub fn remaining(&self) -> usize {
        self.total - self.buff.len()
    }

    /// Whether all declared bytes have been received
    pub fn is_complete(&self) -> bool {
        self.hasher.is_some() && self.remaining() == 0
    }

    /// Issue the next chunk request, `None` once complete
    pub fn next_request(&mut self) -> Option<usize> {
        match self.remaining() {
            0 => None,
            r => {
                let n = r.min(CHUNK_SIZE);
                self.requested = Some(n);
                Some(n)
            }
        }
    }

    /// Outstanding chunk request length
    pub fn requested(&self) -> Option<usize> {
        self.requested
    }

    /// Accept a chunk in response to the outstanding request
    pub fn ack(&mut self, data: &[u8]) -> Result<(), Error> {
        let n = self.requested.take().ok_or(Error::UnexpectedEvent)?;

        if data.len() < n {
            #[cfg(feature = "log")]
            log::warn!("chunk truncated ({} of {} bytes)", data.len(), n);

            return Err(Error::PayloadTruncated);
        }
        if data.len() > n {
            return Err(Error::InvalidLength);
        }

        let h = self.hasher.as_mut().ok_or(Error::UnexpectedEvent)?;
        h.update(data);

        self.buff
            .extend_from_slice(data)
            .map_err(|_| Error::InvalidLength)
    }

    /// Complete assembly, returning the payload digest
    ///
    /// Fails with [`Error::PayloadTruncated`] if bytes remain outstanding
    /// and [`Error::HashMismatch`] if the running hash does not match the
    /// assembled buffer.
    pub fn finish(&mut self) -> Result<[u8; 32], Error> {
        if self.remaining() != 0 {
            return Err(Error::PayloadTruncated);
        }

        let h = self.hasher.take().ok_or(Error::UnexpectedEvent)?;
        let kind = h.kind();
        let running = h.finalize();

        if running != payload_hash(kind, &self.buff) {
            #[cfg(feature = "log")]
            log::error!("payload hash mismatch");

            return Err(Error::HashMismatch);
        }

        Ok(running)
    }

    /// Assembled payload
    pub fn payload(&self) -> &[u8] {
        &self.buff
    }

    /// Declare a sub-payload window within the assembled payload
    pub fn set_window(&mut self, window: Window) -> Result<(), Error> {
        match window.offset.checked_add(window.length) {
            Some(end) if end <= self.buff.len() => {
                self.window = Some(window);
                self.window_received = 0;
                self.window_requested = None;
                Ok(())
            }
            _ => Err(Error::InvalidLength),
        }
    }

    /// Declared sub-payload window
    pub fn window(&self) -> Option<Window> {
        self.window
    }

    /// Issue the next sub-payload request as `(offset, length)` within
    /// the window, `None` once the window has been received
    pub fn next_subpayload(&mut self) -> Option<(usize, usize)> {
        let w = self.window?;

        match w.length - self.window_received {
            0 => None,
            r => {
                let n = r.min(CHUNK_SIZE);
                self.window_requested = Some(n);
                Some((self.window_received, n))
            }
        }
    }

    /// Accept a sub-payload piece in response to the outstanding request,
    /// checking it against the assembled payload
    ///
    /// Returns `false` where the host skipped the (optional) sub-payload,
    /// signalled by an empty response to the first request.
    pub fn subpayload_ack(&mut self, data: &[u8]) -> Result<bool, Error> {
        let w = self.window.ok_or(Error::UnexpectedEvent)?;
        let n = self.window_requested.take().ok_or(Error::UnexpectedEvent)?;

        if data.is_empty() && self.window_received == 0 {
            return Ok(false);
        }
        if data.len() < n {
            return Err(Error::PayloadTruncated);
        }
        if data.len() > n {
            return Err(Error::InvalidLength);
        }

        if &self.buff[w.offset + self.window_received..][..n] != data {
            #[cfg(feature = "log")]
            log::warn!("sub-payload mismatch at offset {}", self.window_received);

            return Err(Error::SubpayloadMismatch);
        }

        self.window_received += n;
        Ok(true)
    }

    /// Clear assembler state, zeroizing the buffer
    pub fn clear(&mut self) {
        self.buff.as_mut_slice().zeroize();
        self.buff.clear();
        self.total = 0;
        self.requested = None;
        self.hasher = None;
        self.window = None;
        self.window_received = 0;
        self.window_requested = None;
    }
}
