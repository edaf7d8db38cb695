// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Persistent device configuration
//!
//! The engine reads and updates a [`DeviceRecord`] through the [`Storage`]
//! trait, platforms back this with flash. [`MemStorage`] provides an
//! in-memory implementation for hosts and tests.

use heapless::Vec;
use strum::{Display, EnumString};
use zeroize::Zeroize;

use crate::{consts::DEFAULT_CACHE_TIME_MS, engine::Error};

/// Maximum stored mnemonic length
pub const MNEMONIC_MAX_LEN: usize = 256;

/// Maximum passphrase length
pub const PASSPHRASE_MAX_LEN: usize = 64;

/// Fixed capacity secret bytes, zeroized on drop
#[derive(Clone, Default, PartialEq)]
pub struct SecretBytes<const N: usize>(Vec<u8, N>);

impl<const N: usize> SecretBytes<N> {
    pub fn new(v: &[u8]) -> Result<Self, Error> {
        Vec::from_slice(v)
            .map(Self)
            .map_err(|_| Error::InvalidLength)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Fetch contents as a UTF-8 string
    pub fn as_str(&self) -> Result<&str, Error> {
        core::str::from_utf8(&self.0).map_err(|_| Error::InvalidKey)
    }
}

impl<const N: usize> Drop for SecretBytes<N> {
    fn drop(&mut self) {
        self.0.as_mut_slice().zeroize();
    }
}

impl<const N: usize> core::fmt::Debug for SecretBytes<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "SecretBytes({})", self.0.len())
    }
}

/// Mnemonic phrase storage
pub type Mnemonic = SecretBytes<MNEMONIC_MAX_LEN>;

/// Passphrase storage
pub type Passphrase = SecretBytes<PASSPHRASE_MAX_LEN>;

/// PIN verifier (PBKDF2 output), the PIN itself is never stored
pub type PinVerifier = [u8; 32];

/// Path safety check mode
#[derive(Copy, Clone, PartialEq, Debug, Display, EnumString)]
pub enum SafetyChecks {
    /// Reject paths not matching a chain schema
    Strict,
    /// Accept non-standard paths after a warning screen
    PromptTemporarily,
}

/// User configurable device settings
#[derive(Clone, PartialEq, Debug)]
pub struct Settings {
    /// Skip overview / details screens for non-QR requests
    pub turbo_mode: bool,
    pub safety_checks: SafetyChecks,
    /// Time an unlocked session remains valid without re-prompting
    pub cache_time_ms: u64,
    /// Re-prompt on PIN mismatch rather than failing the request
    pub pin_retry: bool,
    /// Request a passphrase on unlock
    pub passphrase_enabled: bool,
    /// Combine the PIN with an SD card salt
    pub sd_protect: bool,
    /// Allow fingerprint unlock following a PIN unlock
    pub fingerprint_unlock: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            turbo_mode: false,
            safety_checks: SafetyChecks::Strict,
            cache_time_ms: DEFAULT_CACHE_TIME_MS,
            pin_retry: true,
            passphrase_enabled: false,
            sd_protect: false,
            fingerprint_unlock: false,
        }
    }
}

/// PIN bound to a hidden wallet passphrase
#[derive(Clone, PartialEq, Debug)]
pub struct PassphrasePin {
    pub verifier: PinVerifier,
    pub passphrase: Passphrase,
}

/// Persisted device record
#[derive(Clone, PartialEq, Debug, Default)]
pub struct DeviceRecord {
    pub mnemonic: Option<Mnemonic>,

    /// Regular PIN verifier
    pub pin: Option<PinVerifier>,
    /// PIN verifiers bound to passphrases
    pub passphrase_pins: Vec<PassphrasePin, 4>,
    /// Wipe code verifier
    pub wipe_code: Option<PinVerifier>,
    /// Per-device PIN verifier salt
    pub pin_salt: [u8; 32],
    /// Consecutive failed PIN attempts
    pub pin_fails: u32,

    /// Backup uses an extendable share format, reported via device info
    pub extendable_backup: bool,
    pub settings: Settings,
}

impl DeviceRecord {
    /// Create a record holding the provided mnemonic
    pub fn with_mnemonic(mnemonic: &str) -> Result<Self, Error> {
        Ok(Self {
            mnemonic: Some(Mnemonic::new(mnemonic.as_bytes())?),
            ..Default::default()
        })
    }

    /// Whether a PIN is configured
    pub fn has_pin(&self) -> bool {
        self.pin.is_some()
    }

    /// Erase all secrets and reset settings
    pub fn wipe(&mut self) {
        self.pin_salt.zeroize();
        if let Some(p) = self.pin.as_mut() {
            p.zeroize();
        }
        if let Some(p) = self.wipe_code.as_mut() {
            p.zeroize();
        }
        for p in self.passphrase_pins.iter_mut() {
            p.verifier.zeroize();
        }

        *self = Self::default();
    }
}

/// Persistent storage for the [`DeviceRecord`]
pub trait Storage {
    /// Fetch the current record
    fn record(&self) -> &DeviceRecord;

    /// Fetch the record for modification, changes are persisted on [`Storage::commit`]
    fn record_mut(&mut self) -> &mut DeviceRecord;

    /// Persist the record
    fn commit(&mut self) -> Result<(), Error>;
}

impl<T: Storage> Storage for &mut T {
    fn record(&self) -> &DeviceRecord {
        T::record(self)
    }

    fn record_mut(&mut self) -> &mut DeviceRecord {
        T::record_mut(self)
    }

    fn commit(&mut self) -> Result<(), Error> {
        T::commit(self)
    }
}

/// In-memory [`Storage`] implementation
#[derive(Clone, Debug, Default)]
pub struct MemStorage {
    record: DeviceRecord,
    commits: usize,
}

impl MemStorage {
    pub fn new(record: DeviceRecord) -> Self {
        Self { record, commits: 0 }
    }

    /// Number of commits performed
    pub fn commits(&self) -> usize {
        self.commits
    }
}

impl Storage for MemStorage {
    fn record(&self) -> &DeviceRecord {
        &self.record
    }

    fn record_mut(&mut self) -> &mut DeviceRecord {
        &mut self.record
    }

    fn commit(&mut self) -> Result<(), Error> {
        self.commits += 1;
        Ok(())
    }
}
