// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Session and PIN gate
//!
//! The [`Session`] owns the seed cache for an unlocked device. Signing and
//! address requests pass through [`Session::unlock`] which prompts for the
//! PIN where required, applies attempt backoff, classifies the entered PIN
//! and derives the seed from the stored mnemonic and passphrase.

use bip39::{Language, Mnemonic, Seed};
use strum::{Display, EnumIter, EnumString, EnumVariantNames};
use zeroize::Zeroizing;

use crate::{
    consts::PIN_MAX_TRIES,
    engine::{Driver, Error, Notice, PinInput},
    storage::{Passphrase, Storage},
};

pub mod pin;
use pin::{backoff_ms, classify, verifier, PinKind};

/// Session state
#[derive(Copy, Clone, PartialEq, Debug, EnumString, Display, EnumVariantNames, EnumIter)]
pub enum SessionState {
    /// No seed available
    Locked,
    /// Unlocked with the standard (or driver supplied) passphrase
    Unlocked,
    /// Unlocked via a passphrase-bound PIN
    PassphraseBound,
}

/// Device session, caching the seed while unlocked
pub struct Session {
    state: SessionState,
    seed: Option<Zeroizing<[u8; 64]>>,
    last_unlock_ms: Option<u64>,
    /// Kind of the last successfully entered PIN, enables fingerprint
    /// unlock into the same wallet
    verified_pin: Option<PinKind>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub const fn new() -> Self {
        Self {
            state: SessionState::Locked,
            seed: None,
            last_unlock_ms: None,
            verified_pin: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Time of the last successful unlock
    pub fn last_unlock_ms(&self) -> Option<u64> {
        self.last_unlock_ms
    }

    /// Fetch the session seed
    pub fn seed(&self) -> Result<&[u8; 64], Error> {
        self.seed.as_deref().ok_or(Error::NotInitialized)
    }

    /// Whether the session holds a seed
    pub fn is_unlocked(&self) -> bool {
        self.seed.is_some()
    }

    /// Lock the session, dropping the seed
    pub fn lock(&mut self) {
        #[cfg(feature = "log")]
        if self.seed.is_some() {
            log::info!("session locked");
        }

        self.seed = None;
        self.last_unlock_ms = None;
        self.state = SessionState::Locked;
    }

    /// Clear the session following a device wipe
    pub fn wipe(&mut self) {
        self.lock();
        self.verified_pin = None;
    }

    /// Ensure the session is unlocked, prompting for the PIN if required
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn unlock<DRV: Driver, S: Storage>(
        &mut self,
        drv: &mut DRV,
        storage: &mut S,
    ) -> Result<(), Error> {
        let record = storage.record();
        if record.mnemonic.is_none() {
            return Err(Error::NotInitialized);
        }

        let now = drv.now_ms();

        // Re-use cached sessions
        if self.seed.is_some() {
            match (record.has_pin(), self.last_unlock_ms) {
                (false, _) => return Ok(()),
                (true, Some(t)) if now.saturating_sub(t) <= record.settings.cache_time_ms => {
                    return Ok(())
                }
                _ => {
                    #[cfg(feature = "log")]
                    log::debug!("session cache expired");

                    self.lock();
                }
            }
        }

        let kind = match record.has_pin() {
            true => self.check_pin(drv, storage)?,
            false => PinKind::Regular,
        };

        let record = storage.record();

        let (passphrase, state) = match kind {
            PinKind::PassphraseBound(p) => (p, SessionState::PassphraseBound),
            _ if record.settings.passphrase_enabled => {
                let p = drv.request_passphrase().ok_or(Error::UserCancelled)?;
                (p, SessionState::Unlocked)
            }
            _ => (Passphrase::default(), SessionState::Unlocked),
        };

        let phrase = record
            .mnemonic
            .as_ref()
            .ok_or(Error::NotInitialized)?
            .as_str()?;

        let mnemonic = Mnemonic::from_phrase(phrase, Language::English).map_err(|_e| {
            #[cfg(feature = "log")]
            log::error!("stored mnemonic invalid");

            Error::InvalidKey
        })?;
        let seed = Seed::new(&mnemonic, passphrase.as_str()?);

        let mut s = Zeroizing::new([0u8; 64]);
        s.copy_from_slice(seed.as_bytes());

        self.seed = Some(s);
        self.state = state;
        self.last_unlock_ms = Some(now);

        #[cfg(feature = "log")]
        log::info!("session unlocked ({})", self.state);

        Ok(())
    }

    /// Prompt for and classify the PIN
    fn check_pin<DRV: Driver, S: Storage>(
        &mut self,
        drv: &mut DRV,
        storage: &mut S,
    ) -> Result<PinKind, Error> {
        loop {
            let fails = storage.record().pin_fails;
            let settings = storage.record().settings.clone();

            if fails >= PIN_MAX_TRIES {
                #[cfg(feature = "log")]
                log::warn!("PIN attempts exhausted, wiping device");

                storage.record_mut().wipe();
                storage.commit()?;
                self.wipe();

                return Err(Error::PinInvalid);
            }

            let wait = backoff_ms(fails);
            if wait > 0 {
                drv.pin_backoff(wait);
            }

            let pin = match drv.request_pin(fails) {
                PinInput::Pin(p) => p,
                PinInput::Fingerprint if settings.fingerprint_unlock => {
                    return self.verified_pin.clone().ok_or(Error::PinCancelled)
                }
                PinInput::Fingerprint | PinInput::Cancel => return Err(Error::PinCancelled),
            };

            let sd_salt = match settings.sd_protect {
                true => Some(drv.sd_salt().ok_or(Error::PinCancelled)?),
                false => None,
            };

            // Count the attempt prior to verification
            storage.record_mut().pin_fails = fails + 1;
            storage.commit()?;

            let v = verifier(pin.as_str()?, sd_salt.as_ref(), &storage.record().pin_salt);

            match classify(storage.record(), &v) {
                Some(PinKind::WipeCode) => {
                    #[cfg(feature = "log")]
                    log::warn!("wipe code entered");

                    storage.record_mut().wipe();
                    storage.commit()?;
                    self.wipe();

                    return Err(Error::PinInvalid);
                }
                Some(kind) => {
                    storage.record_mut().pin_fails = 0;
                    storage.commit()?;
                    self.verified_pin = Some(kind.clone());

                    return Ok(kind);
                }
                None => {
                    #[cfg(feature = "log")]
                    log::debug!("PIN mismatch ({} failures)", fails + 1);

                    drv.notify(Notice::PinMismatch);

                    if !settings.pin_retry {
                        return Err(Error::PinInvalid);
                    }
                }
            }
        }
    }
}
