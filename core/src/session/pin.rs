// Copyright (c) 2022-2023 The MobileCoin Foundation

//! PIN verifiers and PIN management operations

use rand_core::CryptoRngCore;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::{
    consts::{PIN_MAX_LEN, PIN_PBKDF2_ROUNDS},
    engine::Error,
    storage::{DeviceRecord, Passphrase, PassphrasePin, PinVerifier},
};

/// Classification of an entered PIN
#[derive(Clone, PartialEq, Debug)]
pub enum PinKind {
    /// Regular wallet PIN
    Regular,
    /// PIN bound to a hidden wallet passphrase
    PassphraseBound(Passphrase),
    /// Wipe code
    WipeCode,
}

/// Check PIN formatting (non-empty, digits only)
fn check_pin(pin: &str) -> Result<(), Error> {
    if pin.is_empty() || pin.len() > PIN_MAX_LEN || !pin.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidLength);
    }
    Ok(())
}

/// Compute the PIN verifier for `pin`, combined with the optional SD salt
pub fn verifier(pin: &str, sd_salt: Option<&[u8; 32]>, salt: &[u8; 32]) -> PinVerifier {
    let mut input = [0u8; PIN_MAX_LEN + 32];
    let n = pin.len().min(PIN_MAX_LEN);
    input[..n].copy_from_slice(&pin.as_bytes()[..n]);

    let mut len = n;
    if let Some(s) = sd_salt {
        input[n..n + 32].copy_from_slice(s);
        len += 32;
    }

    let mut out = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(&input[..len], salt, PIN_PBKDF2_ROUNDS, &mut out);

    input.zeroize();
    out
}

/// Classify a verifier against the stored record
pub fn classify(record: &DeviceRecord, v: &PinVerifier) -> Option<PinKind> {
    if record.wipe_code.as_ref() == Some(v) {
        return Some(PinKind::WipeCode);
    }
    if record.pin.as_ref() == Some(v) {
        return Some(PinKind::Regular);
    }

    record
        .passphrase_pins
        .iter()
        .find(|p| &p.verifier == v)
        .map(|p| PinKind::PassphraseBound(p.passphrase.clone()))
}

/// Delay before the next PIN attempt, `2^fails - 1` seconds
pub fn backoff_ms(fails: u32) -> u64 {
    let secs = 1u64.checked_shl(fails).unwrap_or(u64::MAX).saturating_sub(1);
    secs.saturating_mul(1000)
}

/// Set the regular PIN, generating a fresh verifier salt
///
/// Changing the salt invalidates existing wipe code and passphrase bound
/// verifiers, these must be configured following [`set_pin`].
pub fn set_pin(
    record: &mut DeviceRecord,
    rng: &mut impl CryptoRngCore,
    pin: &str,
    sd_salt: Option<&[u8; 32]>,
) -> Result<(), Error> {
    check_pin(pin)?;

    rng.fill_bytes(&mut record.pin_salt);

    record.pin = Some(verifier(pin, sd_salt, &record.pin_salt));
    record.wipe_code = None;
    record.passphrase_pins.clear();
    record.pin_fails = 0;

    Ok(())
}

/// Change the regular PIN, requiring the current PIN
pub fn change_pin(
    record: &mut DeviceRecord,
    rng: &mut impl CryptoRngCore,
    current: &str,
    new: &str,
    sd_salt: Option<&[u8; 32]>,
) -> Result<(), Error> {
    let v = verifier(current, sd_salt, &record.pin_salt);
    if record.pin.is_some() && classify(record, &v) != Some(PinKind::Regular) {
        return Err(Error::PinInvalid);
    }

    set_pin(record, rng, new, sd_salt)
}

/// Set a wipe code, which must differ from the PIN
pub fn set_wipe_code(
    record: &mut DeviceRecord,
    code: &str,
    sd_salt: Option<&[u8; 32]>,
) -> Result<(), Error> {
    check_pin(code)?;
    if record.pin.is_none() {
        return Err(Error::UnexpectedEvent);
    }

    let v = verifier(code, sd_salt, &record.pin_salt);
    if classify(record, &v).is_some() {
        return Err(Error::PinInvalid);
    }

    record.wipe_code = Some(v);
    Ok(())
}

/// Bind an additional PIN to a passphrase (hidden wallet)
pub fn bind_pin_to_passphrase(
    record: &mut DeviceRecord,
    pin: &str,
    passphrase: &str,
    sd_salt: Option<&[u8; 32]>,
) -> Result<(), Error> {
    check_pin(pin)?;
    if record.pin.is_none() {
        return Err(Error::UnexpectedEvent);
    }

    let v = verifier(pin, sd_salt, &record.pin_salt);
    if classify(record, &v).is_some() {
        return Err(Error::PinInvalid);
    }

    record
        .passphrase_pins
        .push(PassphrasePin {
            verifier: v,
            passphrase: Passphrase::new(passphrase.as_bytes())?,
        })
        .map_err(|_| Error::Storage)
}
