// Copyright (c) 2022-2023 The MobileCoin Foundation

//! The [Engine] provides functionality required by hardware wallets.
//!
//! This handles [Event] inputs and returns [Output] responses to the caller,
//! see [apdu][crate::apdu] for APDU protocol / encoding specifications.
//!
//! Platform interaction (time, PIN entry, confirmation screens) is provided
//! by a [Driver], persistent device configuration by a [Storage] instance.

use encdec::Encode;
use heapless::Vec;
use rand_core::{CryptoRngCore, OsRng};
use strum::{Display, EnumIter, EnumString, EnumVariantNames};
use zeroize::Zeroize;

use hwsign_apdu::{
    app_info::{AppFlags, CurveFlags},
    control::FailureResp,
    path::DerivationPath,
    tx::SignTxFlags,
    ApduError, ChainTag,
};

use crate::{
    assembler::Assembler,
    chain::{self, subpayload_digest, DecodeContext, MessageEncoding, MessageRequest, Subpayload},
    consts::PIN_MAX_LEN,
    keychain::Keychain,
    orchestrator::{self, ConfirmOptions, Screen},
    path::PathCheck,
    session::{pin, Session, SessionState},
    signer::{self, Signature, LEGACY_V_OFFSET, MAX_SIGNATURE_LEN},
    storage::{MemStorage, Passphrase, SafetyChecks, SecretBytes, Storage},
};

mod function;
pub use function::{Function, TxContext};

mod event;
pub use event::Event;

mod output;
pub use output::Output;

mod error;
pub use error::Error;

/// Engine internal state enumeration
#[derive(Copy, Clone, PartialEq, Debug, EnumString, Display, EnumVariantNames, EnumIter)]
pub enum State {
    /// Idle state, no request in flight
    Idle,
    /// Receiving payload chunks
    Assembling,
    /// Awaiting the declared sub-payload
    Subpayload,
}

/// PIN entry result
#[derive(Clone, PartialEq, Debug)]
pub enum PinInput {
    /// PIN entered by the user
    Pin(SecretBytes<PIN_MAX_LEN>),
    /// Fingerprint shortcut (accepted only following a PIN unlock)
    Fingerprint,
    /// Entry cancelled
    Cancel,
}

/// User response to a confirmation screen
#[derive(Copy, Clone, PartialEq, Debug, Display)]
pub enum Confirm {
    Approve,
    /// Approve and expand to the detail screens
    ShowDetails,
    Reject,
}

/// Notifications for the UI
#[derive(Copy, Clone, PartialEq, Debug, Display)]
pub enum Notice {
    /// Entered PIN did not match
    PinMismatch,
    /// Request bound to a different wallet
    WalletMismatch,
}

/// [`Driver`] trait provides platform support for [`Engine`] instances
pub trait Driver {
    /// Monotonic time in milliseconds
    fn now_ms(&mut self) -> u64;

    /// Request PIN entry, `attempts` is the current failure count
    fn request_pin(&mut self, attempts: u32) -> PinInput;

    /// Display PIN backoff progress, blocking for `wait_ms`
    fn pin_backoff(&mut self, wait_ms: u64);

    /// Fetch the SD card salt where SD protection is enabled
    fn sd_salt(&mut self) -> Option<[u8; 32]>;

    /// Request a passphrase, `None` if cancelled
    fn request_passphrase(&mut self) -> Option<Passphrase>;

    /// Present a confirmation screen
    fn confirm(&mut self, screen: &Screen) -> Confirm;

    /// Present a notification
    fn notify(&mut self, notice: Notice);
}

impl<T: Driver> Driver for &mut T {
    fn now_ms(&mut self) -> u64 {
        T::now_ms(self)
    }

    fn request_pin(&mut self, attempts: u32) -> PinInput {
        T::request_pin(self, attempts)
    }

    fn pin_backoff(&mut self, wait_ms: u64) {
        T::pin_backoff(self, wait_ms)
    }

    fn sd_salt(&mut self) -> Option<[u8; 32]> {
        T::sd_salt(self)
    }

    fn request_passphrase(&mut self) -> Option<Passphrase> {
        T::request_passphrase(self)
    }

    fn confirm(&mut self, screen: &Screen) -> Confirm {
        T::confirm(self, screen)
    }

    fn notify(&mut self, notice: Notice) {
        T::notify(self, notice)
    }
}

/// [Engine] provides hardware-independent support for signing requests
pub struct Engine<DRV: Driver, S: Storage = MemStorage, RNG: CryptoRngCore = OsRng> {
    state: State,
    curves: CurveFlags,

    session: Session,
    assembler: Assembler,
    function: Function,

    storage: S,
    drv: DRV,
    rng: RNG,
}

impl<DRV: Driver, S: Storage> Engine<DRV, S> {
    /// Create a new engine instance with the provided driver and storage,
    /// using the default [OsRng]
    pub fn new(drv: DRV, storage: S) -> Self {
        Self::new_with_rng(drv, storage, OsRng {})
    }
}

impl<DRV: Driver, S: Storage, RNG: CryptoRngCore> Engine<DRV, S, RNG> {
    /// Create a new engine instance with the provided driver, storage and rng
    pub fn new_with_rng(drv: DRV, storage: S, rng: RNG) -> Self {
        Self {
            state: State::Idle,
            curves: CurveFlags::all(),
            session: Session::new(),
            assembler: Assembler::new(),
            function: Function::new(),
            storage,
            drv,
            rng,
        }
    }

    /// Restrict the advertised curve set
    pub fn with_curves(mut self, curves: CurveFlags) -> Self {
        self.curves = curves;
        self
    }

    /// Handle incoming events
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn update(&mut self, evt: &Event) -> Result<Output, Error> {
        #[cfg(feature = "log")]
        log::debug!("event: {:02x?} (state: {})", evt, self.state);

        let r = match (self.state, evt) {
            // Empty event, do nothing
            (_, Event::None) => return Ok(Output::None),

            // Info is available in any state
            (_, Event::GetInfo) => return Ok(self.info()),

            // Cancel the in-flight request, if any
            (State::Idle, Event::Cancel) => return Ok(Output::Ack),
            (_, Event::Cancel) => Err(Error::UserCancelled),

            (
                State::Idle,
                Event::GetAddress {
                    chain,
                    path,
                    chain_id,
                    show_display,
                },
            ) => self.get_address(*chain, path, *chain_id, *show_display),

            (
                State::Idle,
                Event::SignTxInit {
                    chain,
                    flags,
                    total_length,
                    chain_id,
                    fingerprint,
                    path,
                    initial_chunk,
                },
            ) => self.sign_tx_init(
                *chain,
                *flags,
                *total_length as usize,
                *chain_id,
                *fingerprint,
                path,
                initial_chunk,
            ),

            (
                State::Idle,
                Event::SignMessage {
                    chain,
                    format,
                    fingerprint,
                    path,
                    domain,
                    message,
                },
            ) => self.sign_message(*chain, *format, *fingerprint, path, domain.as_ref(), message),

            // One request at a time
            (_, Event::GetAddress { .. } | Event::SignTxInit { .. } | Event::SignMessage { .. }) => {
                return Err(Error::Busy)
            }

            (State::Assembling, Event::ChunkAck(data)) => self.chunk_ack(data),
            (State::Subpayload, Event::SubpayloadAck(data)) => self.subpayload_ack(data),

            (State::Idle, _) => return Err(Error::UnexpectedEvent),

            // Out of sequence events abort the in-flight request
            _ => Err(Error::UnexpectedEvent),
        };

        // Retain request context only while awaiting the host
        if !matches!(&r, Ok(o) if o.is_request()) {
            self.end_request();
        }

        #[cfg(feature = "log")]
        if let Err(e) = &r {
            match e.is_user_action() {
                true => log::debug!("request ended: {}", e.message()),
                false => log::warn!("request failed: {}", e.message()),
            }
        }

        r
    }

    /// Parse and handle an incoming APDU, writing the response to `resp`
    ///
    /// Engine errors are encoded as [`FailureResp`] responses.
    pub fn handle(&mut self, ins: u8, req: &[u8], resp: &mut [u8]) -> Result<usize, ApduError> {
        let r = Event::parse(ins, req)
            .map_err(Error::from)
            .and_then(|evt| self.update(&evt));

        match r {
            Ok(o) => o.encode(resp),
            Err(e) => FailureResp::new(e.code(), e.message()).encode(resp),
        }
    }

    /// Fetch the current engine state
    pub fn state(&self) -> State {
        self.state
    }

    /// Fetch the current session state
    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    /// Check whether the session is unlocked
    pub fn is_unlocked(&self) -> bool {
        self.session.is_unlocked()
    }

    /// Access device storage
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Access device storage for modification
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Access the platform driver
    pub fn driver(&mut self) -> &mut DRV {
        &mut self.drv
    }

    /// Drop any in-flight request (ie. on transport disconnect)
    pub fn reset(&mut self) {
        #[cfg(feature = "log")]
        if self.state != State::Idle {
            log::info!("reset in state {}", self.state);
        }

        self.end_request();
    }

    /// Lock the session
    pub fn lock(&mut self) {
        self.end_request();
        self.session.lock();
    }

    /// Wipe the device record and session
    pub fn wipe(&mut self) -> Result<(), Error> {
        self.end_request();
        self.session.wipe();

        self.storage.record_mut().wipe();
        self.storage.commit()
    }

    /// Set the device PIN
    pub fn set_pin(&mut self, new: &str) -> Result<(), Error> {
        let sd_salt = self.sd_salt()?;
        pin::set_pin(self.storage.record_mut(), &mut self.rng, new, sd_salt.as_ref())?;
        self.storage.commit()
    }

    /// Change the device PIN, requiring the current PIN
    pub fn change_pin(&mut self, current: &str, new: &str) -> Result<(), Error> {
        let sd_salt = self.sd_salt()?;
        pin::change_pin(
            self.storage.record_mut(),
            &mut self.rng,
            current,
            new,
            sd_salt.as_ref(),
        )?;
        self.storage.commit()
    }

    /// Set a wipe code
    pub fn set_wipe_code(&mut self, code: &str) -> Result<(), Error> {
        let sd_salt = self.sd_salt()?;
        pin::set_wipe_code(self.storage.record_mut(), code, sd_salt.as_ref())?;
        self.storage.commit()
    }

    /// Bind an additional PIN to a hidden wallet passphrase
    pub fn bind_pin_to_passphrase(&mut self, pin: &str, passphrase: &str) -> Result<(), Error> {
        let sd_salt = self.sd_salt()?;
        pin::bind_pin_to_passphrase(self.storage.record_mut(), pin, passphrase, sd_salt.as_ref())?;
        self.storage.commit()
    }

    fn sd_salt(&mut self) -> Result<Option<[u8; 32]>, Error> {
        match self.storage.record().settings.sd_protect {
            true => self.drv.sd_salt().map(Some).ok_or(Error::PinCancelled),
            false => Ok(None),
        }
    }

    fn end_request(&mut self) {
        self.assembler.clear();
        self.function.clear();
        self.state = State::Idle;
    }

    fn strict(&self) -> bool {
        self.storage.record().settings.safety_checks == SafetyChecks::Strict
    }

    fn root_fingerprint(&self) -> Result<u32, Error> {
        Keychain::new(self.session.seed()?, self.curves).root_fingerprint()
    }

    /// Check the request is bound to the unlocked wallet (zero disables the check)
    fn check_fingerprint(&mut self, expected: u32) -> Result<(), Error> {
        if expected == 0 {
            return Ok(());
        }

        let actual = self.root_fingerprint()?;
        if actual != expected {
            #[cfg(feature = "log")]
            log::warn!("wallet mismatch (expected {:08x}, actual {:08x})", expected, actual);

            self.drv.notify(Notice::WalletMismatch);
            return Err(Error::WalletMismatch);
        }

        Ok(())
    }

    fn info(&self) -> Output {
        let record = self.storage.record();

        let mut flags = AppFlags::empty();
        flags.set(AppFlags::INITIALIZED, record.mnemonic.is_some());
        flags.set(AppFlags::UNLOCKED, self.session.is_unlocked());
        flags.set(AppFlags::PIN_SET, record.has_pin());
        flags.set(
            AppFlags::PASSPHRASE,
            self.session.state() == SessionState::PassphraseBound,
        );
        flags.set(AppFlags::BUSY, self.state != State::Idle);
        flags.set(AppFlags::EXTENDABLE_BACKUP, record.extendable_backup);

        Output::Info {
            flags,
            curves: self.curves,
            root_fingerprint: self.root_fingerprint().unwrap_or(0),
        }
    }

    #[cfg_attr(feature = "noinline", inline(never))]
    fn get_address(
        &mut self,
        chain: ChainTag,
        path: &DerivationPath,
        chain_id: u64,
        show_display: bool,
    ) -> Result<Output, Error> {
        self.session.unlock(&mut self.drv, &mut self.storage)?;

        let c = chain::lookup(chain);
        let check = c.validate_path(path.as_ref(), self.strict())?;

        let keychain = Keychain::new(self.session.seed()?, self.curves);
        let node = keychain.derive(path.as_ref(), c.curve())?;
        let address = c.address(&node, path.as_ref(), chain_id)?;

        if show_display {
            orchestrator::confirm_address(
                &mut self.drv,
                c.name(),
                path,
                &address,
                check == PathCheck::NonStandard,
            )?;
        }

        Ok(Output::Address {
            path: path.clone(),
            address,
            public_key: Vec::from_slice(node.public_key()).map_err(|_| Error::InvalidKey)?,
        })
    }

    #[allow(clippy::too_many_arguments)]
    #[cfg_attr(feature = "noinline", inline(never))]
    fn sign_tx_init(
        &mut self,
        chain: ChainTag,
        flags: SignTxFlags,
        total_length: usize,
        chain_id: u64,
        fingerprint: u32,
        path: &DerivationPath,
        initial_chunk: &[u8],
    ) -> Result<Output, Error> {
        self.session.unlock(&mut self.drv, &mut self.storage)?;
        self.check_fingerprint(fingerprint)?;

        let c = chain::lookup(chain);
        let hash = c.payload_hash().ok_or(Error::UnsupportedChainFeature)?;

        let check = c.validate_path(path.as_ref(), self.strict())?;

        // Check the signing key is available prior to assembly
        Keychain::new(self.session.seed()?, self.curves).derive(path.as_ref(), c.curve())?;

        self.assembler.start(initial_chunk, total_length, hash)?;

        let settings = &self.storage.record().settings;
        self.function.tx_init(TxContext {
            chain,
            path: path.clone(),
            chain_id,
            turbo: settings.turbo_mode && !flags.contains(SignTxFlags::QR_TRANSPORT),
            non_standard: check == PathCheck::NonStandard,
            digest: [0u8; 32],
        });
        self.state = State::Assembling;

        #[cfg(feature = "log")]
        log::info!("{} signing started ({} bytes)", c.name(), total_length);

        self.next_chunk()
    }

    fn chunk_ack(&mut self, data: &[u8]) -> Result<Output, Error> {
        self.assembler.ack(data)?;
        self.next_chunk()
    }

    /// Request the next chunk, or decode once the payload is complete
    fn next_chunk(&mut self) -> Result<Output, Error> {
        if let Some(n) = self.assembler.next_request() {
            return Ok(Output::ChunkRequest { length: n as u32 });
        }

        let digest = self.assembler.finish()?;
        let ctx = self.function.tx_mut().ok_or(Error::UnexpectedEvent)?;
        ctx.digest = digest;

        // Decode to discover any sub-payload window
        let window = {
            let ctx = self.function.tx().ok_or(Error::UnexpectedEvent)?;
            let keychain = Keychain::new(self.session.seed()?, self.curves);
            let dctx = DecodeContext {
                keychain: &keychain,
                path: ctx.path.as_ref(),
                chain_id: ctx.chain_id,
                digest: &ctx.digest,
            };

            chain::lookup(ctx.chain)
                .decode(self.assembler.payload(), &dctx)?
                .window()
        };

        match window {
            Some(w) => {
                self.assembler.set_window(w)?;
                self.state = State::Subpayload;
                self.next_subpayload()
            }
            None => self.complete_tx(false),
        }
    }

    /// Request the next sub-payload piece, or complete once the whole
    /// window has been received
    fn next_subpayload(&mut self) -> Result<Output, Error> {
        let w = self.assembler.window().ok_or(Error::UnexpectedEvent)?;

        match self.assembler.next_subpayload() {
            Some((offset, length)) => Ok(Output::SubpayloadRequest {
                kind: w.kind,
                total: w.length as u32,
                offset: offset as u32,
                length: length as u32,
            }),
            None => self.complete_tx(true),
        }
    }

    fn subpayload_ack(&mut self, data: &[u8]) -> Result<Output, Error> {
        match self.assembler.subpayload_ack(data)? {
            true => self.next_subpayload(),
            false => self.complete_tx(false),
        }
    }

    /// Confirm and sign the assembled transaction, `provided` where the
    /// host delivered the declared sub-payload
    #[cfg_attr(feature = "noinline", inline(never))]
    fn complete_tx(&mut self, provided: bool) -> Result<Output, Error> {
        let Self {
            session,
            assembler,
            function,
            drv,
            rng,
            curves,
            ..
        } = self;

        let ctx = function.tx().ok_or(Error::UnexpectedEvent)?;
        let c = chain::lookup(ctx.chain);

        let keychain = Keychain::new(session.seed()?, *curves);
        let dctx = DecodeContext {
            keychain: &keychain,
            path: ctx.path.as_ref(),
            chain_id: ctx.chain_id,
            digest: &ctx.digest,
        };

        let payload = assembler.payload();
        let tx = c.decode(payload, &dctx)?;

        let subpayload = match assembler.window() {
            None => Subpayload::None,
            Some(w) => {
                let data = &payload[w.offset..][..w.length];
                match provided {
                    true => Subpayload::Provided(w.kind, data),
                    false => Subpayload::Skipped(w.kind, subpayload_digest(data)),
                }
            }
        };

        let summary = c.describe_for_ui(&tx, subpayload)?;
        let opts = ConfirmOptions {
            turbo: ctx.turbo,
            non_standard_path: ctx.non_standard.then_some(&ctx.path),
        };
        orchestrator::confirm_transaction(drv, &summary, &opts)?;

        let mut aux = [0u8; 32];
        rng.fill_bytes(&mut aux);
        let signatures = c.sign(&tx, &keychain, &aux);
        aux.zeroize();

        let node = keychain.derive(ctx.path.as_ref(), c.curve())?;
        let address = c.address(&node, ctx.path.as_ref(), ctx.chain_id)?;

        #[cfg(feature = "log")]
        log::info!("{} transaction signed", c.name());

        Ok(Output::Signed {
            address,
            signatures: signatures?,
        })
    }

    #[cfg_attr(feature = "noinline", inline(never))]
    fn sign_message(
        &mut self,
        chain: ChainTag,
        format: u8,
        fingerprint: u32,
        path: &DerivationPath,
        domain: Option<&[u8; 32]>,
        message: &[u8],
    ) -> Result<Output, Error> {
        self.session.unlock(&mut self.drv, &mut self.storage)?;
        self.check_fingerprint(fingerprint)?;

        let c = chain::lookup(chain);
        let check = c.validate_path(path.as_ref(), self.strict())?;

        let Self {
            session,
            drv,
            rng,
            curves,
            ..
        } = self;

        let keychain = Keychain::new(session.seed()?, *curves);
        let node = keychain.derive(path.as_ref(), c.curve())?;

        let req = MessageRequest {
            message,
            domain: domain.copied(),
            // Off-chain message header version
            version: 0,
            format,
        };
        let prepared = c.prepare_message(&req, &node)?;

        orchestrator::confirm_message(
            drv,
            c.name(),
            message,
            domain,
            (check == PathCheck::NonStandard).then_some(path),
        )?;

        let mut aux = [0u8; 32];
        rng.fill_bytes(&mut aux);
        let s = signer::sign(&node, prepared.scheme, &prepared.data, &aux);
        aux.zeroize();

        let signature = encode_message_signature(&s?, prepared.encoding)?;
        let address = c.address(&node, path.as_ref(), 0)?;

        Ok(Output::MessageSignature { address, signature })
    }
}

/// Encode a message signature per the chain message convention
pub fn encode_message_signature(
    s: &Signature,
    encoding: MessageEncoding,
) -> Result<Vec<u8, MAX_SIGNATURE_LEN>, Error> {
    let mut out = Vec::new();

    let r = match encoding {
        MessageEncoding::Raw => out.extend_from_slice(&s.bytes),
        MessageEncoding::BitcoinCompact => {
            let v = s.recovery.ok_or(Error::SignError)?;
            // Header flags a compressed public key
            out.extend_from_slice(&[LEGACY_V_OFFSET + 4 + v])
                .and_then(|_| out.extend_from_slice(&s.bytes[..64]))
        }
        MessageEncoding::EthereumPersonal => {
            let v = s.recovery.ok_or(Error::SignError)?;
            out.extend_from_slice(&s.bytes[..64])
                .and_then(|_| out.extend_from_slice(&[LEGACY_V_OFFSET + v]))
        }
    };

    r.map_err(|_| Error::SignError)?;
    Ok(out)
}
