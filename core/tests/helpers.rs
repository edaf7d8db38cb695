#![allow(unused)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use log::{debug, trace};

use hwsign_core::{
    apdu::{response_kind, ResponseKind, HWS_APDU_CLA},
    engine::{Confirm, Driver, Engine, Notice, PinInput},
    orchestrator::Screen,
    storage::{DeviceRecord, MemStorage, Passphrase, SecretBytes},
};

pub use hwsign_tests::vectors::MNEMONIC;

/// Engine-backed [hwsign::Exchange] for test use
#[derive(Clone)]
pub struct TestEngine {
    pub engine: Arc<Mutex<Engine<TestDriver>>>,
    /// Encoded responses returned by the engine
    pub responses: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl TestEngine {
    pub fn new(engine: Engine<TestDriver>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            responses: Arc::new(Mutex::new(vec![])),
        }
    }

    /// Create an engine holding the shared test mnemonic
    pub fn with_mnemonic() -> Self {
        let record = DeviceRecord::with_mnemonic(MNEMONIC).unwrap();
        Self::new(Engine::new(TestDriver::default(), MemStorage::new(record)))
    }

    /// Fetch confirmation screens shown since the last call
    pub fn take_screens(&self) -> Vec<String> {
        let mut e = self.engine.lock().unwrap();
        std::mem::take(&mut e.driver().screens)
    }

    /// Fetch responses returned since the last call
    pub fn take_responses(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.responses.lock().unwrap())
    }

    /// Fetch response kinds returned since the last call
    pub fn take_response_kinds(&self) -> Vec<ResponseKind> {
        self.take_responses()
            .iter()
            .map(|r| response_kind(r).unwrap())
            .collect()
    }

    /// Queue PIN entries for the driver
    pub fn push_pins(&self, pins: &[&str]) {
        let mut e = self.engine.lock().unwrap();
        for p in pins {
            e.driver().pins.push_back(p.to_string());
        }
    }

    /// Advance the driver clock
    pub fn advance_clock(&self, ms: u64) {
        let mut e = self.engine.lock().unwrap();
        e.driver().now_ms += ms;
    }

    /// Set the response to confirmation screens
    pub fn set_confirm(&self, c: Confirm) {
        let mut e = self.engine.lock().unwrap();
        e.driver().confirm = c;
    }
}

#[async_trait]
impl hwsign::Exchange for TestEngine {
    type Error = String;

    async fn exchange(
        &self,
        cla: u8,
        ins: u8,
        req: &[u8],
        resp: &mut [u8],
    ) -> Result<usize, Self::Error> {
        assert_eq!(cla, HWS_APDU_CLA);

        trace!("req (ins: {:02x}): {:02x?}", ins, req);

        // Handle request, errors are encoded as failure responses
        let n = {
            let mut e = self.engine.lock().unwrap();
            e.handle(ins, req, resp)
                .map_err(|e| format!("response encoding failed: {e}"))?
        };

        let kind = response_kind(&resp[..n]).map_err(|e| format!("invalid response: {e}"))?;
        debug!("resp: {}", kind);

        self.responses.lock().unwrap().push(resp[..n].to_vec());

        Ok(n)
    }
}

/// Driver implementation for test use
pub struct TestDriver {
    /// Rendered confirmation screens
    pub screens: Vec<String>,
    /// Scripted PIN entries
    pub pins: VecDeque<String>,
    /// Response to confirmation screens
    pub confirm: Confirm,
    pub notices: Vec<Notice>,
    /// PIN prompts issued
    pub pin_requests: usize,
    /// Driver clock
    pub now_ms: u64,
}

/// Queued PIN entry answered with the fingerprint shortcut
pub const FINGERPRINT: &str = "fingerprint";

impl Default for TestDriver {
    fn default() -> Self {
        Self {
            screens: vec![],
            pins: VecDeque::new(),
            confirm: Confirm::Approve,
            notices: vec![],
            pin_requests: 0,
            now_ms: 0,
        }
    }
}

impl Driver for TestDriver {
    fn now_ms(&mut self) -> u64 {
        self.now_ms
    }

    fn request_pin(&mut self, attempts: u32) -> PinInput {
        self.pin_requests += 1;

        debug!("PIN requested ({} failed attempts)", attempts);

        match self.pins.pop_front() {
            Some(p) if p == FINGERPRINT => PinInput::Fingerprint,
            Some(p) => PinInput::Pin(SecretBytes::new(p.as_bytes()).unwrap()),
            None => PinInput::Cancel,
        }
    }

    fn pin_backoff(&mut self, wait_ms: u64) {
        debug!("PIN backoff: {}ms", wait_ms);
    }

    fn sd_salt(&mut self) -> Option<[u8; 32]> {
        None
    }

    fn request_passphrase(&mut self) -> Option<Passphrase> {
        None
    }

    fn confirm(&mut self, screen: &Screen) -> Confirm {
        debug!("screen: {}", screen);

        self.screens.push(screen.to_string());
        self.confirm
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}

/// Setup logging for tests
pub fn init_logging() {
    let _ = simplelog::SimpleLogger::init(log::LevelFilter::Debug, Default::default());
}
