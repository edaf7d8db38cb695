// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Confirmation orchestrator
//!
//! Drives the user-facing screen sequence for transactions, addresses and
//! messages via [`Driver::confirm`]. Screens are presented in order:
//!
//! ```text
//! [NonStandardPath] -> [UnknownTokenContract] -> Overview -(details)-> Details*
//!   -> [Subpayload] -> [RawData] -> Fee -> Final
//! ```
//!
//! Any rejection aborts the flow with [`Error::UserCancelled`].

use core::fmt::Display;

use heapless::Vec;

use hwsign_apdu::{path::DerivationPath, tx::SubpayloadKind};

use crate::{
    chain::{AddressStr, Subpayload, MAX_TRANSFERS},
    engine::{Confirm, Driver, Error},
    helpers::{fmt_hex, AmountStr},
};

/// Transfer as rendered for display
#[derive(Clone, PartialEq, Debug)]
pub struct SummaryTransfer {
    pub recipient: AddressStr,
    pub amount: AmountStr,
    /// Contract for transfers of tokens not in the token tables
    pub unknown_contract: Option<AddressStr>,
}

/// Display summary for a decoded transaction
#[derive(Clone, PartialEq, Debug)]
pub struct Summary<'a> {
    pub chain: &'static str,
    pub transfers: Vec<SummaryTransfer, MAX_TRANSFERS>,
    pub raw_data: &'a [u8],
    pub subpayload: Subpayload<'a>,
    pub fee: AmountStr,
}

/// Confirmation screens
#[derive(Clone, PartialEq, Debug)]
pub enum Screen<'a> {
    /// Path does not match the chain schemas
    NonStandardPath { path: &'a DerivationPath },
    /// Transfer of a token missing from the token tables
    UnknownTokenContract { contract: &'a str },
    /// Single recipient overview
    Overview { amount: &'a str, recipient: &'a str },
    /// Per-recipient details
    Details {
        index: usize,
        total: usize,
        recipient: &'a str,
        amount: &'a str,
    },
    /// Script or contract bytecode, or its digest where skipped by the host
    Subpayload {
        kind: SubpayloadKind,
        data: Option<&'a [u8]>,
        digest: Option<[u8; 32]>,
    },
    /// Arbitrary transaction data
    RawData { data: &'a [u8] },
    Fee { fee: &'a str },
    Final { chain: &'a str },
    /// Address display / verification
    Address {
        chain: &'a str,
        path: &'a DerivationPath,
        address: &'a str,
    },
    /// Message content
    Message { data: &'a [u8] },
    /// Off-chain message application domain
    ApplicationDomain { domain: &'a [u8; 32] },
}

impl<'a> Display for Screen<'a> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Screen::NonStandardPath { path } => write!(f, "NonStandardPath({path})"),
            Screen::UnknownTokenContract { contract } => write!(f, "UnknownTokenContract({contract})"),
            Screen::Overview { amount, recipient } => write!(f, "Overview({amount}, {recipient})"),
            Screen::Details {
                index,
                total,
                recipient,
                amount,
            } => write!(f, "Details({}/{total}, {recipient}, {amount})", index + 1),
            Screen::Subpayload {
                kind,
                data: Some(d),
                ..
            } => write!(f, "{kind}({} bytes)", d.len()),
            Screen::Subpayload { kind, digest, .. } => {
                write!(f, "{kind}(")?;
                if let Some(d) = digest {
                    write!(f, "{}", fmt_hex::<66>(d))?;
                }
                write!(f, ")")
            }
            Screen::RawData { data } => write!(f, "RawData({} bytes)", data.len()),
            Screen::Fee { fee } => write!(f, "Fee({fee})"),
            Screen::Final { chain } => write!(f, "Final({chain})"),
            Screen::Address {
                chain,
                path,
                address,
            } => write!(f, "Address({chain}, {path}, {address})"),
            Screen::Message { data } => write!(f, "Message({} bytes)", data.len()),
            Screen::ApplicationDomain { domain } => {
                write!(f, "ApplicationDomain({})", fmt_hex::<66>(&domain[..]))
            }
        }
    }
}

/// Transaction confirmation options
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct ConfirmOptions<'a> {
    /// Skip overview and detail screens
    pub turbo: bool,
    /// Set where the signing path failed strict validation
    pub non_standard_path: Option<&'a DerivationPath>,
}

/// Present a screen, mapping rejection to [`Error::UserCancelled`]
fn show<DRV: Driver>(drv: &mut DRV, screen: &Screen) -> Result<Confirm, Error> {
    #[cfg(feature = "log")]
    log::debug!("screen: {}", screen);

    match drv.confirm(screen) {
        Confirm::Reject => {
            #[cfg(feature = "log")]
            log::debug!("rejected at {}", screen);

            Err(Error::UserCancelled)
        }
        c => Ok(c),
    }
}

fn show_unknown<DRV: Driver>(drv: &mut DRV, t: &SummaryTransfer) -> Result<(), Error> {
    if let Some(c) = &t.unknown_contract {
        show(drv, &Screen::UnknownTokenContract { contract: c })?;
    }
    Ok(())
}

fn show_details<DRV: Driver>(
    drv: &mut DRV,
    index: usize,
    total: usize,
    t: &SummaryTransfer,
) -> Result<(), Error> {
    show(
        drv,
        &Screen::Details {
            index,
            total,
            recipient: &t.recipient,
            amount: &t.amount,
        },
    )?;
    Ok(())
}

/// Run the transaction confirmation flow
#[cfg_attr(feature = "noinline", inline(never))]
pub fn confirm_transaction<DRV: Driver>(
    drv: &mut DRV,
    summary: &Summary,
    opts: &ConfirmOptions,
) -> Result<(), Error> {
    if let Some(path) = opts.non_standard_path {
        show(drv, &Screen::NonStandardPath { path })?;
    }

    let transfers = &summary.transfers;
    let total = transfers.len();

    match (opts.turbo, transfers.first()) {
        // Turbo mode retains unknown token warnings only
        (true, _) => {
            for t in transfers.iter() {
                show_unknown(drv, t)?;
            }
        }
        // Single recipient overview, with details on request
        (false, Some(t)) if total == 1 => {
            show_unknown(drv, t)?;

            let c = show(
                drv,
                &Screen::Overview {
                    amount: &t.amount,
                    recipient: &t.recipient,
                },
            )?;

            if c == Confirm::ShowDetails {
                show_details(drv, 0, 1, t)?;
            }
        }
        // Multiple recipients are each shown in full
        (false, _) => {
            for (i, t) in transfers.iter().enumerate() {
                show_unknown(drv, t)?;
                show_details(drv, i, total, t)?;
            }
        }
    }

    match summary.subpayload {
        Subpayload::None => (),
        Subpayload::Provided(kind, data) => {
            show(
                drv,
                &Screen::Subpayload {
                    kind,
                    data: Some(data),
                    digest: None,
                },
            )?;
        }
        Subpayload::Skipped(kind, digest) => {
            show(
                drv,
                &Screen::Subpayload {
                    kind,
                    data: None,
                    digest: Some(digest),
                },
            )?;
        }
    }

    if !summary.raw_data.is_empty() {
        show(
            drv,
            &Screen::RawData {
                data: summary.raw_data,
            },
        )?;
    }

    show(drv, &Screen::Fee { fee: &summary.fee })?;
    show(
        drv,
        &Screen::Final {
            chain: summary.chain,
        },
    )?;

    Ok(())
}

/// Run the address display flow
pub fn confirm_address<DRV: Driver>(
    drv: &mut DRV,
    chain: &str,
    path: &DerivationPath,
    address: &str,
    non_standard_path: bool,
) -> Result<(), Error> {
    if non_standard_path {
        show(drv, &Screen::NonStandardPath { path })?;
    }

    show(
        drv,
        &Screen::Address {
            chain,
            path,
            address,
        },
    )?;
    Ok(())
}

/// Run the message confirmation flow
pub fn confirm_message<DRV: Driver>(
    drv: &mut DRV,
    chain: &str,
    message: &[u8],
    domain: Option<&[u8; 32]>,
    non_standard_path: Option<&DerivationPath>,
) -> Result<(), Error> {
    if let Some(path) = non_standard_path {
        show(drv, &Screen::NonStandardPath { path })?;
    }

    show(drv, &Screen::Message { data: message })?;

    if let Some(domain) = domain {
        show(drv, &Screen::ApplicationDomain { domain })?;
    }

    show(drv, &Screen::Final { chain })?;

    Ok(())
}

#[cfg(test)]
mod test {
    use std::{
        string::{String, ToString},
        vec::Vec as StdVec,
    };

    use super::*;
    use crate::{chain::address_str, engine::Notice, storage::Passphrase};

    /// Driver recording screens and replaying scripted confirmations
    #[derive(Default)]
    struct ScreenDriver {
        screens: StdVec<String>,
        script: StdVec<Confirm>,
    }

    impl Driver for ScreenDriver {
        fn now_ms(&mut self) -> u64 {
            0
        }

        fn request_pin(&mut self, _attempts: u32) -> crate::engine::PinInput {
            crate::engine::PinInput::Cancel
        }

        fn pin_backoff(&mut self, _wait_ms: u64) {}

        fn sd_salt(&mut self) -> Option<[u8; 32]> {
            None
        }

        fn request_passphrase(&mut self) -> Option<Passphrase> {
            None
        }

        fn confirm(&mut self, screen: &Screen) -> Confirm {
            self.screens.push(screen.to_string());
            match self.script.is_empty() {
                true => Confirm::Approve,
                false => self.script.remove(0),
            }
        }

        fn notify(&mut self, _notice: Notice) {}
    }

    fn transfer(recipient: &str, amount: &str, contract: Option<&str>) -> SummaryTransfer {
        SummaryTransfer {
            recipient: address_str(recipient).unwrap(),
            amount: AmountStr::try_from(amount).unwrap(),
            unknown_contract: contract.map(|c| address_str(c).unwrap()),
        }
    }

    fn summary(transfers: &[SummaryTransfer]) -> Summary<'static> {
        Summary {
            chain: "Ethereum",
            transfers: Vec::from_slice(transfers).unwrap(),
            raw_data: &[],
            subpayload: Subpayload::None,
            fee: AmountStr::try_from("0.1 ETH").unwrap(),
        }
    }

    #[test]
    fn single_recipient() {
        let mut d = ScreenDriver::default();
        let s = summary(&[transfer("0xabc", "1.0 ETH", None)]);

        confirm_transaction(&mut d, &s, &ConfirmOptions::default()).unwrap();

        assert_eq!(
            d.screens,
            &["Overview(1.0 ETH, 0xabc)", "Fee(0.1 ETH)", "Final(Ethereum)"]
        );
    }

    #[test]
    fn show_details_on_request() {
        let mut d = ScreenDriver {
            script: std::vec![Confirm::ShowDetails],
            ..Default::default()
        };
        let s = summary(&[transfer("0xabc", "1.0 ETH", None)]);

        confirm_transaction(&mut d, &s, &ConfirmOptions::default()).unwrap();

        assert_eq!(
            d.screens,
            &[
                "Overview(1.0 ETH, 0xabc)",
                "Details(1/1, 0xabc, 1.0 ETH)",
                "Fee(0.1 ETH)",
                "Final(Ethereum)"
            ]
        );
    }

    #[test]
    fn multiple_recipients_unknown_token() {
        let mut d = ScreenDriver::default();
        let s = summary(&[
            transfer("0xaaa", "1.0 ETH", None),
            transfer("0xbbb", "7 units", Some("0xccc")),
        ]);

        confirm_transaction(&mut d, &s, &ConfirmOptions::default()).unwrap();

        assert_eq!(
            d.screens,
            &[
                "Details(1/2, 0xaaa, 1.0 ETH)",
                "UnknownTokenContract(0xccc)",
                "Details(2/2, 0xbbb, 7 units)",
                "Fee(0.1 ETH)",
                "Final(Ethereum)"
            ]
        );
    }

    #[test]
    fn turbo_mode() {
        let mut d = ScreenDriver::default();
        let mut s = summary(&[transfer("0xbbb", "7 units", Some("0xccc"))]);
        s.raw_data = &[0x01, 0x02];

        let path = DerivationPath::from_slice(&[1, 2, 3]).unwrap();
        let opts = ConfirmOptions {
            turbo: true,
            non_standard_path: Some(&path),
        };

        confirm_transaction(&mut d, &s, &opts).unwrap();

        assert_eq!(
            d.screens,
            &[
                "NonStandardPath(m/1/2/3)",
                "UnknownTokenContract(0xccc)",
                "RawData(2 bytes)",
                "Fee(0.1 ETH)",
                "Final(Ethereum)"
            ]
        );
    }

    #[test]
    fn subpayload_screens() {
        let mut d = ScreenDriver::default();
        let mut s = summary(&[]);
        s.subpayload = Subpayload::Provided(SubpayloadKind::Script, &[0xaa; 5]);

        confirm_transaction(&mut d, &s, &ConfirmOptions::default()).unwrap();
        assert_eq!(d.screens[0], "Script(5 bytes)");

        let mut d = ScreenDriver::default();
        s.subpayload = Subpayload::Skipped(SubpayloadKind::ContractBytecode, [0xab; 32]);

        confirm_transaction(&mut d, &s, &ConfirmOptions::default()).unwrap();
        assert_eq!(
            d.screens[0],
            "ContractBytecode(abababababababababababababababababababababababababababababababab)"
        );
    }

    #[test]
    fn reject_cancels() {
        let mut d = ScreenDriver {
            script: std::vec![Confirm::Approve, Confirm::Reject],
            ..Default::default()
        };
        let s = summary(&[transfer("0xabc", "1.0 ETH", None)]);

        assert_eq!(
            confirm_transaction(&mut d, &s, &ConfirmOptions::default()),
            Err(Error::UserCancelled)
        );

        // Flow stops at the rejected screen
        assert_eq!(d.screens.len(), 2);
    }

    #[test]
    fn message_flow() {
        let mut d = ScreenDriver::default();

        confirm_message(&mut d, "Solana", b"Hello", Some(&[0u8; 32]), None).unwrap();

        assert_eq!(d.screens.len(), 3);
        assert_eq!(d.screens[0], "Message(5 bytes)");
        assert!(d.screens[1].starts_with("ApplicationDomain(0000"));
        assert_eq!(d.screens[2], "Final(Solana)");
    }
}
