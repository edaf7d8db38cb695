// Copyright (c) 2022-2023 The MobileCoin Foundation

use encdec::Decode;

use hwsign_apdu::{prelude::*, ApduError, ApduStatic};

/// [`Engine`][super::Engine] input events, typically decoded from request [APDUs][crate::apdu]
#[derive(Clone, Debug, PartialEq)]
pub enum Event<'a> {
    None,

    /// Fetch application info
    GetInfo,

    /// Derive (and optionally display) an address
    GetAddress {
        chain: ChainTag,
        path: DerivationPath,
        chain_id: u64,
        show_display: bool,
    },

    /// Start a transaction signing request
    SignTxInit {
        chain: ChainTag,
        flags: SignTxFlags,
        total_length: u32,
        chain_id: u64,
        fingerprint: u32,
        path: DerivationPath,
        initial_chunk: &'a [u8],
    },

    /// Requested payload chunk
    ChunkAck(&'a [u8]),

    /// Requested sub-payload (empty where skipped)
    SubpayloadAck(&'a [u8]),

    /// Sign an arbitrary message
    SignMessage {
        chain: ChainTag,
        format: u8,
        fingerprint: u32,
        path: DerivationPath,
        domain: Option<[u8; 32]>,
        message: &'a [u8],
    },

    /// Cancel the in-flight request
    Cancel,
}

/// Helper for decoding APDUs to events
fn decode_event<'a, T>(buff: &'a [u8]) -> Result<Event<'a>, ApduError>
where
    T: Decode<'a, Error = ApduError>,
    Event<'a>: From<T::Output>,
{
    T::decode(buff).map(|(v, _n)| Event::from(v))
}

impl<'a> Event<'a> {
    /// Parse an incoming APDU to engine event
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn parse(ins: u8, buff: &'a [u8]) -> Result<Self, ApduError> {
        match ins {
            InfoReq::INS => decode_event::<InfoReq>(buff),
            AddressReq::INS => decode_event::<AddressReq>(buff),
            SignTxInit::INS => decode_event::<SignTxInit>(buff),
            ChunkAck::INS => decode_event::<ChunkAck>(buff),
            SubpayloadAck::INS => decode_event::<SubpayloadAck>(buff),
            SignMessageReq::INS => decode_event::<SignMessageReq>(buff),
            CancelReq::INS => decode_event::<CancelReq>(buff),
            _ => {
                #[cfg(feature = "log")]
                log::warn!("unrecognised instruction: {:02x}", ins);

                Err(ApduError::InvalidEncoding)
            }
        }
    }
}

impl<'a> From<InfoReq> for Event<'a> {
    fn from(_: InfoReq) -> Self {
        Event::GetInfo
    }
}

impl<'a> From<AddressReq> for Event<'a> {
    fn from(a: AddressReq) -> Self {
        Event::GetAddress {
            chain: a.chain,
            show_display: a.flags.contains(AddressFlags::SHOW_DISPLAY),
            chain_id: a.chain_id,
            path: a.path,
        }
    }
}

impl<'a> From<SignTxInit<'a>> for Event<'a> {
    fn from(a: SignTxInit<'a>) -> Self {
        Event::SignTxInit {
            chain: a.chain,
            flags: a.flags,
            total_length: a.total_length,
            chain_id: a.chain_id,
            fingerprint: a.fingerprint,
            path: a.path,
            initial_chunk: a.initial_chunk,
        }
    }
}

impl<'a> From<ChunkAck<'a>> for Event<'a> {
    fn from(a: ChunkAck<'a>) -> Self {
        Event::ChunkAck(a.data)
    }
}

impl<'a> From<SubpayloadAck<'a>> for Event<'a> {
    fn from(a: SubpayloadAck<'a>) -> Self {
        Event::SubpayloadAck(a.data)
    }
}

impl<'a> From<SignMessageReq<'a>> for Event<'a> {
    fn from(a: SignMessageReq<'a>) -> Self {
        Event::SignMessage {
            chain: a.chain,
            format: a.format,
            fingerprint: a.fingerprint,
            path: a.path,
            domain: a.domain,
            message: a.message,
        }
    }
}

impl<'a> From<CancelReq> for Event<'a> {
    fn from(_: CancelReq) -> Self {
        Event::Cancel
    }
}

#[cfg(test)]
mod test {
    use encdec::Encode;

    use super::*;

    #[test]
    fn parse_events() {
        let mut buff = [0u8; 256];
        let path: DerivationPath = "m/44'/60'/0'/0/0".parse().unwrap();

        let req = AddressReq::new(ChainTag::Ethereum, path.clone(), true).with_chain_id(1);
        let n = req.encode(&mut buff).unwrap();
        assert_eq!(
            Event::parse(AddressReq::INS, &buff[..n]),
            Ok(Event::GetAddress {
                chain: ChainTag::Ethereum,
                path: path.clone(),
                chain_id: 1,
                show_display: true,
            })
        );

        let chunk = [0xab; 16];
        let n = ChunkAck::new(&chunk).encode(&mut buff).unwrap();
        assert_eq!(Event::parse(ChunkAck::INS, &buff[..n]), Ok(Event::ChunkAck(&chunk)));

        let msg = SignMessageReq::new(ChainTag::Solana, path.clone(), b"Hello").with_domain([0x01; 32]);
        let n = msg.encode(&mut buff).unwrap();
        assert_eq!(
            Event::parse(SignMessageReq::INS, &buff[..n]),
            Ok(Event::SignMessage {
                chain: ChainTag::Solana,
                format: 0,
                fingerprint: 0,
                path,
                domain: Some([0x01; 32]),
                message: b"Hello",
            })
        );

        let n = CancelReq.encode(&mut buff).unwrap();
        assert_eq!(Event::parse(CancelReq::INS, &buff[..n]), Ok(Event::Cancel));
    }

    #[test]
    fn parse_unknown() {
        assert_eq!(Event::parse(0x7f, &[]), Err(ApduError::InvalidEncoding));
    }
}
