// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0

//! Data exchanged with the AMD SP during an SEV launch, and its
//! byte-exact encodings.

pub(crate) mod types;
pub use types::*;

use crate::{
    certs::sev,
    error::{Error, Result},
    util::*,
};

use codicon::{Decoder, Encoder};
use std::io::{Read, Write};

impl codicon::Decoder<()> for Session {
    type Error = Error;

    fn decode(mut reader: impl Read, _: ()) -> Result<Self> {
        Ok(Self {
            nonce: reader.load()?,
            wrap_tk: reader.load()?,
            wrap_iv: reader.load()?,
            wrap_mac: reader.load()?,
            policy_mac: reader.load()?,
        })
    }
}

impl codicon::Encoder<()> for Session {
    type Error = Error;

    fn encode(&self, mut writer: impl Write, _: ()) -> Result<()> {
        writer.write_all(&self.nonce)?;
        writer.write_all(&self.wrap_tk)?;
        writer.write_all(&self.wrap_iv)?;
        writer.write_all(&self.wrap_mac)?;
        writer.write_all(&self.policy_mac)?;
        Ok(())
    }
}

impl codicon::Decoder<()> for Header {
    type Error = Error;

    fn decode(mut reader: impl Read, _: ()) -> Result<Self> {
        let flags = u32::from_le(reader.load()?);
        Ok(Self {
            flags: HeaderFlags::from_bits(flags).ok_or(std::io::ErrorKind::InvalidData)?,
            iv: reader.load()?,
            guest_len: u32::from_le(reader.load()?),
            trans_len: u32::from_le(reader.load()?),
            mac: reader.load()?,
        })
    }
}

impl codicon::Encoder<()> for Header {
    type Error = Error;

    fn encode(&self, mut writer: impl Write, _: ()) -> Result<()> {
        writer.write_all(&self.flags.bits().to_le_bytes())?;
        writer.write_all(&self.iv)?;
        writer.write_all(&self.guest_len.to_le_bytes())?;
        writer.write_all(&self.trans_len.to_le_bytes())?;
        writer.write_all(&self.mac)?;
        Ok(())
    }
}

impl codicon::Decoder<()> for Measurement {
    type Error = Error;

    fn decode(mut reader: impl Read, _: ()) -> Result<Self> {
        Ok(Self {
            measure: reader.load()?,
            mnonce: reader.load()?,
        })
    }
}

impl codicon::Encoder<()> for Measurement {
    type Error = Error;

    fn encode(&self, mut writer: impl Write, _: ()) -> Result<()> {
        writer.write_all(&self.measure)?;
        writer.write_all(&self.mnonce)?;
        Ok(())
    }
}

impl codicon::Encoder<()> for Start {
    type Error = Error;

    /// Policy, guest owner certificate, then the session buffer.
    fn encode(&self, mut writer: impl Write, _: ()) -> Result<()> {
        writer.write_all(&self.policy.bytes())?;
        self.cert.encode(&mut writer, ())?;
        self.session.encode(&mut writer, ())
    }
}

impl codicon::Decoder<()> for Start {
    type Error = Error;

    fn decode(mut reader: impl Read, _: ()) -> Result<Self> {
        let policy = Policy::try_from(u32::from_le(reader.load()?))?;
        let cert = sev::Certificate::decode(&mut reader, ())?;
        let session = Session::decode(&mut reader, ())?;
        Ok(Self {
            policy,
            cert,
            session,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Version;

    #[test]
    fn policy_layout() {
        let policy = Policy {
            flags: PolicyFlags::NO_DEBUG | PolicyFlags::NO_KEY_SHARING,
            minfw: Version {
                major: 0,
                minor: 22,
            },
        };

        assert_eq!(policy.bytes(), [0x03, 0x00, 0x00, 22]);
        assert_eq!(Policy::try_from(u32::from(policy)).unwrap(), policy);
    }

    #[test]
    fn policy_reserved_bits() {
        assert!(matches!(
            Policy::try_from(1u32 << 9),
            Err(Error::InvalidPolicy(0x200))
        ));
    }

    #[test]
    fn header_is_60_bytes() {
        let header = Header {
            flags: HeaderFlags::COMPRESSED,
            iv: [1u8; 16],
            guest_len: 8,
            trans_len: 8,
            mac: [2u8; 32],
        };

        let mut buf = Vec::new();
        header.encode(&mut buf, ()).unwrap();
        assert_eq!(buf.len(), HEADER_SIZE);
        assert_eq!(&buf[..4], &[1, 0, 0, 0]);
        assert_eq!(&buf[20..24], &8u32.to_le_bytes());
        assert_eq!(Header::decode(&buf[..], ()).unwrap(), header);
    }

    #[test]
    fn session_field_order() {
        let session = Session {
            nonce: [1u8; 16],
            wrap_tk: [2u8; 32],
            wrap_iv: [3u8; 16],
            wrap_mac: [4u8; 32],
            policy_mac: [5u8; 32],
        };

        let mut buf = Vec::new();
        session.encode(&mut buf, ()).unwrap();
        assert_eq!(buf.len(), 128);
        assert_eq!(buf[0], 1);
        assert_eq!(buf[16], 2);
        assert_eq!(buf[48], 3);
        assert_eq!(buf[64], 4);
        assert_eq!(buf[96], 5);
    }
}
