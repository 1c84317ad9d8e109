//! RTP packet parsing and serialization
//!
//! Fixed header layout (RFC 3550, section 5.1):
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |V=2|P|X|  CC   |M|     PT      |       sequence number         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                           timestamp                           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |           synchronization source (SSRC) identifier            |
//! +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
//! |            contributing source (CSRC) identifiers             |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! The parser strips padding and clears the padding flag; `marshal` never
//! re-emits padding bytes.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::RtpError;

const FIXED_HEADER_LEN: usize = 12;
const RTP_VERSION: u8 = 2;

/// A parsed real-time-transport packet
///
/// Cheap to clone: the payload and any header extension are `Bytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPacket {
    /// Marker bit
    pub marker: bool,
    /// Payload-type identifier
    pub payload_type: u8,
    /// Sequence number
    pub sequence: u16,
    /// Media timestamp
    pub timestamp: u32,
    /// Synchronization-source identifier
    pub ssrc: u32,
    /// Contributing sources
    pub csrc: Vec<u32>,
    /// Header extension (profile id, extension words)
    pub extension: Option<(u16, Bytes)>,
    /// Payload bytes, padding stripped
    pub payload: Bytes,
}

impl RtpPacket {
    /// Parse a datagram into a packet
    pub fn parse(data: &[u8]) -> Result<RtpPacket, RtpError> {
        if data.len() < FIXED_HEADER_LEN {
            return Err(RtpError::TooShort(data.len()));
        }

        let mut buf = Bytes::copy_from_slice(data);

        let b0 = buf.get_u8();
        let version = b0 >> 6;
        if version != RTP_VERSION {
            return Err(RtpError::BadVersion(version));
        }
        let has_padding = b0 & 0x20 != 0;
        let has_extension = b0 & 0x10 != 0;
        let csrc_count = (b0 & 0x0F) as usize;

        let b1 = buf.get_u8();
        let marker = b1 & 0x80 != 0;
        let payload_type = b1 & 0x7F;

        let sequence = buf.get_u16();
        let timestamp = buf.get_u32();
        let ssrc = buf.get_u32();

        if buf.remaining() < csrc_count * 4 {
            return Err(RtpError::TooShort(data.len()));
        }
        let mut csrc = Vec::with_capacity(csrc_count);
        for _ in 0..csrc_count {
            csrc.push(buf.get_u32());
        }

        let extension = if has_extension {
            if buf.remaining() < 4 {
                return Err(RtpError::BadExtension);
            }
            let profile = buf.get_u16();
            let words = buf.get_u16() as usize;
            if buf.remaining() < words * 4 {
                return Err(RtpError::BadExtension);
            }
            Some((profile, buf.split_to(words * 4)))
        } else {
            None
        };

        let mut payload = buf;
        if has_padding {
            if payload.is_empty() {
                return Err(RtpError::BadPadding);
            }
            let pad_len = payload[payload.len() - 1] as usize;
            if pad_len == 0 || pad_len > payload.len() {
                return Err(RtpError::BadPadding);
            }
            payload.truncate(payload.len() - pad_len);
        }

        Ok(RtpPacket {
            marker,
            payload_type,
            sequence,
            timestamp,
            ssrc,
            csrc,
            extension,
            payload,
        })
    }

    /// Serialize the packet for the wire
    pub fn marshal(&self) -> Bytes {
        let ext_len = self.extension.as_ref().map_or(0, |(_, data)| 4 + data.len());
        let mut buf =
            BytesMut::with_capacity(FIXED_HEADER_LEN + self.csrc.len() * 4 + ext_len + self.payload.len());

        let mut b0 = RTP_VERSION << 6;
        if self.extension.is_some() {
            b0 |= 0x10;
        }
        b0 |= self.csrc.len() as u8 & 0x0F;
        buf.put_u8(b0);

        let mut b1 = self.payload_type & 0x7F;
        if self.marker {
            b1 |= 0x80;
        }
        buf.put_u8(b1);

        buf.put_u16(self.sequence);
        buf.put_u32(self.timestamp);
        buf.put_u32(self.ssrc);

        for csrc in &self.csrc {
            buf.put_u32(*csrc);
        }

        if let Some((profile, data)) = &self.extension {
            buf.put_u16(*profile);
            buf.put_u16((data.len() / 4) as u16);
            buf.put_slice(data);
        }

        buf.put_slice(&self.payload);
        buf.freeze()
    }

    /// Copy of this packet addressed to one destination track
    ///
    /// Only the payload-type and synchronization-source fields change;
    /// `self` is left untouched. The payload clone is a refcount bump.
    pub fn retarget(&self, payload_type: u8, ssrc: u32) -> RtpPacket {
        let mut copy = self.clone();
        copy.payload_type = payload_type;
        copy.ssrc = ssrc;
        copy
    }
}
