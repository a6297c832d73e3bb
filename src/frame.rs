use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::FrameError;

pub const FRAME_MAGIC: u32 = 0x1991_0926;
pub const MAX_PAYLOAD_SIZE: u32 = 60_000;
pub const HEADER_LEN: usize = 24;

/// The 24-byte little-endian envelope every request and response travels in:
/// `magic(4) | ctx(8) | err_code(4) | payload_type(4) | payload_size(4)` followed by the
/// opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub magic: u32,
    pub ctx: u64,
    pub err_code: i32,
    pub payload_type: u32,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Builds a well-formed, successful (`err_code == 0`) frame carrying `payload`.
    pub fn new(ctx: u64, payload_type: u32, payload: Vec<u8>) -> Result<Self, FrameError> {
        if payload.len() as u32 > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len() as u32,
                max: MAX_PAYLOAD_SIZE,
            });
        }
        Ok(Self {
            magic: FRAME_MAGIC,
            ctx,
            err_code: 0,
            payload_type,
            payload,
        })
    }

    /// Builds an error frame: empty payload, `payload_type` carried through unchanged so the
    /// client can tell which request this is a reply to.
    pub fn error(ctx: u64, payload_type: u32, err_code: i32) -> Self {
        Self {
            magic: FRAME_MAGIC,
            ctx,
            err_code,
            payload_type,
            payload: Vec::new(),
        }
    }

    fn check_header(magic: u32, payload_size: u32) -> Result<(), FrameError> {
        if magic != FRAME_MAGIC {
            return Err(FrameError::BadMagic {
                expected: FRAME_MAGIC,
                got: magic,
            });
        }
        if payload_size > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge {
                size: payload_size,
                max: MAX_PAYLOAD_SIZE,
            });
        }
        Ok(())
    }

    /// Encodes the header and payload into a single contiguous buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.payload.len());
        buf.extend_from_slice(&self.magic.to_le_bytes());
        buf.extend_from_slice(&self.ctx.to_le_bytes());
        buf.extend_from_slice(&self.err_code.to_le_bytes());
        buf.extend_from_slice(&self.payload_type.to_le_bytes());
        buf.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Decodes a frame from a buffer already known to hold exactly one frame's worth of bytes.
    /// Used by property tests exercising the codec without a socket.
    pub fn decode(buf: &[u8]) -> Result<Self, FrameError> {
        if buf.len() < HEADER_LEN {
            return Err(FrameError::Truncated);
        }
        let magic = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        let ctx = u64::from_le_bytes(buf[4..12].try_into().unwrap());
        let err_code = i32::from_le_bytes(buf[12..16].try_into().unwrap());
        let payload_type = u32::from_le_bytes(buf[16..20].try_into().unwrap());
        let payload_size = u32::from_le_bytes(buf[20..24].try_into().unwrap());
        Self::check_header(magic, payload_size)?;
        let payload_size = payload_size as usize;
        if buf.len() - HEADER_LEN < payload_size {
            return Err(FrameError::Truncated);
        }
        let payload = buf[HEADER_LEN..HEADER_LEN + payload_size].to_vec();
        Ok(Self {
            magic,
            ctx,
            err_code,
            payload_type,
            payload,
        })
    }

    pub async fn write_to<W: AsyncWrite + Unpin>(&self, w: &mut W) -> Result<(), FrameError> {
        w.write_all(&self.encode()).await?;
        Ok(())
    }

    pub async fn read_from<R: AsyncRead + Unpin>(r: &mut R) -> Result<Self, FrameError> {
        let mut header = [0u8; HEADER_LEN];
        r.read_exact(&mut header).await?;
        let magic = u32::from_le_bytes(header[0..4].try_into().unwrap());
        let ctx = u64::from_le_bytes(header[4..12].try_into().unwrap());
        let err_code = i32::from_le_bytes(header[12..16].try_into().unwrap());
        let payload_type = u32::from_le_bytes(header[16..20].try_into().unwrap());
        let payload_size = u32::from_le_bytes(header[20..24].try_into().unwrap());
        Self::check_header(magic, payload_size)?;
        let mut payload = vec![0u8; payload_size as usize];
        r.read_exact(&mut payload).await?;
        Ok(Self {
            magic,
            ctx,
            err_code,
            payload_type,
            payload,
        })
    }
}
