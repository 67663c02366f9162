//! Length-prefixed JSON frames
//!
//! ```text
//! ┌──────────────┬──────────────────────────┐
//! │ len: u32 BE  │ JSON body (len bytes)    │
//! └──────────────┴──────────────────────────┘
//! ```
//!
//! Default inner codec for the tracing taps and the frame format used by the
//! tests to play the server side of a connection.

use crate::error::{CodecError, CodecResult};
use crate::tap::ClientCodec;
use bytes::{Buf, BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use types::{Request, Response};

pub const FRAME_HEADER_SIZE: usize = 4;
pub const DEFAULT_MAX_FRAME: usize = 1024 * 1024;

/// Append one frame holding `value`
pub fn encode_frame<T: Serialize>(value: &T, dst: &mut BytesMut, limit: usize) -> CodecResult<()> {
    let body = serde_json::to_vec(value)?;
    if body.len() > limit {
        return Err(CodecError::FrameTooLarge {
            size: body.len(),
            limit,
        });
    }
    dst.reserve(FRAME_HEADER_SIZE + body.len());
    dst.put_u32(body.len() as u32);
    dst.extend_from_slice(&body);
    Ok(())
}

/// Take one complete frame off the front of `src`, `None` while incomplete
pub fn decode_frame<T: DeserializeOwned>(src: &mut BytesMut, limit: usize) -> CodecResult<Option<T>> {
    if src.len() < FRAME_HEADER_SIZE {
        return Ok(None);
    }
    let len = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
    if len > limit {
        return Err(CodecError::FrameTooLarge { size: len, limit });
    }
    if src.len() < FRAME_HEADER_SIZE + len {
        src.reserve(FRAME_HEADER_SIZE + len - src.len());
        return Ok(None);
    }

    src.advance(FRAME_HEADER_SIZE);
    let body = src.split_to(len);
    Ok(Some(serde_json::from_slice(&body)?))
}

/// Client side: requests out, responses in
#[derive(Debug, Clone)]
pub struct JsonFrameCodec {
    max_frame: usize,
}

impl JsonFrameCodec {
    pub fn new() -> Self {
        Self {
            max_frame: DEFAULT_MAX_FRAME,
        }
    }

    pub fn with_max_frame(max_frame: usize) -> Self {
        Self { max_frame }
    }

    pub fn max_frame(&self) -> usize {
        self.max_frame
    }
}

impl Default for JsonFrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientCodec for JsonFrameCodec {
    fn encode(&mut self, request: &Request, dst: &mut BytesMut) -> CodecResult<()> {
        encode_frame(request, dst, self.max_frame)
    }

    fn decode(&mut self, src: &mut BytesMut) -> CodecResult<Option<Response>> {
        decode_frame(src, self.max_frame)
    }
}
