//! Progressive console text.
//!
//! Each request carries a byte offset (`start`); the response carries the
//! bytes from that offset and, in `X-Text-Size`, the offset to ask for next.
//! `X-More-Data: true` means the log is still being written.

use crate::error::ProtocolError;

pub const START_FIELD: &str = "start";
pub const TEXT_SIZE_HEADER: &str = "x-text-size";
pub const MORE_DATA_HEADER: &str = "x-more-data";

/// The parts of a progressive-text response that decoding looks at.
#[derive(Debug, Clone, Copy)]
pub struct RawLogResponse<'a> {
    pub status: u16,
    pub content_length: Option<u64>,
    pub text_size: Option<&'a str>,
    pub more_data: Option<&'a str>,
    pub body: &'a [u8],
}

/// Decoded outcome of one progressive-text fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFetch {
    /// 404: the build left the queue but has not started logging yet.
    NotStarted,
    /// Any other non-200 status; retried at the same offset.
    ServerError { status: u16 },
    /// No new bytes since `start`.
    Empty,
    /// New bytes and the offset that follows them.
    ///
    /// Kept as bytes: a chunk boundary may fall inside a UTF-8 sequence.
    Chunk {
        bytes: Vec<u8>,
        next_start: u64,
        more: bool,
    },
}

impl LogFetch {
    /// Decode a response to a fetch issued at offset `start`.
    ///
    /// A chunk whose reported next offset does not move past `start` is
    /// rejected so the caller retries instead of printing bytes twice.
    pub fn decode(start: u64, response: &RawLogResponse<'_>) -> Result<Self, ProtocolError> {
        match response.status {
            200 => {}
            404 => return Ok(Self::NotStarted),
            status => return Ok(Self::ServerError { status }),
        }

        if response.content_length == Some(0) || response.body.is_empty() {
            return Ok(Self::Empty);
        }

        let raw = response
            .text_size
            .ok_or(ProtocolError::MissingHeader(TEXT_SIZE_HEADER))?;
        let next_start: u64 = raw.trim().parse().map_err(|_| ProtocolError::InvalidHeader {
            name: TEXT_SIZE_HEADER,
            value: raw.to_string(),
        })?;
        if next_start <= start {
            return Err(ProtocolError::CursorRegression {
                start,
                next: next_start,
            });
        }

        let more = response
            .more_data
            .map(|value| value.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self::Chunk {
            bytes: response.body.to_vec(),
            next_start,
            more,
        })
    }
}
