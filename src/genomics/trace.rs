//! Decoder for the compact edit traces attached to allele lines.
//!
//! Tokens are concatenated without separators:
//! - `:N` match run of `N` reference bases
//! - `=SEQ` match run spelled out
//! - `*xy` substitution of reference base `x` by `y`
//! - `+SEQ` insertion of `SEQ`
//! - `-SEQ` deletion of `SEQ`

use thiserror::Error;

use super::EditFragment;

/// Errors raised while decoding a trace.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraceError {
    /// Operator character outside the trace alphabet.
    #[error("unknown trace operator '{op}' at byte {offset}")]
    UnknownOperator {
        /// Offending character.
        op: char,
        /// Byte offset inside the trace.
        offset: usize,
    },

    /// A match run without a valid length.
    #[error("invalid match length at byte {0}")]
    InvalidLength(usize),

    /// An operator that needs bases but has none.
    #[error("empty payload for '{0}'")]
    EmptyPayload(char),

    /// A substitution whose payload is not exactly two bases.
    #[error("substitution at byte {0} must carry two bases")]
    BadSubstitution(usize),

    /// The reference cursor ran past the coordinate range.
    #[error("trace overruns the coordinate range at byte {0}")]
    RunOverflow(usize),
}

/// Result of decoding one trace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedTrace {
    /// Edits in trace order.
    pub fragments: Vec<EditFragment>,
    /// Number of non-match operations.
    pub n_edits: usize,
    /// Reference bases consumed by the whole trace.
    pub ref_len: u32,
}

fn is_operator(byte: u8) -> bool {
    matches!(byte, b':' | b'=' | b'*' | b'+' | b'-')
}

fn advance(cursor: u32, len: usize, offset: usize) -> Result<u32, TraceError> {
    u32::try_from(len)
        .ok()
        .and_then(|len| cursor.checked_add(len))
        .ok_or(TraceError::RunOverflow(offset))
}

/// Decode `trace` into fragments owned by allele `allele_id`.
pub fn decode_trace(trace: &str, allele_id: usize) -> Result<DecodedTrace, TraceError> {
    let bytes = trace.as_bytes();
    let mut decoded = DecodedTrace::default();
    let mut cursor = 0u32;
    let mut i = 0;

    while i < bytes.len() {
        let op = bytes[i];
        if !is_operator(op) {
            return Err(TraceError::UnknownOperator {
                op: op as char,
                offset: i,
            });
        }
        let payload_start = i + 1;
        let mut j = payload_start;
        while j < bytes.len() && !is_operator(bytes[j]) {
            j += 1;
        }
        let payload = &trace[payload_start..j];

        match op {
            b':' => {
                let len: u32 = payload
                    .parse()
                    .map_err(|_| TraceError::InvalidLength(payload_start))?;
                cursor = advance(cursor, len as usize, i)?;
            }
            b'=' => {
                if payload.is_empty() {
                    return Err(TraceError::EmptyPayload('='));
                }
                cursor = advance(cursor, payload.len(), i)?;
            }
            b'*' => {
                let pair = payload.as_bytes();
                if pair.len() != 2 || !pair.iter().all(u8::is_ascii_alphabetic) {
                    return Err(TraceError::BadSubstitution(i));
                }
                let end = advance(cursor, 1, i)?;
                decoded.fragments.push(EditFragment {
                    start: cursor,
                    end,
                    reference: (pair[0].to_ascii_uppercase() as char).to_string(),
                    alternate: (pair[1].to_ascii_uppercase() as char).to_string(),
                    allele_id,
                });
                decoded.n_edits += 1;
                cursor = end;
            }
            b'+' => {
                if payload.is_empty() {
                    return Err(TraceError::EmptyPayload('+'));
                }
                decoded.fragments.push(EditFragment {
                    start: cursor,
                    end: cursor,
                    reference: String::new(),
                    alternate: payload.to_ascii_uppercase(),
                    allele_id,
                });
                decoded.n_edits += 1;
            }
            _ => {
                if payload.is_empty() {
                    return Err(TraceError::EmptyPayload('-'));
                }
                let end = advance(cursor, payload.len(), i)?;
                decoded.fragments.push(EditFragment {
                    start: cursor,
                    end,
                    reference: payload.to_ascii_uppercase(),
                    alternate: String::new(),
                    allele_id,
                });
                decoded.n_edits += 1;
                cursor = end;
            }
        }
        i = j;
    }

    decoded.ref_len = cursor;
    Ok(decoded)
}
