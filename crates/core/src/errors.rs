//! Error taxonomy for `Parser::decode`.
//!
//! Any of these aborts the decode; the output flow must not be consumed.
//! Metadata-lookup failures and absent providers are never errors, and
//! unsupported packet layers are silently skipped by the layer decoder.

use std::fmt;

use thiserror::Error;

use crate::event::HeaderError;
use crate::layers::LayerError;

/// Which monitor event header failed to decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventVariant {
    Drop,
    Trace,
    PolicyVerdict,
    DebugCapture,
}

impl fmt::Display for EventVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventVariant::Drop => "drop",
            EventVariant::Trace => "trace",
            EventVariant::PolicyVerdict => "policy verdict",
            EventVariant::DebugCapture => "debug capture",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty data")]
    EmptyData,

    #[error("unknown event type: {0}")]
    InvalidType(u8),

    #[error("failed to parse {variant}: {source}")]
    Header {
        variant: EventVariant,
        #[source]
        source: HeaderError,
    },

    /// The header's declared packet offset points past the event buffer.
    #[error("not enough bytes to decode: offset {offset} exceeds length {len}")]
    Truncated { len: usize, offset: usize },

    #[error(transparent)]
    Layer(#[from] LayerError),

    #[error("overlay: {0}")]
    Overlay(#[source] LayerError),
}

impl ParseError {
    pub(crate) fn header(variant: EventVariant, source: HeaderError) -> Self {
        ParseError::Header { variant, source }
    }
}
