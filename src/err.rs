use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TnefError>;

#[derive(Debug, Error)]
pub enum TnefError {
    #[error("stream truncated while reading {what} at offset {offset} (need {need} bytes, have {have})")]
    TruncatedStream {
        what: &'static str,
        offset: u64,
        need: usize,
        have: usize,
    },

    #[error("invalid TNEF signature, expected `0x223E9F78`, found `0x{found:08X}`")]
    InvalidSignature { found: u32 },

    #[error("offset {offset}: malformed attribute 0x{tag:08X} (level 0x{level:02X}): {message}")]
    MalformedAttribute {
        offset: u64,
        level: u8,
        tag: u32,
        message: &'static str,
    },

    #[error("offset {offset}: checksum of attribute 0x{tag:08X} is invalid (declared 0x{declared:04X}, computed 0x{computed:04X})")]
    ChecksumMismatch {
        offset: u64,
        tag: u32,
        declared: u16,
        computed: u16,
    },

    #[error("property type `0x{prop_type:04X}` cannot be interpreted")]
    UnsupportedPropertyType { prop_type: u16 },

    #[error("failed to decode {what}: {message}")]
    ValueDecodeFailed { what: &'static str, message: String },

    #[error("offset {offset}: an I/O error has occurred while reading {what}")]
    ReadFailed {
        what: &'static str,
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("failed to write TNEF output")]
    WriteFailed(#[source] io::Error),
}

impl TnefError {
    /// Errors after which the position of the next attribute is unknown.
    pub fn breaks_framing(&self) -> bool {
        matches!(
            self,
            TnefError::TruncatedStream { .. }
                | TnefError::InvalidSignature { .. }
                | TnefError::ReadFailed { .. }
                | TnefError::WriteFailed(_)
        )
    }

    pub(crate) fn value_decode(what: &'static str, message: impl ToString) -> Self {
        TnefError::ValueDecodeFailed {
            what,
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncation_breaks_framing() {
        let err = TnefError::TruncatedStream {
            what: "attribute payload",
            offset: 14,
            need: 10,
            have: 3,
        };
        assert!(err.breaks_framing());
        assert_eq!(
            err.to_string(),
            "stream truncated while reading attribute payload at offset 14 (need 10 bytes, have 3)"
        );
    }

    #[test]
    fn test_malformed_attribute_is_contained() {
        let err = TnefError::MalformedAttribute {
            offset: 6,
            level: 7,
            tag: 0x0006_9003,
            message: "unknown attribute level",
        };
        assert!(!err.breaks_framing());
        assert!(!TnefError::UnsupportedPropertyType { prop_type: 0x0999 }.breaks_framing());
    }
}
