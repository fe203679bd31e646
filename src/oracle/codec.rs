//! Cleartext payload codec
//!
//! The oracle returns cleartexts ABI-style: one 32-byte big-endian word per
//! value, in the order the handles were submitted. A record payload is
//! exactly two words: `uint32 value`, `bool flag`.

use crate::fhe::ClearValue;

/// ABI word length
pub const WORD_LEN: usize = 32;

/// Length of a record payload (value word + flag word)
pub const RECORD_PAYLOAD_LEN: usize = 2 * WORD_LEN;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("payload must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("value word does not fit in uint32")]
    ValueOutOfRange,

    #[error("flag word is not a boolean")]
    InvalidBool,

    #[error("payload is not valid hex: {0}")]
    InvalidHex(String),
}

/// Encode cleartexts, one word each
pub fn encode_cleartexts(values: &[ClearValue]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(values.len() * WORD_LEN);
    for value in values {
        let mut word = [0u8; WORD_LEN];
        match value {
            ClearValue::U32(v) => word[WORD_LEN - 4..].copy_from_slice(&v.to_be_bytes()),
            ClearValue::Bool(b) => word[WORD_LEN - 1] = u8::from(*b),
        }
        payload.extend_from_slice(&word);
    }
    payload
}

/// Encode a record's `(value, flag)` pair
pub fn encode_record_payload(value: u32, flag: bool) -> Vec<u8> {
    encode_cleartexts(&[ClearValue::U32(value), ClearValue::Bool(flag)])
}

/// Decode a record payload into `(value, flag)`
pub fn decode_record_payload(payload: &[u8]) -> Result<(u32, bool), CodecError> {
    if payload.len() != RECORD_PAYLOAD_LEN {
        return Err(CodecError::InvalidLength {
            expected: RECORD_PAYLOAD_LEN,
            actual: payload.len(),
        });
    }
    let (value_word, flag_word) = payload.split_at(WORD_LEN);
    Ok((decode_u32_word(value_word)?, decode_bool_word(flag_word)?))
}

/// Parse a hex payload as delivered over HTTP
pub fn payload_from_hex(encoded: &str) -> Result<Vec<u8>, CodecError> {
    crate::crypto::CryptoUtils::from_hex(encoded).map_err(|e| CodecError::InvalidHex(e.to_string()))
}

fn decode_u32_word(word: &[u8]) -> Result<u32, CodecError> {
    let (padding, tail) = word.split_at(WORD_LEN - 4);
    if padding.iter().any(|b| *b != 0) {
        return Err(CodecError::ValueOutOfRange);
    }
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(tail);
    Ok(u32::from_be_bytes(bytes))
}

fn decode_bool_word(word: &[u8]) -> Result<bool, CodecError> {
    let (padding, last) = word.split_at(WORD_LEN - 1);
    if padding.iter().any(|b| *b != 0) {
        return Err(CodecError::InvalidBool);
    }
    match last[0] {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(CodecError::InvalidBool),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_payload_layout() {
        let payload = encode_record_payload(42, true);
        assert_eq!(payload.len(), RECORD_PAYLOAD_LEN);
        assert_eq!(payload[31], 42);
        assert_eq!(payload[63], 1);
        assert!(payload[..28].iter().all(|b| *b == 0));

        assert_eq!(decode_record_payload(&payload).unwrap(), (42, true));
    }

    #[test]
    fn test_decode_extremes() {
        let payload = encode_record_payload(u32::MAX, false);
        assert_eq!(decode_record_payload(&payload).unwrap(), (u32::MAX, false));
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let payload = encode_record_payload(1, true);
        assert_eq!(
            decode_record_payload(&payload[..63]),
            Err(CodecError::InvalidLength { expected: 64, actual: 63 })
        );
        assert!(decode_record_payload(&[]).is_err());
    }

    #[test]
    fn test_decode_rejects_out_of_range_value() {
        let mut payload = encode_record_payload(1, true);
        payload[27] = 1;
        assert_eq!(decode_record_payload(&payload), Err(CodecError::ValueOutOfRange));
    }

    #[test]
    fn test_decode_rejects_non_boolean_flag() {
        let mut payload = encode_record_payload(1, true);
        payload[63] = 2;
        assert_eq!(decode_record_payload(&payload), Err(CodecError::InvalidBool));

        let mut payload = encode_record_payload(1, false);
        payload[40] = 1;
        assert_eq!(decode_record_payload(&payload), Err(CodecError::InvalidBool));
    }

    #[test]
    fn test_payload_from_hex() {
        let payload = encode_record_payload(9, false);
        let encoded = format!("0x{}", hex::encode(&payload));
        assert_eq!(payload_from_hex(&encoded).unwrap(), payload);
        assert!(matches!(payload_from_hex("0xnothex"), Err(CodecError::InvalidHex(_))));
    }
}
