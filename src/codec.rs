//! Length-framed encoding of intermediate key/value records.
//!
//! Each record is `[key_len: u32][value_len: u32][key][value]` with
//! big-endian lengths. The framing is self-delimiting: a decoder stops
//! exactly at the end of the buffer or reports a truncated record, so
//! bucket files need no out-of-band record count and an empty bucket is
//! simply a zero-length file.

use anyhow::{bail, Result};
use bytes::{Buf, BufMut};

use crate::KeyValue;

/// Append `records` to `buf` in frame order.
pub fn encode_records(buf: &mut Vec<u8>, records: &[KeyValue]) {
    for kv in records {
        buf.put_u32(kv.key.len() as u32);
        buf.put_u32(kv.value.len() as u32);
        buf.put_slice(&kv.key);
        buf.put_slice(&kv.value);
    }
}

/// Decode a whole buffer of frames.
///
/// A truncated record is an error; it can only be observed on a file that
/// was not published through the atomic rename protocol.
pub fn decode_records(mut buf: &[u8]) -> Result<Vec<KeyValue>> {
    let mut records = Vec::new();
    while buf.has_remaining() {
        if buf.remaining() < 8 {
            bail!(
                "truncated record header ({} trailing bytes)",
                buf.remaining()
            );
        }
        let key_len = buf.get_u32() as usize;
        let value_len = buf.get_u32() as usize;
        if buf.remaining() < key_len + value_len {
            bail!(
                "truncated record body (want {} bytes, have {})",
                key_len + value_len,
                buf.remaining()
            );
        }
        let key = buf.copy_to_bytes(key_len);
        let value = buf.copy_to_bytes(value_len);
        records.push(KeyValue { key, value });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn empty_buffer_decodes_to_no_records() {
        assert!(decode_records(&[]).unwrap().is_empty());
    }

    #[test]
    fn frames_survive_encoding() {
        let records = vec![
            KeyValue::new(Bytes::from("foo"), Bytes::from_static(&[0, 1, 2])),
            KeyValue::new(Bytes::new(), Bytes::new()),
            KeyValue::new(Bytes::from("bar"), Bytes::from("1")),
        ];
        let mut buf = Vec::new();
        encode_records(&mut buf, &records);
        assert_eq!(decode_records(&buf).unwrap(), records);
    }

    #[test]
    fn truncation_is_detected() {
        let mut buf = Vec::new();
        encode_records(
            &mut buf,
            &[KeyValue::new(Bytes::from("key"), Bytes::from("value"))],
        );
        assert!(decode_records(&buf[..buf.len() - 1]).is_err());
        assert!(decode_records(&buf[..4]).is_err());
    }
}
