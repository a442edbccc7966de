//! A MapReduce-compatible implementation of word count.
//!

use crate::*;
use anyhow::Result;
use bytes::{Buf, BufMut, Bytes, BytesMut};

pub fn map(kv: KeyValue, _aux: Bytes) -> MapOutput {
    let s = String::from_utf8(kv.value.as_ref().into())?;
    let words = s
        .split(|c: char| !c.is_alphabetic())
        .filter(|s| !s.is_empty())
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>();

    let mut key_buf = BytesMut::new();
    let mut value_buf = BytesMut::with_capacity(words.len() * 8);

    let iter = words.into_iter().map(move |word| {
        key_buf.put_slice(word.into_bytes().as_ref());
        value_buf.put_u64(1);

        let key = key_buf.split().freeze();
        let value = value_buf.split().freeze();

        Ok(KeyValue { key, value })
    });
    Ok(Box::new(iter))
}

pub fn reduce(
    _key: Bytes,
    values: Box<dyn Iterator<Item = Bytes> + '_>,
    _aux: Bytes,
) -> Result<Bytes> {
    let count: u64 = values.map(|mut value| value.get_u64()).sum();
    Ok(Bytes::from(count.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_repeated_words() {
        let kv = KeyValue::new(Bytes::from("in.txt"), Bytes::from("Foo bar, foo!"));
        let pairs = map(kv, Bytes::new())
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        let keys = pairs.iter().map(|kv| kv.key.clone()).collect::<Vec<_>>();
        assert_eq!(keys, vec!["foo", "bar", "foo"]);

        let values = pairs.into_iter().map(KeyValue::into_value);
        let total = reduce(Bytes::from("foo"), Box::new(values), Bytes::new()).unwrap();
        assert_eq!(total, Bytes::from("3"));
    }
}
