//! Canonical CBOR encoding for deterministic serialization.
//!
//! This module implements RFC 8949 Core Deterministic Encoding for the
//! structures that are signed or hashed:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats
//!
//! The canonical encoding is what makes "byte-identical" meaningful: an
//! unchanged configuration item encodes to the same bytes on every node, and
//! a signature over those bytes stays valid across re-serialization.

use crate::block::BlockHeader;
use crate::configuration::ConfigurationItem;
use crate::crypto::Blake3Hash;
use crate::envelope::{Envelope, EnvelopeHeader};

/// Domain separation for configuration item signatures.
pub const ITEM_SIGN_DOMAIN: &[u8] = b"orderer-config-item-v0:";

/// Domain separation for envelope signatures.
pub const ENVELOPE_SIGN_DOMAIN: &[u8] = b"orderer-envelope-v0:";

/// Field keys (integer keys for compact encoding).
///
/// Keys 0-23 encode as single bytes in CBOR.
mod keys {
    pub mod item {
        pub const HEADER: u64 = 0;
        pub const ITEM_TYPE: u64 = 1;
        pub const KEY: u64 = 2;
        pub const LAST_MODIFIED: u64 = 3;
        pub const MODIFICATION_POLICY: u64 = 4;
        pub const VALUE: u64 = 5;
    }

    pub mod chain_header {
        pub const CHAIN_ID: u64 = 0;
    }

    pub mod envelope {
        pub const HEADER: u64 = 0;
        pub const DATA: u64 = 1;
        pub const SIGNATURE: u64 = 2;
    }

    pub mod envelope_header {
        pub const KIND: u64 = 0;
        pub const CHAIN_ID: u64 = 1;
        pub const CREATOR: u64 = 2;
    }

    pub mod block_header {
        pub const NUMBER: u64 = 0;
        pub const PREVIOUS_HASH: u64 = 1;
        pub const DATA_HASH: u64 = 2;
    }
}

/// The subset of CBOR the canonical structures need.
enum Value<'a> {
    Uint(u64),
    Bytes(&'a [u8]),
    Text(&'a str),
    Null,
    Array(Vec<Value<'a>>),
    Map(Vec<(u64, Value<'a>)>),
}

/// Encode a configuration item (header included) to canonical bytes.
pub fn canonical_item_bytes(item: &ConfigurationItem) -> Vec<u8> {
    encode(&item_value(item))
}

/// Construct the message a configuration item signer signs.
pub fn item_signed_message(item: &ConfigurationItem) -> Vec<u8> {
    let mut buf = ITEM_SIGN_DOMAIN.to_vec();
    encode_value_to(&mut buf, &item_value(item));
    buf
}

/// Encode an envelope (header, data and signature) to canonical bytes.
pub fn canonical_envelope_bytes(envelope: &Envelope) -> Vec<u8> {
    encode(&envelope_value(envelope))
}

/// Construct the message an envelope creator signs: header || data.
pub fn envelope_signed_message(envelope: &Envelope) -> Vec<u8> {
    let mut buf = ENVELOPE_SIGN_DOMAIN.to_vec();
    encode_value_to(&mut buf, &envelope_header_value(&envelope.header));
    encode_bytes(&mut buf, &envelope.data);
    buf
}

/// Encode a block header to canonical bytes.
pub fn canonical_block_header_bytes(header: &BlockHeader) -> Vec<u8> {
    encode(&Value::Map(vec![
        (keys::block_header::NUMBER, Value::Uint(header.number)),
        (
            keys::block_header::PREVIOUS_HASH,
            Value::Bytes(header.previous_hash.as_bytes()),
        ),
        (
            keys::block_header::DATA_HASH,
            Value::Bytes(header.data_hash.as_bytes()),
        ),
    ]))
}

/// Hash over the canonical encoding of a block's envelopes, as an array.
pub fn block_data_hash(envelopes: &[Envelope]) -> Blake3Hash {
    let values = envelopes.iter().map(envelope_value).collect();
    Blake3Hash::hash(&encode(&Value::Array(values)))
}

fn item_value(item: &ConfigurationItem) -> Value<'_> {
    Value::Map(vec![
        (
            keys::item::HEADER,
            Value::Map(vec![(
                keys::chain_header::CHAIN_ID,
                Value::Text(item.header.chain_id.as_str()),
            )]),
        ),
        (keys::item::ITEM_TYPE, Value::Uint(item.item_type.to_u16().into())),
        (keys::item::KEY, Value::Text(&item.key)),
        (keys::item::LAST_MODIFIED, Value::Uint(item.last_modified)),
        (
            keys::item::MODIFICATION_POLICY,
            Value::Text(&item.modification_policy),
        ),
        (keys::item::VALUE, Value::Bytes(&item.value)),
    ])
}

fn envelope_header_value(header: &EnvelopeHeader) -> Value<'_> {
    let creator = match &header.creator {
        Some(identity) => Value::Bytes(identity.as_bytes()),
        None => Value::Null,
    };
    Value::Map(vec![
        (keys::envelope_header::KIND, Value::Uint(header.kind.to_u16().into())),
        (keys::envelope_header::CHAIN_ID, Value::Text(header.chain_id.as_str())),
        (keys::envelope_header::CREATOR, creator),
    ])
}

fn envelope_value(envelope: &Envelope) -> Value<'_> {
    Value::Map(vec![
        (keys::envelope::HEADER, envelope_header_value(&envelope.header)),
        (keys::envelope::DATA, Value::Bytes(&envelope.data)),
        (keys::envelope::SIGNATURE, Value::Bytes(&envelope.signature)),
    ])
}

fn encode(value: &Value<'_>) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value);
    buf
}

/// Recursively encode a value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value<'_>) {
    match value {
        Value::Uint(n) => encode_uint(buf, 0, *n),
        Value::Bytes(b) => encode_bytes(buf, b),
        Value::Text(s) => encode_text(buf, s),
        Value::Null => buf.push(0xf6),
        Value::Array(items) => {
            encode_uint(buf, 4, items.len() as u64);
            for item in items {
                encode_value_to(buf, item);
            }
        }
        Value::Map(entries) => encode_map_canonical(buf, entries),
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a byte string (major type 2).
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Encode a text string (major type 3).
fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(u64, Value<'_>)]) {
    let mut pairs: Vec<(Vec<u8>, &Value<'_>)> = entries
        .iter()
        .map(|(k, v)| {
            let mut key_buf = Vec::new();
            encode_uint(&mut key_buf, 0, *k);
            (key_buf, v)
        })
        .collect();

    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::ItemType;
    use crate::types::ChainId;

    fn item() -> ConfigurationItem {
        ConfigurationItem::new(ChainId::from("chain"), ItemType::Policy, "Admins")
            .with_value(vec![1, 2, 3])
            .with_modification_policy("Admins")
            .with_last_modified(300)
    }

    #[test]
    fn test_item_encoding_deterministic() {
        assert_eq!(canonical_item_bytes(&item()), canonical_item_bytes(&item().clone()));
    }

    #[test]
    fn test_item_encoding_distinguishes_fields() {
        let base = canonical_item_bytes(&item());
        assert_ne!(base, canonical_item_bytes(&item().with_last_modified(301)));
        assert_ne!(base, canonical_item_bytes(&item().with_modification_policy("Writers")));
        assert_ne!(base, canonical_item_bytes(&item().with_value(vec![1, 2])));
    }

    #[test]
    fn test_signed_message_is_domain_separated() {
        let msg = item_signed_message(&item());
        assert!(msg.starts_with(ITEM_SIGN_DOMAIN));
        assert_eq!(&msg[ITEM_SIGN_DOMAIN.len()..], canonical_item_bytes(&item()).as_slice());
    }

    #[test]
    fn test_integer_encoding() {
        let mut buf = Vec::new();

        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        buf.clear();
        encode_uint(&mut buf, 0, 256);
        assert_eq!(buf, vec![0x19, 0x01, 0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, 1 << 32);
        assert_eq!(buf, vec![0x1b, 0, 0, 0, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn test_map_key_ordering() {
        let mut buf = Vec::new();
        let entries = vec![
            (8, Value::Uint(80)),
            (0, Value::Uint(0)),
            (5, Value::Uint(50)),
        ];
        encode_map_canonical(&mut buf, &entries);

        assert_eq!(buf, vec![0xa3, 0x00, 0x00, 0x05, 0x18, 50, 0x08, 0x18, 80]);
    }

    #[test]
    fn test_envelope_signature_not_in_signed_message() {
        let mut env = Envelope::message(ChainId::from("chain"), b"data".to_vec());
        let before = envelope_signed_message(&env);
        env.signature = vec![0xaa; 64].into();
        assert_eq!(before, envelope_signed_message(&env));
        assert_ne!(
            canonical_envelope_bytes(&env),
            canonical_envelope_bytes(&Envelope::message(ChainId::from("chain"), b"data".to_vec()))
        );
    }

    proptest::proptest! {
        #[test]
        fn prop_uint_is_valid_cbor(n: u64) {
            let mut buf = Vec::new();
            encode_uint(&mut buf, 0, n);
            let decoded: u64 = ciborium::from_reader(buf.as_slice()).unwrap();
            proptest::prop_assert_eq!(decoded, n);
        }

        #[test]
        fn prop_item_bytes_decode_as_cbor(key in "[a-zA-Z]{0,40}", seq: u64, value: Vec<u8>) {
            let item = ConfigurationItem::new(ChainId::from("chain"), ItemType::Orderer, key)
                .with_last_modified(seq)
                .with_value(value);
            let bytes = canonical_item_bytes(&item);
            let parsed: Result<ciborium::value::Value, _> = ciborium::from_reader(bytes.as_slice());
            proptest::prop_assert!(parsed.is_ok());
        }
    }
}
