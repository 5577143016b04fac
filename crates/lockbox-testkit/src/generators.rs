//! Proptest generators for property-based testing.

use proptest::prelude::*;

use lockbox_core::{FieldMap, PrivateKey, RecordType};
use lockbox_crypto::{AccessKey, KeyPair};

/// Generate a keypair from a random seed.
pub fn keypair() -> impl Strategy<Value = KeyPair> {
    any::<[u8; 32]>().prop_map(|seed| KeyPair::from_private(PrivateKey::from_bytes(seed)))
}

/// Generate an access key.
pub fn access_key() -> impl Strategy<Value = AccessKey> {
    any::<[u8; 32]>().prop_map(AccessKey::from_bytes)
}

/// Generate a valid record type.
pub fn record_type() -> impl Strategy<Value = RecordType> {
    "[a-z][a-z0-9_-]{0,23}".prop_map(|name| {
        RecordType::new(name).expect("pattern yields valid record types")
    })
}

/// Generate a field name.
pub fn field_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,15}".prop_map(String::from)
}

/// Generate a field value, including empty and non-ASCII strings.
pub fn field_value(max_len: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(any::<char>(), 0..=max_len).prop_map(|chars| chars.into_iter().collect())
}

/// Generate a field map with up to `max_fields` entries.
pub fn field_map(max_fields: usize) -> impl Strategy<Value = FieldMap> {
    prop::collection::btree_map(field_name(), field_value(64), 0..=max_fields)
}

/// Parameters for writing a record.
#[derive(Debug, Clone)]
pub struct RecordParams {
    pub record_type: RecordType,
    pub data: FieldMap,
    pub plain: FieldMap,
}

impl Arbitrary for RecordParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (record_type(), field_map(8), field_map(3))
            .prop_map(|(record_type, data, plain)| RecordParams {
                record_type,
                data,
                plain,
            })
            .boxed()
    }
}
