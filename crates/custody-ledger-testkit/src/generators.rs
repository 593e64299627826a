//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::{Map, Number, Value};

use custody_ledger_core::{ServiceDomain, ServiceType};

/// Strategy for an arbitrary JSON value a record might carry.
pub fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        (-1.0e9f64..1.0e9)
            .prop_filter_map("finite", Number::from_f64)
            .prop_map(Value::Number),
        "[a-zA-Z0-9 _-]{0,16}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z_]{1,8}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

/// Strategy for the entries of a JSON object, as an ordered list.
pub fn object_entries() -> impl Strategy<Value = Vec<(String, Value)>> {
    prop::collection::btree_map("[a-z_]{1,12}", json_value(), 0..8)
        .prop_map(|m| m.into_iter().collect())
}

/// Build an object inserting entries in the given order.
pub fn object_from_entries<'a>(entries: impl IntoIterator<Item = &'a (String, Value)>) -> Value {
    let mut map = Map::new();
    for (k, v) in entries {
        map.insert(k.clone(), v.clone());
    }
    Value::Object(map)
}

/// Parameters for an arbitrary service record.
#[derive(Debug, Clone)]
pub struct ServiceParams {
    pub asset_id: String,
    pub domain: ServiceDomain,
    pub service_type: ServiceType,
    pub details: Map<String, Value>,
}

impl Arbitrary for ServiceParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            "[a-z0-9-]{1,24}",
            prop::sample::select(ServiceDomain::ALL.to_vec()),
            prop::sample::select(ServiceType::ALL.to_vec()),
            object_entries(),
        )
            .prop_map(|(asset_id, domain, service_type, entries)| ServiceParams {
                asset_id,
                domain,
                service_type,
                details: entries.into_iter().collect(),
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custody_ledger_core::canonical_bytes;

    proptest! {
        #[test]
        fn insertion_order_does_not_change_encoding(entries in object_entries()) {
            let forward = object_from_entries(entries.iter());
            let reversed = object_from_entries(entries.iter().rev());
            prop_assert_eq!(canonical_bytes(&forward), canonical_bytes(&reversed));
        }
    }
}
