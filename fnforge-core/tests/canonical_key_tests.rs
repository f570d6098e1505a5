//! Cache keys must not depend on field insertion order

use fnforge_core::canonical::canonical_key;
use proptest::prelude::*;
use serde_json::{Map, Value};

fn object_from(pairs: &[(String, i64)]) -> Value {
    let mut map = Map::new();
    for (key, value) in pairs {
        map.insert(key.clone(), Value::from(*value));
    }
    Value::Object(map)
}

#[test]
fn test_struct_field_order_does_not_matter() {
    #[derive(serde::Serialize)]
    struct Forward<'a> {
        model: &'a str,
        messages: Vec<&'a str>,
    }

    #[derive(serde::Serialize)]
    struct Backward<'a> {
        messages: Vec<&'a str>,
        model: &'a str,
    }

    let forward = Forward {
        model: "gpt-4",
        messages: vec!["hello"],
    };
    let backward = Backward {
        messages: vec!["hello"],
        model: "gpt-4",
    };

    assert_eq!(canonical_key(&forward).unwrap(), canonical_key(&backward).unwrap());
}

proptest! {
    #[test]
    fn prop_insertion_order_independent(
        pairs in proptest::collection::btree_map("[a-z]{1,6}", any::<i64>(), 0..8)
    ) {
        let pairs: Vec<(String, i64)> = pairs.into_iter().collect();
        let mut reversed = pairs.clone();
        reversed.reverse();

        let nested_a = serde_json::json!({"outer": object_from(&pairs), "n": 1});
        let nested_b = serde_json::json!({"n": 1, "outer": object_from(&reversed)});

        prop_assert_eq!(canonical_key(&nested_a).unwrap(), canonical_key(&nested_b).unwrap());
    }
}
