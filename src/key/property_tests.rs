//! Property-Based Tests for Key Derivation
//!
//! Uses proptest to check determinism and injectivity of derived keys.

use proptest::prelude::*;

use crate::codec::Value;
use crate::key::{CallArgs, KeyBuilder, Role, KEY_SEPARATOR};

// == Strategies ==
/// Scalar arguments, including strings full of separator characters.
fn arg_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        "[a-z0-9:,=%*?\\[\\]\\\\ \"]{0,12}".prop_map(Value::Str),
    ]
}

fn role_strategy() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::Plain),
        Just(Role::ResponseHandler),
        Just(Role::BoundMethod),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Identical inputs always produce identical keys.
    #[test]
    fn prop_key_deterministic(
        role in role_strategy(),
        positional in prop::collection::vec(arg_strategy(), 0..5),
        keyword in prop::collection::btree_map("[a-z]{1,4}", arg_strategy(), 0..4),
    ) {
        let mut args = CallArgs::positional(positional);
        for (name, value) in keyword {
            args = args.kwarg(name, value);
        }
        let first = KeyBuilder::new("prop", role).build(&args).unwrap();
        let second = KeyBuilder::new("prop", role).build(&args.clone()).unwrap();
        prop_assert_eq!(first, second);
    }

    // Keyword insertion order never changes the key.
    #[test]
    fn prop_keyword_order_irrelevant(
        keyword in prop::collection::btree_map("[a-z]{1,4}", arg_strategy(), 1..5),
    ) {
        let builder = KeyBuilder::new("prop", Role::Plain);
        let forward = keyword
            .iter()
            .fold(CallArgs::new(), |args, (k, v)| args.kwarg(k.clone(), v.clone()));
        let backward = keyword
            .iter()
            .rev()
            .fold(CallArgs::new(), |args, (k, v)| args.kwarg(k.clone(), v.clone()));
        prop_assert_eq!(builder.build(&forward).unwrap(), builder.build(&backward).unwrap());
    }

    // Distinct positional argument lists never share a key.
    #[test]
    fn prop_distinct_positional_distinct_keys(
        a in prop::collection::vec(arg_strategy(), 0..4),
        b in prop::collection::vec(arg_strategy(), 0..4),
    ) {
        prop_assume!(a != b);
        let builder = KeyBuilder::new("prop", Role::Plain).with_hash_threshold(usize::MAX);
        let key_a = builder.build(&CallArgs::positional(a)).unwrap();
        let key_b = builder.build(&CallArgs::positional(b)).unwrap();
        prop_assert_ne!(key_a, key_b);
    }

    // Exactly two separators survive escaping: after the prefix and between parts.
    #[test]
    fn prop_separator_count_fixed(
        positional in prop::collection::vec(arg_strategy(), 0..4),
        keyword in prop::collection::btree_map("[a-z:]{1,4}", arg_strategy(), 0..3),
    ) {
        let mut args = CallArgs::positional(positional);
        for (name, value) in keyword {
            args = args.kwarg(name, value);
        }
        let key = KeyBuilder::new("a:b", Role::Plain)
            .with_hash_threshold(usize::MAX)
            .build(&args)
            .unwrap();
        prop_assert_eq!(key.as_str().matches(KEY_SEPARATOR).count(), 2);
    }
}
