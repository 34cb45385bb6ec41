//! Property-based tests for export round-trips and merge laws.

use layerconf::{Node, Value};
use proptest::prelude::*;
use serde_json::Value as Json;

fn scalar() -> impl Strategy<Value = Json> {
    prop_oneof![
        Just(Json::Null),
        any::<bool>().prop_map(Json::from),
        any::<i64>().prop_map(Json::from),
        prop::num::f64::NORMAL.prop_map(Json::from),
        "[a-z ]{0,8}".prop_map(Json::from),
    ]
}

fn object<S: Strategy<Value = Json>>(keys: &'static str, values: S, size: usize) -> impl Strategy<Value = Json> {
    prop::collection::btree_map(keys, values, 0..size)
        .prop_map(|entries| Json::Object(entries.into_iter().collect()))
}

fn tree() -> impl Strategy<Value = Json> {
    scalar().prop_recursive(4, 64, 5, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..5).prop_map(Json::Array),
            object("[a-e]{1,3}", inner, 5),
        ]
    })
}

fn root() -> impl Strategy<Value = Json> {
    prop_oneof![
        object("[a-e]{1,3}", tree(), 6),
        prop::collection::vec(tree(), 0..6).prop_map(Json::Array),
    ]
}

/// Values that merge without variant conflicts: scalars or flat maps.
fn layer_value() -> impl Strategy<Value = Json> {
    prop_oneof![scalar(), object("[x-z]", scalar(), 3)]
}

fn build(json: &Json) -> Node {
    Node::create(Value::from(json.clone())).unwrap()
}

fn export(node: &Node) -> Value {
    node.to_container(false).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Exporting, rebuilding and exporting again is a fixpoint.
    #[test]
    fn test_export_roundtrip(input in root()) {
        let tree = build(&input);
        let exported = export(&tree);
        let rebuilt = Node::create(exported.clone()).unwrap();
        prop_assert_eq!(export(&rebuilt), exported);
        prop_assert_eq!(export(&tree).to_json().unwrap(), input);
    }

    /// Merging a tree with a copy of itself changes nothing.
    #[test]
    fn test_merge_with_self_is_idempotent(input in root()) {
        let tree = build(&input);
        let before = export(&tree);
        tree.merge_with(&tree).unwrap();
        prop_assert_eq!(export(&tree), before);
    }

    /// With disjoint keys, merging B then C equals merging the pre-merged
    /// (B then C).
    #[test]
    fn test_disjoint_layers_associate(
        a in object("[bc]_[a-c]", layer_value(), 6),
        b in object("b_[a-c]", layer_value(), 4),
        c in object("c_[a-c]", layer_value(), 4),
    ) {
        let sequential = build(&a);
        sequential.merge_with(build(&b)).unwrap();
        sequential.merge_with(build(&c)).unwrap();

        let combined = build(&b);
        combined.merge_with(build(&c)).unwrap();
        let at_once = build(&a);
        at_once.merge_with(&combined).unwrap();

        prop_assert_eq!(export(&sequential), export(&at_once));
    }

    /// The source of a merge is never modified.
    #[test]
    fn test_merge_leaves_source_untouched(a in root(), b in root()) {
        let dest = build(&a);
        let source = build(&b);
        let _ = dest.merge_with(&source);
        prop_assert_eq!(export(&source).to_json().unwrap(), b);
    }
}
