//! End-to-end conformance tests for schema conversion.
//!
//! Each test runs against every store returned by
//! [`schemagraph_conformance::stores`]: the schema is staged, converted by the
//! real pipeline, and the produced structure is read back through the
//! `GraphStore` trait.
//!
//! # Coverage
//!
//! | Test | Behavior |
//! |------|----------|
//! | `nested_schema_materializes_every_entity` | objects, lists, tuples, annotations |
//! | `reserved_ids_match_the_estimate` | estimate equals consumption |
//! | `required_markers_hang_off_the_parent` | `required` handling |
//! | `tuple_items_are_indexed` | tuple naming and parenting |
//! | `boolean_schema_is_a_single_object_entity` | `true` / `false` schemas |
//! | `schema_without_shape_writes_nothing` | `{}` and `null` types |
//! | `missing_schema_document_is_reported` | document fetch errors |
//! | `missing_container_id_is_reported` | configuration errors |
//! | `rejected_batch_leaves_no_trace` | batch atomicity |
//! | `concurrent_reservations_are_disjoint` | id reservation |
//! | `log_depth_controls_trace_rendering` | trace depth |

use std::collections::BTreeSet;
use std::sync::Arc;

use schemagraph::{estimate, LinkId, Operation, SchemaNode, WellKnownIds};
use schemagraph_conformance::{stores, Harness};
use schemagraph_converter::{ConvertError, StoreError};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn order_schema() -> Value {
    json!({
        "title": "Order",
        "type": "object",
        "properties": {
            "id": { "type": "string" },
            "tags": { "type": "array", "items": { "type": "string" } },
            "pos": {
                "type": "array",
                "items": [{ "type": "number" }, { "type": "integer" }]
            },
            "customer": {
                "type": "object",
                "properties": { "name": { "type": "string" } },
                "required": ["name"]
            }
        },
        "required": ["id", "customer"]
    })
}

// ---------------------------------------------------------------------------
// Structure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn nested_schema_materializes_every_entity() {
    for (label, store) in stores() {
        let h = Harness::stage(label, store, &order_schema()).await;
        let outcome = h
            .convert()
            .await
            .unwrap_or_else(|f| panic!("[{label}] conversion failed: {f}"));

        // Entities: Order, id, tags (item), pos, pos[0], pos[1], customer, name.
        let types = h.created_of_kind(h.kinds.type_).await;
        assert_eq!(types.len(), 8, "[{label}]");
        let values = h.created_of_kind(h.kinds.value).await;
        assert_eq!(values.len(), 8, "[{label}]");

        let annotations = h.annotations().await;
        for name in [
            "Order", "OrderValue", "id", "idValue", "idRequired", "tags", "tagsValue", "pos",
            "posValue", "pos[0]", "pos[0]Value", "pos[1]", "pos[1]Value", "customer",
            "customerValue", "customerRequired", "name", "nameValue", "nameRequired",
        ] {
            assert!(annotations.contains_key(name), "[{label}] missing {name:?}");
        }
        assert_eq!(annotations.len(), 19, "[{label}]");

        // The root Type node hangs off nothing and is reported.
        let root = outcome.result.root_link_id.expect("root");
        assert_eq!(annotations["Order"], root, "[{label}]");
        let root_link = h.store.get_link(root).await.unwrap().unwrap();
        assert_eq!((root_link.from, root_link.to), (None, None), "[{label}]");

        // Value edges point at the right primitive.
        let value_target = |name: &str| {
            let v = annotations[&format!("{name}Value")];
            values.iter().find(|l| l.id == v).and_then(|l| l.to)
        };
        assert_eq!(value_target("Order"), Some(h.kinds.object), "[{label}]");
        assert_eq!(value_target("id"), Some(h.kinds.string), "[{label}]");
        assert_eq!(value_target("tags"), Some(h.kinds.string), "[{label}]");
        assert_eq!(value_target("pos"), Some(h.kinds.object), "[{label}]");
        assert_eq!(value_target("pos[1]"), Some(h.kinds.number), "[{label}]");

        // Children are parented on their enclosing Type node.
        let name_link = h.store.get_link(annotations["name"]).await.unwrap().unwrap();
        let customer = annotations["customer"];
        assert_eq!(name_link.from, Some(customer), "[{label}]");
        assert_eq!(name_link.to, Some(customer), "[{label}]");

        assert_eq!(h.added().await, outcome.result.reserved, "[{label}]");
    }
}

#[tokio::test]
async fn reserved_ids_match_the_estimate() {
    let samples = [
        json!(true),
        json!({ "type": "string" }),
        json!({ "type": "array", "items": { "type": "array", "items": { "type": "number" } } }),
        json!({ "type": "array" }),
        json!({ "properties": { "a": {}, "b": { "type": "boolean" } }, "required": ["a", "b"] }),
        order_schema(),
    ];
    for (label, store) in stores() {
        for schema in &samples {
            let h = Harness::stage(label, Arc::clone(&store), schema).await;
            let outcome = h.convert().await.unwrap();
            let expected = estimate(&SchemaNode::from(schema));
            assert_eq!(outcome.result.reserved, expected, "[{label}] {schema}");
            assert_eq!(h.added().await, expected, "[{label}] {schema}");
        }
    }
}

#[tokio::test]
async fn required_markers_hang_off_the_parent() {
    let schema = json!({
        "title": "P",
        "properties": {
            "a": { "type": "string" },
            "b": { "type": "string" },
            "ghost": {}
        },
        "required": ["a", "ghost", "missing"]
    });
    for (label, store) in stores() {
        let h = Harness::stage(label, store, &schema).await;
        let outcome = h.convert().await.unwrap();
        let root = outcome.result.root_link_id.unwrap();

        let required = h.created_of_kind(h.kinds.required).await;
        assert_eq!(required.len(), 1, "[{label}] only `a` is marked");
        assert_eq!(required[0].from, Some(root), "[{label}]");
        assert_eq!(required[0].to, Some(root), "[{label}]");

        let annotations = h.annotations().await;
        assert_eq!(annotations["aRequired"], required[0].id, "[{label}]");
        assert!(!annotations.contains_key("bRequired"), "[{label}]");
        assert!(!annotations.contains_key("ghost"), "[{label}]");
    }
}

#[tokio::test]
async fn tuple_items_are_indexed() {
    let schema = json!({
        "title": "Pair",
        "type": "array",
        "items": [{ "type": "string" }, true]
    });
    for (label, store) in stores() {
        let h = Harness::stage(label, store, &schema).await;
        let outcome = h.convert().await.unwrap();
        let wrapper = outcome.result.root_link_id.unwrap();

        let annotations = h.annotations().await;
        assert_eq!(annotations["Pair"], wrapper, "[{label}]");
        for item in ["Pair[0]", "Pair[1]"] {
            let link = h.store.get_link(annotations[item]).await.unwrap().unwrap();
            assert_eq!(link.from, Some(wrapper), "[{label}] {item}");
        }
        assert_eq!(outcome.result.reserved, 12, "[{label}]");
    }
}

#[tokio::test]
async fn boolean_schema_is_a_single_object_entity() {
    for (label, store) in stores() {
        for schema in [json!(true), json!(false)] {
            let h = Harness::stage(label, Arc::clone(&store), &schema).await;
            let outcome = h.convert().await.unwrap();
            assert_eq!(outcome.result.reserved, 4, "[{label}]");
            let annotations = h.annotations().await;
            let keys: BTreeSet<&str> = annotations.keys().map(String::as_str).collect();
            assert_eq!(
                keys,
                BTreeSet::from(["Schema", "SchemaValue"]),
                "[{label}]"
            );
        }
    }
}

#[tokio::test]
async fn schema_without_shape_writes_nothing() {
    for (label, store) in stores() {
        for schema in [json!({}), json!({ "type": "null" }), json!({ "type": "object" })] {
            let h = Harness::stage(label, Arc::clone(&store), &schema).await;
            let outcome = h.convert().await.unwrap();
            if schema.get("type") == Some(&json!("object")) {
                // An object with no properties still materializes itself.
                assert_eq!(outcome.result.reserved, 4, "[{label}]");
            } else {
                assert_eq!(outcome.result.reserved, 0, "[{label}] {schema}");
                assert_eq!(outcome.result.root_link_id, None, "[{label}]");
                assert_eq!(h.added().await, 0, "[{label}]");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_schema_document_is_reported() {
    for (label, store) in stores() {
        let h = Harness::stage(label, store, &json!(true)).await;
        let kinds = WellKnownIds::bootstrap();
        let bare = h.store.insert_link(kinds.type_, None, None).await.unwrap();
        let trigger = h
            .store
            .insert_link(kinds.type_, Some(h.staged.config_link_id), Some(bare))
            .await
            .unwrap();

        let failure = schemagraph_converter::Converter::new(Arc::clone(&h.store))
            .convert(trigger)
            .await
            .unwrap_err();
        assert!(
            matches!(
                failure.error,
                ConvertError::MissingDocument { document: "schema", .. }
            ),
            "[{label}] {failure}"
        );
        assert_eq!(failure.error.code(), "missing_document");
        assert!(!failure.logs.is_empty(), "[{label}]");
    }
}

#[tokio::test]
async fn missing_container_id_is_reported() {
    for (label, store) in stores() {
        let h = Harness::stage(label, store, &order_schema()).await;
        h.store
            .set_object_value(h.staged.config_link_id, &json!({ "logDepth": 2 }))
            .await
            .unwrap();

        let failure = h.convert().await.unwrap_err();
        assert!(
            matches!(failure.error, ConvertError::InvalidConfiguration(_)),
            "[{label}] {failure}"
        );
        assert_eq!(h.added().await, 0, "[{label}]");
    }
}

#[tokio::test]
async fn rejected_batch_leaves_no_trace() {
    for (label, store) in stores() {
        let kinds = WellKnownIds::bootstrap();
        let before = store.count_links().await.unwrap();
        let ids = store.reserve_ids(3).await.unwrap();

        let batch = vec![
            Operation::node(ids[0], kinds.type_),
            Operation::edge(ids[1], kinds.contain, ids[0], ids[0]),
            Operation::value(ids[1], "kept?"),
            // Unknown endpoint: the whole batch must be refused.
            Operation::edge(ids[2], kinds.contain, 987_654, ids[0]),
        ];
        let err = store.apply_batch(&batch).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)), "[{label}] {err}");

        assert_eq!(store.count_links().await.unwrap(), before, "[{label}]");
        assert!(store.get_link(ids[0]).await.unwrap().is_none(), "[{label}]");
        assert!(store.get_string_value(ids[1]).await.unwrap().is_none(), "[{label}]");

        // Unknown container through the pipeline fails the same way.
        let h = Harness::stage(label, Arc::clone(&store), &order_schema()).await;
        h.store
            .set_object_value(h.staged.config_link_id, &json!({ "containerLinkId": 987_654 }))
            .await
            .unwrap();
        let failure = h.convert().await.unwrap_err();
        assert_eq!(failure.error.code(), "batch_application_failed", "[{label}]");
        assert_eq!(h.added().await, 0, "[{label}]");
    }
}

// ---------------------------------------------------------------------------
// Store guarantees
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reservations_are_disjoint() {
    for (label, store) in stores() {
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move { store.reserve_ids(5).await }));
        }

        let mut seen: BTreeSet<LinkId> = BTreeSet::new();
        for task in tasks {
            let ids = task.await.unwrap().unwrap();
            assert_eq!(ids.len(), 5, "[{label}]");
            for id in ids {
                assert!(seen.insert(id), "[{label}] id {id} handed out twice");
            }
        }
        assert_eq!(seen.len(), 40, "[{label}]");
        // No reserved id collides with the vocabulary.
        assert!(seen.iter().all(|id| *id > 7), "[{label}]");
    }
}

#[tokio::test]
async fn log_depth_controls_trace_rendering() {
    for (label, store) in stores() {
        let h = Harness::stage(label, store, &order_schema()).await;
        h.store
            .set_object_value(
                h.staged.config_link_id,
                &json!({ "containerLinkId": h.staged.container_link_id, "logDepth": 0 }),
            )
            .await
            .unwrap();

        let outcome = h.convert().await.unwrap();
        let schema_entry = outcome
            .logs
            .iter()
            .find(|l| l.contains("title: \"Order\""))
            .unwrap_or_else(|| panic!("[{label}] no schema entry in {:?}", outcome.logs));
        assert!(schema_entry.contains("properties: [Object]"), "[{label}] {schema_entry}");
    }
}
