use super::*;
use crate::test_support::{Answer, MockProperties};

fn remote(value: Value) -> RemoteObject {
    serde_json::from_value(value).unwrap()
}

fn materializer(source: MockProperties) -> (Materializer, Arc<MockProperties>) {
    let source = Arc::new(source);
    (Materializer::new(source.clone()), source)
}

#[tokio::test]
async fn test_inline_scalar_value() {
    let (m, _) = materializer(MockProperties::default());
    let node = m.materialize(&remote(json!({"type": "number", "value": 5, "description": "5"})), 2).await;
    assert_eq!(node, PrintableNode::Inline(json!(5)));
}

#[tokio::test]
async fn test_inline_null_value_wins_over_literal() {
    let (m, _) = materializer(MockProperties::default());
    let node = m
        .materialize(&remote(json!({"type": "object", "subtype": "null", "value": null})), 2)
        .await;
    assert_eq!(node, PrintableNode::Inline(Value::Null));
}

#[tokio::test]
async fn test_preview_with_overflow_ends_with_marker() {
    let (m, source) = materializer(MockProperties::default());
    let node = m
        .materialize(
            &remote(json!({
                "type": "object",
                "className": "Object",
                "objectId": "obj-1",
                "preview": {
                    "overflow": true,
                    "properties": [
                        {"name": "a", "type": "number", "value": "1"},
                        {"name": "b", "type": "string", "value": "two"}
                    ]
                }
            })),
            2,
        )
        .await;

    match &node {
        PrintableNode::Map { entries, .. } => {
            assert_eq!(entries.len(), 3);
            assert_eq!(entries[2], (TRUNCATION_KEY.to_string(), PrintableNode::Truncated));
        }
        other => panic!("expected a map, got {:?}", other),
    }
    assert_eq!(node.to_json(), json!({"a": "1", "b": "two", "...": "(truncated)"}));
    assert!(source.calls().is_empty(), "previews must not trigger fetches");
}

#[tokio::test]
async fn test_nested_value_preview() {
    let (m, _) = materializer(MockProperties::default());
    let node = m
        .materialize(
            &remote(json!({
                "type": "object",
                "preview": {
                    "properties": [
                        {"name": "inner", "type": "object", "valuePreview": {
                            "properties": [{"name": "x", "type": "number", "value": "1"}]
                        }},
                        {"name": "opaque", "type": "object"}
                    ]
                }
            })),
            2,
        )
        .await;
    assert_eq!(node.to_json(), json!({"inner": {"x": "1"}, "opaque": "..."}));
}

#[tokio::test]
async fn test_depth_zero_never_fetches() {
    let (m, source) = materializer(
        MockProperties::default().with("obj-1", Answer::Properties(json!([]))),
    );
    let node = m
        .materialize(&remote(json!({"type": "object", "objectId": "obj-1", "description": "Foo"})), 0)
        .await;
    assert_eq!(node, PrintableNode::text("Foo"));
    assert!(source.calls().is_empty());

    let node = m
        .materialize(&remote(json!({"type": "object", "objectId": "obj-1"})), 0)
        .await;
    assert_eq!(node, PrintableNode::text("[Object]"));
}

#[tokio::test]
async fn test_fetch_resolves_nested_properties_by_depth() {
    let (m, source) = materializer(
        MockProperties::default()
            .with(
                "outer",
                Answer::Properties(json!([
                    {"name": "n", "value": {"type": "number", "value": 1}},
                    {"name": "child", "value": {"type": "object", "objectId": "child", "description": "Object"}},
                    {"name": "accessor", "get": {"type": "function"}}
                ])),
            )
            .with(
                "child",
                Answer::Properties(json!([
                    {"name": "grandchild", "value": {"type": "object", "objectId": "grandchild", "description": "Grand"}},
                    {"name": "u", "value": {"type": "undefined"}}
                ])),
            )
            .with("grandchild", Answer::Properties(json!([]))),
    );

    let node = m
        .materialize(
            &remote(json!({"type": "object", "className": "Config", "objectId": "outer"})),
            DEFAULT_MAX_DEPTH,
        )
        .await;

    assert_eq!(source.calls(), vec!["outer".to_string(), "child".to_string()]);
    assert_eq!(
        node.to_json(),
        json!({"n": 1, "child": {"grandchild": "Grand", "u": "undefined"}})
    );
    match node {
        PrintableNode::Map { class_name, .. } => assert_eq!(class_name.as_deref(), Some("Config")),
        other => panic!("expected a map, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_keeps_property_order() {
    let (m, _) = materializer(MockProperties::default().with(
        "obj",
        Answer::Properties(json!([
            {"name": "z", "value": {"type": "number", "value": 1}},
            {"name": "a", "value": {"type": "number", "value": 2}},
            {"name": "m", "value": {"type": "number", "value": 3}}
        ])),
    ));
    let node = m.materialize(&remote(json!({"type": "object", "objectId": "obj"})), 1).await;
    let keys: Vec<String> = node.to_json().as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["z", "a", "m"]);
}

#[tokio::test]
async fn test_fetch_timeout_sentinel() {
    let (m, _) = materializer(MockProperties::default().with("slow", Answer::Timeout));
    let node = m.materialize(&remote(json!({"type": "object", "objectId": "slow"})), 2).await;
    assert_eq!(node, PrintableNode::text("[Object: timeout]"));
}

#[tokio::test]
async fn test_fetch_error_sentinel() {
    let (m, _) = materializer(MockProperties::default().with("gone", Answer::Fail("Object was collected".into())));
    let node = m.materialize(&remote(json!({"type": "object", "objectId": "gone"})), 2).await;
    match node {
        PrintableNode::Text(text) => {
            assert!(text.starts_with("[Object: "));
            assert!(text.contains("Object was collected"));
        }
        other => panic!("expected sentinel text, got {:?}", other),
    }
}

#[tokio::test]
async fn test_nested_timeout_does_not_abort_parent() {
    let (m, _) = materializer(
        MockProperties::default()
            .with(
                "parent",
                Answer::Properties(json!([
                    {"name": "ok", "value": {"type": "string", "value": "fine"}},
                    {"name": "slow", "value": {"type": "object", "objectId": "slow"}}
                ])),
            )
            .with("slow", Answer::Timeout),
    );
    let node = m.materialize(&remote(json!({"type": "object", "objectId": "parent"})), 2).await;
    assert_eq!(node.to_json(), json!({"ok": "fine", "slow": "[Object: timeout]"}));
}

#[tokio::test]
async fn test_non_object_fallbacks() {
    let (m, _) = materializer(MockProperties::default());

    let func = remote(json!({"type": "function", "description": "function f() {}", "objectId": "f"}));
    assert_eq!(m.materialize(&func, 2).await, PrintableNode::text("function f() {}"));

    assert_eq!(
        m.materialize(&remote(json!({"type": "undefined"})), 2).await,
        PrintableNode::text("undefined")
    );
    assert_eq!(
        m.materialize(&remote(json!({"type": "null"})), 2).await,
        PrintableNode::text("null")
    );
    assert_eq!(
        m.materialize(&remote(json!({"type": "symbol"})), 2).await,
        PrintableNode::text(r#"{"type":"symbol"}"#)
    );
}

#[tokio::test]
async fn test_object_without_handle_or_preview() {
    let (m, _) = materializer(MockProperties::default());
    assert_eq!(
        m.materialize(&remote(json!({"type": "object", "description": "Window"})), 2).await,
        PrintableNode::text("Window")
    );
    assert_eq!(
        m.materialize(&remote(json!({"type": "object"})), 2).await,
        PrintableNode::text("[Object]")
    );
}
