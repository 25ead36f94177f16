//! Built-in transform vectors and registry semantics.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use serde_json::{json, Value};

use fieldguard_core::transform::{mask_str, FnTransform, Mask, Omit, Transform, TransformRegistry};

#[test]
fn mask_vectors() {
    let cases = [
        ("1234", "1****4"),
        ("123456", "1234****3456"),
        ("12345", "1234****2345"),
        ("13800001111", "1380****1111"),
        ("a", "a****a"),
        ("ab", "a****b"),
        // chars, not bytes
        ("张三丰", "张****丰"),
        ("éléphants", "élép****ants"),
    ];
    for (input, want) in cases {
        assert_eq!(mask_str(input), want, "input={input}");
    }
    assert_eq!(mask_str(""), "");
}

#[test]
fn mask_empty_values_are_omitted() {
    assert!(Mask.is_empty(&json!("")));
    assert!(Mask.is_empty(&Value::Null));
    assert!(!Mask.is_empty(&json!("x")));
    assert!(!Mask.is_empty(&json!(0)));
}

#[test]
fn mask_non_strings_on_their_json_text() {
    assert_eq!(Mask.encode(&json!(123456789)).unwrap(), json!("1234****6789"));
    assert_eq!(Mask.encode(&json!(true)).unwrap(), json!("t****e"));
    assert_eq!(Mask.encode(&json!("13800001111")).unwrap(), json!("1380****1111"));
}

#[test]
fn omit_is_always_empty() {
    for v in [json!(""), json!("secret"), json!(42), json!({"a": 1}), Value::Null] {
        assert!(Omit.is_empty(&v));
    }
}

#[test]
fn builtins_and_aliases_are_registered() {
    let reg = TransformRegistry::with_builtins();
    assert_eq!(reg.names(), vec!["mask", "omit", "remove", "sensitive"]);

    let sensitive = reg.lookup("sensitive").unwrap();
    assert_eq!(sensitive.encode(&json!("1234")).unwrap(), json!("1****4"));
    assert!(reg.lookup("remove").unwrap().is_empty(&json!("x")));
    assert!(reg.lookup("nope").is_none());
    assert!(TransformRegistry::empty().names().is_empty());
}

#[test]
fn last_registration_wins() {
    let reg = TransformRegistry::with_builtins();
    reg.register(
        "custom",
        FnTransform::encode_only(|v: &Value| Ok(json!(format!("======>{}", v.as_str().unwrap_or_default())))),
    );
    reg.register(
        "custom",
        FnTransform::encode_only(|v: &Value| Ok(json!(format!("[======]{}", v.as_str().unwrap_or_default())))),
    );

    let t = reg.lookup("custom").unwrap();
    assert_eq!(t.encode(&json!("x")).unwrap(), json!("[======]x"));
    assert!(!t.is_empty(&json!("")));

    // overriding a built-in replaces it too
    reg.register("mask", Omit);
    assert!(reg.lookup("mask").unwrap().is_empty(&json!("1234")));
    assert!(!reg.lookup("sensitive").unwrap().is_empty(&json!("1234")));
}

#[test]
fn fn_transform_with_custom_emptiness() {
    let t = FnTransform::new(
        |v: &Value| Ok(json!(v.as_i64().unwrap_or_default() / 1000 * 1000)),
        |v: &Value| v.as_i64() == Some(0),
    );
    assert_eq!(t.encode(&json!(342342)).unwrap(), json!(342000));
    assert!(t.is_empty(&json!(0)));
}
