//! Override engine: dispatch by declared type, omission, isolation.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};

use fieldguard_core::error::{FilterError, Result};
use fieldguard_core::{
    FilterEngine, FnTransform, NamingPolicy, PolicySet, Principal, RoleResolver,
    StaticRoleHierarchy,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct User {
    user_name: String,
    user_salary: f64,
    user_age: u32,
    user_mobile: String,
    photo: String,
    profile: Profile,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Profile {
    grade: u32,
    photo: String,
}

#[derive(Debug, Serialize)]
struct School {
    school_id: u32,
    school_name: String,
    school_code: String,
}

#[derive(Debug, Serialize)]
enum Event {
    Joined { school_code: String, at: u64 },
    Left(u64),
}

fn user() -> User {
    User {
        user_name: "test".into(),
        user_salary: 342342.0,
        user_age: 26,
        user_mobile: "13800001111".into(),
        photo: "user.png".into(),
        profile: Profile {
            grade: 5,
            photo: "nnnnnnn".into(),
        },
    }
}

fn engine(policy: &str) -> FilterEngine {
    FilterEngine::new(PolicySet::load_from_str(policy).unwrap())
}

fn filtered<T: Serialize>(engine: &FilterEngine, who: &str, payload: &T) -> Value {
    engine.begin(Principal::new(who)).to_value(payload).unwrap()
}

#[test]
fn end_to_end_alice_is_masked_bob_is_not() {
    let e = engine("alice, User, UserMobile, sensitive\n");

    let alice = filtered(&e, "alice", &user());
    assert_eq!(alice["UserMobile"], json!("1380****1111"));

    let bob = filtered(&e, "bob", &user());
    assert_eq!(bob["UserMobile"], json!("13800001111"));
}

#[test]
fn unmatched_output_is_byte_identical_to_plain_serde() {
    let e = engine("alice, User, UserMobile, mask\nalice, School, school_code, omit\n");
    let payload = json!({ "code": 1, "message": "", "data": user() });

    let plain = serde_json::to_vec(&payload).unwrap();
    let bob = e.begin(Principal::new("bob")).to_vec(&payload).unwrap();
    assert_eq!(bob, plain);

    // unaffected types stay identical even for a matched principal
    let school = School {
        school_id: 1,
        school_name: "学校".into(),
        school_code: "codetest".into(),
    };
    let profile_only = e.begin(Principal::new("alice")).to_vec(&user().profile).unwrap();
    assert_eq!(profile_only, serde_json::to_vec(&user().profile).unwrap());
    let school_out = e.begin(Principal::new("alice")).to_value(&school).unwrap();
    assert_eq!(school_out, json!({ "school_id": 1, "school_name": "学校" }));
}

#[test]
fn omitted_fields_are_absent_keys() {
    let e = engine("alice, User, UserSalary | UserAge, omit\nalice, User, UserName, mask\n");
    let mut u = user();
    u.user_name = String::new();

    let out = filtered(&e, "alice", &u);
    let obj = out.as_object().unwrap();
    assert!(!obj.contains_key("UserSalary"));
    assert!(!obj.contains_key("UserAge"));
    // mask on an empty string omits too
    assert!(!obj.contains_key("UserName"));
    assert_eq!(obj["UserMobile"], json!("13800001111"));
}

#[test]
fn custom_empty_transform_omits() {
    let e = engine("alice, Profile, Grade, drop_zero\n");
    e.register_transform(
        "drop_zero",
        FnTransform::new(|v: &Value| Ok(v.clone()), |v: &Value| v.as_u64() == Some(0)),
    );

    let mut u = user();
    u.profile.grade = 0;
    let out = filtered(&e, "alice", &u);
    assert!(out["Profile"].get("Grade").is_none());

    let out = filtered(&e, "alice", &user());
    assert_eq!(out["Profile"]["Grade"], json!(5));
}

#[test]
fn dispatch_keys_on_the_values_own_type() {
    // both User and Profile have a `Photo` field; only Profile's is targeted
    let e = engine("alice, Profile, Photo, omit\n");
    let out = filtered(&e, "alice", &user());
    assert_eq!(out["Photo"], json!("user.png"));
    assert!(out["Profile"].get("Photo").is_none());
    assert_eq!(out["Profile"]["Grade"], json!(5));

    // and the other way round: a User rule never leaks into the nested Profile
    let e = engine("alice, User, Photo, mask\n");
    let out = filtered(&e, "alice", &user());
    assert_eq!(out["Photo"], json!("user****.png"));
    assert_eq!(out["Profile"]["Photo"], json!("nnnnnnn"));
}

#[test]
fn structs_inside_maps_and_sequences_are_filtered() {
    let e = engine("alice, User, UserMobile, mask\n");
    let mut by_id = BTreeMap::new();
    by_id.insert(7u32, user());

    #[derive(Serialize)]
    struct Page {
        list: Vec<User>,
        by_id: BTreeMap<u32, User>,
        first: Option<User>,
    }
    let page = Page {
        list: vec![user(), user()],
        by_id,
        first: Some(user()),
    };

    let out = filtered(&e, "alice", &page);
    assert_eq!(out["list"][0]["UserMobile"], json!("1380****1111"));
    assert_eq!(out["list"][1]["UserMobile"], json!("1380****1111"));
    assert_eq!(out["by_id"]["7"]["UserMobile"], json!("1380****1111"));
    assert_eq!(out["first"]["UserMobile"], json!("1380****1111"));
}

#[test]
fn struct_variants_are_keyed_by_enum_name() {
    let e = engine("alice, Event, school_code, mask\n");
    let out = filtered(
        &e,
        "alice",
        &vec![
            Event::Joined {
                school_code: "codetest".into(),
                at: 9,
            },
            Event::Left(3),
        ],
    );
    assert_eq!(out, json!([{ "Joined": { "school_code": "code****test", "at": 9 } }, { "Left": 3 }]));
}

#[test]
fn later_rule_wins_on_collision() {
    let e = engine("alice, User, UserMobile, omit\nalice, User, UserMobile, mask\n");
    assert_eq!(filtered(&e, "alice", &user())["UserMobile"], json!("1380****1111"));

    let e = engine("alice, User, UserMobile, mask\nalice, User, UserMobile, omit\n");
    assert!(filtered(&e, "alice", &user()).get("UserMobile").is_none());
}

#[test]
fn unregistered_transform_degrades_to_unfiltered() {
    let e = engine("alice, User, UserMobile, masc\n");
    let state = e.begin(Principal::new("alice"));
    assert!(state.matched().is_empty());
    assert!(state.overrides().is_empty());
    assert_eq!(state.to_value(&user()).unwrap()["UserMobile"], json!("13800001111"));
}

#[test]
fn transform_resolves_lazily_at_request_time() {
    let e = engine("alice, User, UserName, shout\n");
    assert_eq!(filtered(&e, "alice", &user())["UserName"], json!("test"));

    e.register_transform(
        "shout",
        FnTransform::encode_only(|v: &Value| Ok(json!(v.as_str().unwrap_or_default().to_uppercase()))),
    );
    assert_eq!(filtered(&e, "alice", &user())["UserName"], json!("TEST"));
}

#[test]
fn roles_from_hierarchy_match_transitively() {
    let roles = StaticRoleHierarchy::from_edges([("alice", "staff"), ("staff", "viewer")]);
    let e = engine("viewer, User, UserMobile, mask\n").with_roles(Arc::new(roles));

    assert_eq!(filtered(&e, "alice", &user())["UserMobile"], json!("1380****1111"));
    assert_eq!(filtered(&e, "carol", &user())["UserMobile"], json!("13800001111"));
}

#[test]
fn direct_role_from_authentication_matches() {
    let e = engine("admin, User, UserSalary, omit\n");
    let out = e
        .begin(Principal::new("dave").with_role("admin"))
        .to_value(&user())
        .unwrap();
    assert!(out.get("UserSalary").is_none());
}

struct Unavailable;

impl RoleResolver for Unavailable {
    fn resolve_roles(&self, _identity: &str) -> Result<HashSet<String>> {
        Err(FilterError::Internal("role engine down".into()))
    }
}

#[test]
fn role_engine_failure_falls_back_to_exact_identity() {
    let e = engine("viewer, User, UserMobile, mask\nalice, User, UserAge, omit\n")
        .with_roles(Arc::new(Unavailable));
    let out = filtered(&e, "alice", &user());
    assert_eq!(out["UserMobile"], json!("13800001111"));
    assert!(out.get("UserAge").is_none());
}

#[test]
fn role_hierarchy_cycles_terminate() {
    let roles = StaticRoleHierarchy::from_edges([("a", "b"), ("b", "c"), ("c", "a")]);
    let set = roles.resolve_roles("a").unwrap();
    assert_eq!(set, HashSet::from(["b".to_string(), "c".to_string()]));
}

#[test]
fn failing_custom_transform_is_a_serialize_failure() {
    let e = engine("alice, User, UserName, boom\n");
    e.register_transform(
        "boom",
        FnTransform::encode_only(|_: &Value| {
            Err(FilterError::Transform {
                name: "boom".into(),
                reason: "no".into(),
            })
        }),
    );
    let err = e.begin(Principal::new("alice")).to_vec(&user()).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "INTERNAL");
}

#[test]
fn naming_policy_applies_after_matching() {
    let e = engine("alice, User, UserMobile, mask\n").with_naming(NamingPolicy::SnakeCase);
    let out = filtered(&e, "alice", &user());
    assert_eq!(out["user_mobile"], json!("1380****1111"));
    assert_eq!(out["profile"]["grade"], json!(5));
    assert!(out.get("UserMobile").is_none());

    assert_eq!(NamingPolicy::CamelCase.apply("user_mobile"), "userMobile");
    assert_eq!(NamingPolicy::PascalCase.apply("user_mobile"), "UserMobile");
    assert_eq!(NamingPolicy::SnakeCase.apply("HTTPServerID"), "http_server_id");
    assert_eq!(NamingPolicy::Preserve.apply("UserMobile"), "UserMobile");
}

#[test]
fn naming_policy_normalizes_inbound_documents() {
    let input = json!({ "UserMobile": "1", "Profile": { "PhotoUrl": "x" }, "Tags": [{ "TagName": "a" }] });
    let out = NamingPolicy::SnakeCase.normalize_value(input);
    assert_eq!(out, json!({ "user_mobile": "1", "profile": { "photo_url": "x" }, "tags": [{ "tag_name": "a" }] }));
}

#[test]
fn concurrent_principals_never_share_overrides() {
    let e = Arc::new(engine("alice, User, UserMobile, mask\nbob, User, UserMobile, omit\n"));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let e = Arc::clone(&e);
            std::thread::spawn(move || {
                let who = ["alice", "bob", "carol"][i % 3];
                for _ in 0..100 {
                    let out = e.begin(Principal::new(who)).to_value(&user()).unwrap();
                    match who {
                        "alice" => assert_eq!(out["UserMobile"], json!("1380****1111")),
                        "bob" => assert!(out.get("UserMobile").is_none()),
                        _ => assert_eq!(out["UserMobile"], json!("13800001111")),
                    }
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
}

#[derive(Serialize)]
struct Reading {
    ratio: f32,
    big: i128,
}

#[derive(Serialize)]
struct Other {
    x: String,
}

#[derive(Serialize)]
struct Page {
    r: Reading,
    other: Other,
}

#[test]
fn untargeted_scalars_are_written_exactly_as_serde_json_writes_them() {
    let e = engine("alice, Other, x, mask\n");
    let page = Page {
        r: Reading {
            ratio: 1.1,
            big: 10_000_000_000_000_000_000,
        },
        other: Other { x: "secret".into() },
    };

    let out = String::from_utf8(e.begin(Principal::new("alice")).to_vec(&page).unwrap()).unwrap();
    assert_eq!(
        out,
        r#"{"r":{"ratio":1.1,"big":10000000000000000000},"other":{"x":"secr****cret"}}"#
    );

    // the value form accepts the same integer range serde_json does
    let v = e.begin(Principal::new("alice")).to_value(&page).unwrap();
    assert_eq!(v["r"]["big"], json!(10_000_000_000_000_000_000u64));
}

#[derive(Serialize)]
struct Secret {
    token: String,
}

#[derive(Serialize)]
struct Wrap {
    id: u32,
    #[serde(flatten)]
    inner: Secret,
}

#[test]
fn targeted_field_inside_flattened_struct_fails_closed() {
    let e = engine("alice, Secret, token, omit\n");
    let payload = Wrap {
        id: 1,
        inner: Secret {
            token: "s3cr3t".into(),
        },
    };
    let state = e.begin(Principal::new("alice"));

    // the same type serialized directly is filtered
    assert_eq!(state.to_value(&payload.inner).unwrap(), json!({}));

    let err = state.to_vec(&payload).expect_err("must not leak the token");
    assert_eq!(err.client_code().as_str(), "INTERNAL");
    assert!(state.to_value(&payload).is_err());

    // untargeted principals and untargeted keys are unaffected
    let bob = e.begin(Principal::new("bob")).to_vec(&payload).unwrap();
    assert_eq!(bob, serde_json::to_vec(&payload).unwrap());
    let other = engine("alice, Secret, pin, omit\n");
    let out = other.begin(Principal::new("alice")).to_vec(&payload).unwrap();
    assert_eq!(out, br#"{"id":1,"token":"s3cr3t"}"#.to_vec());
}

#[test]
fn direct_role_is_expanded_through_the_hierarchy() {
    let roles = StaticRoleHierarchy::from_edges([("manager", "staff")]);
    let e = engine("staff, User, UserSalary, omit\n").with_roles(Arc::new(roles));

    let dave = e
        .begin(Principal::new("dave").with_role("manager"))
        .to_value(&user())
        .unwrap();
    assert!(dave.get("UserSalary").is_none());

    let erin = filtered(&e, "erin", &user());
    assert_eq!(erin["UserSalary"], json!(342342.0));
}
