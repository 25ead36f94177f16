//! Demo API mirroring a typical RBAC-protected service.
//!
//! `/school/list` and `/school/add` return envelopes and are filtered per
//! principal; `/` and `/person/list` write plain JSON and pass through.

use axum::{extract::Query, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use fieldguard_core::{FilterEngine, FnTransform};

use crate::app_state::AppState;
use crate::capture::{Envelope, FilterContext};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    pub user_name: String,
    #[serde(skip)]
    pub user_pwd: String,
    pub user_salary: f64,
    pub user_age: u32,
    pub user_mobile: String,
    pub profile: Profile,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Profile {
    #[serde(skip)]
    pub id: u64,
    pub grade: u32,
    pub photo: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct School {
    pub school_id: u64,
    pub school_name: String,
    pub school_code: String,
}

/// Standard response wrapper (`code`, `message`, `data`).
#[derive(Debug, Serialize)]
pub struct Reply<T> {
    pub code: i32,
    pub message: String,
    pub data: T,
}

impl<T> Reply<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: 1,
            message: String::new(),
            data,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub mobile: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(hello))
        .route("/school/list", get(list_school))
        .route("/school/add", get(add_school))
        .route("/person/list", get(list_person))
}

/// Custom transforms available to the demo policy.
pub fn register_transforms(engine: &FilterEngine) {
    engine.register_transform(
        "arrow_prefix",
        FnTransform::encode_only(|v: &Value| Ok(json!(format!("======>{}", text_of(v))))),
    );
    engine.register_transform(
        "bracket_prefix",
        FnTransform::encode_only(|v: &Value| Ok(json!(format!("[======]{}", text_of(v))))),
    );
}

fn text_of(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

async fn hello() -> Json<Value> {
    Json(json!({ "message": "hello" }))
}

async fn list_school(ctx: FilterContext, Query(q): Query<ListQuery>) -> Envelope<Reply<User>> {
    let user = User {
        user_name: "test".into(),
        user_pwd: "123456".into(),
        user_salary: 342342.0,
        user_age: 26,
        user_mobile: q.mobile.unwrap_or_else(|| "123456789".into()),
        profile: Profile {
            id: 4,
            grade: 5,
            photo: "nnnnnnn".into(),
        },
    };
    Envelope::new(ctx, Reply::ok(user))
}

async fn add_school(ctx: FilterContext) -> Envelope<Reply<School>> {
    let school = School {
        school_id: 1,
        school_name: "学校".into(),
        school_code: "codetest".into(),
    };
    Envelope::new(ctx, Reply::ok(school))
}

async fn list_person() -> Json<Value> {
    Json(json!({ "message": "getPerson" }))
}
