use std::collections::HashMap;

use axum::{
    extract::{Query, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use fieldguard_core::Principal;

pub const USER_HEADER: &str = "x-user";
pub const ROLE_HEADER: &str = "x-role";

/// Principal placed in request extensions by the auth layer, if any.
pub fn principal_of(req: &Request) -> Option<Principal> {
    req.extensions().get::<Principal>().cloned()
}

/// Development authenticator: trusts `x-user`/`x-role` headers, falling back
/// to `?username=`/`?role=` query parameters. Never use in production.
pub async fn dev_auth(mut req: Request, next: Next) -> Response {
    let query: HashMap<String, String> = Query::try_from_uri(req.uri())
        .map(|Query(q)| q)
        .unwrap_or_default();

    let user = header_value(req.headers(), USER_HEADER).or_else(|| query.get("username").cloned());
    let role = header_value(req.headers(), ROLE_HEADER).or_else(|| query.get("role").cloned());

    if let Some(user) = user {
        let mut principal = Principal::new(user);
        if let Some(role) = role {
            principal = principal.with_role(role);
        }
        tracing::debug!(user = %principal.user, "dev principal attached");
        req.extensions_mut().insert(principal);
    }

    next.run(req).await
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(name)?.to_str().ok()?.trim();
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}
