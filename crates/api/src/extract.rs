//! Builds the per-request `RequestContext` from gateway headers.
//!
//! Authentication happens upstream; the authenticating proxy forwards the
//! caller's identity in `x-principal-*` headers which are trusted as-is.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use common::principal::{EMAIL_CLAIM, GIVEN_NAME_CLAIM, POLICIES_CLAIM};
use common::{ActingPrincipal, PrincipalId};
use domain::RequestContext;
use uuid::Uuid;

use crate::error::ApiError;

pub const PRINCIPAL_ID_HEADER: &str = "x-principal-id";
pub const PRINCIPAL_NAME_HEADER: &str = "x-principal-name";
pub const PRINCIPAL_EMAIL_HEADER: &str = "x-principal-email";
pub const PRINCIPAL_GIVEN_NAME_HEADER: &str = "x-principal-given-name";
pub const PRINCIPAL_POLICIES_HEADER: &str = "x-principal-policies";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, ApiError> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|v| Some(v.trim()).filter(|v| !v.is_empty()))
            .map_err(|_| ApiError::InvalidRequest(format!("Header {name} is not valid text"))),
    }
}

/// Reads the acting principal; callers without `x-principal-id` are anonymous.
pub fn principal_from_headers(headers: &HeaderMap) -> Result<ActingPrincipal, ApiError> {
    let Some(raw_id) = header(headers, PRINCIPAL_ID_HEADER)? else {
        return Ok(ActingPrincipal::anonymous());
    };
    let id: PrincipalId = raw_id.parse().map_err(|_| {
        ApiError::InvalidRequest(format!("Header {PRINCIPAL_ID_HEADER} must be a UUID"))
    })?;
    let name = header(headers, PRINCIPAL_NAME_HEADER)?.unwrap_or(raw_id);

    let mut principal = ActingPrincipal::new(id, name);
    for (header_name, claim) in [
        (PRINCIPAL_EMAIL_HEADER, EMAIL_CLAIM),
        (PRINCIPAL_GIVEN_NAME_HEADER, GIVEN_NAME_CLAIM),
        (PRINCIPAL_POLICIES_HEADER, POLICIES_CLAIM),
    ] {
        if let Some(value) = header(headers, header_name)? {
            principal = principal.with_claim(claim, value);
        }
    }
    Ok(principal)
}

/// A fresh `RequestContext` for the current request.
pub struct RequestScope(pub RequestContext);

impl<S: Send + Sync> FromRequestParts<S> for RequestScope {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = principal_from_headers(&parts.headers)?;
        let request_id = header(&parts.headers, REQUEST_ID_HEADER)?
            .and_then(|id| Uuid::parse_str(id).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(RequestScope(RequestContext::with_request_id(request_id, principal)))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn missing_headers_mean_anonymous() {
        let principal = principal_from_headers(&HeaderMap::new()).unwrap();
        assert!(principal.is_anonymous());
    }

    #[test]
    fn headers_become_principal_and_claims() {
        let id = PrincipalId::new();
        let mut headers = HeaderMap::new();
        headers.insert(PRINCIPAL_ID_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
        headers.insert(PRINCIPAL_NAME_HEADER, HeaderValue::from_static("alice"));
        headers.insert(PRINCIPAL_EMAIL_HEADER, HeaderValue::from_static("alice@example.com"));
        headers.insert(PRINCIPAL_POLICIES_HEADER, HeaderValue::from_static("admin;auditor"));

        let principal = principal_from_headers(&headers).unwrap();

        assert_eq!(principal.id, id);
        assert_eq!(principal.name, "alice");
        assert_eq!(principal.email(), Some("alice@example.com"));
        assert_eq!(principal.policies(), vec!["admin", "auditor"]);
        assert_eq!(principal.given_name(), None);
    }

    #[test]
    fn name_defaults_to_the_id() {
        let id = PrincipalId::new();
        let mut headers = HeaderMap::new();
        headers.insert(PRINCIPAL_ID_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());

        let principal = principal_from_headers(&headers).unwrap();
        assert_eq!(principal.name, id.to_string());
    }

    #[test]
    fn malformed_id_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(PRINCIPAL_ID_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert!(matches!(
            principal_from_headers(&headers),
            Err(ApiError::InvalidRequest(_))
        ));
    }
}
