//! Identity context extraction.
//!
//! Authentication is handled upstream (by the API gateway in front of this service), which forwards the verified
//! identity in three headers. This module turns those headers into a [`TenantContext`] for the engine; a request
//! with missing or malformed headers never reaches a handler.

use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use kasir_engine::db_types::{Role, TenantContext};
use log::debug;

use crate::errors::ServerError;

pub const TENANT_ID_HEADER: &str = "X-Tenant-Id";
pub const ACTOR_ID_HEADER: &str = "X-Actor-Id";
pub const ACTOR_ROLE_HEADER: &str = "X-Actor-Role";

/// The authenticated actor behind a request. Dereferences to the engine's [`TenantContext`].
#[derive(Debug, Clone, Copy)]
pub struct ActorContext(TenantContext);

impl std::ops::Deref for ActorContext {
    type Target = TenantContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl ActorContext {
    pub fn context(&self) -> &TenantContext {
        &self.0
    }
}

fn header_str<'a>(req: &'a HttpRequest, name: &str) -> Result<&'a str, ServerError> {
    req.headers()
        .get(name)
        .ok_or_else(|| ServerError::InvalidIdentity(format!("{name} header is missing")))?
        .to_str()
        .map_err(|_| ServerError::InvalidIdentity(format!("{name} header is not valid UTF-8")))
}

fn header_i64(req: &HttpRequest, name: &str) -> Result<i64, ServerError> {
    header_str(req, name)?
        .trim()
        .parse::<i64>()
        .map_err(|_| ServerError::InvalidIdentity(format!("{name} header is not a valid id")))
}

pub fn context_from_request(req: &HttpRequest) -> Result<TenantContext, ServerError> {
    let tenant_id = header_i64(req, TENANT_ID_HEADER)?;
    let actor_id = header_i64(req, ACTOR_ID_HEADER)?;
    let role = header_str(req, ACTOR_ROLE_HEADER)?
        .parse::<Role>()
        .map_err(|e| ServerError::InvalidIdentity(e.to_string()))?;
    Ok(TenantContext::new(tenant_id, actor_id, role))
}

impl FromRequest for ActorContext {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = context_from_request(req).map(ActorContext);
        if let Err(e) = &result {
            debug!("💻️ Rejecting request with invalid identity headers: {e}");
        }
        ready(result)
    }
}

#[cfg(test)]
mod test {
    use actix_web::test::TestRequest;

    use super::*;

    fn request(tenant: &str, actor: &str, role: &str) -> HttpRequest {
        TestRequest::default()
            .insert_header((TENANT_ID_HEADER, tenant))
            .insert_header((ACTOR_ID_HEADER, actor))
            .insert_header((ACTOR_ROLE_HEADER, role))
            .to_http_request()
    }

    #[test]
    fn well_formed_headers_produce_a_context() {
        let req = request("3", "101", "cashier");
        let ctx = context_from_request(&req).unwrap();
        assert_eq!(ctx.tenant_id, 3);
        assert_eq!(ctx.actor_id, 101);
        assert_eq!(ctx.role, Role::Cashier);
    }

    #[test]
    fn missing_headers_are_rejected() {
        let req = TestRequest::default().to_http_request();
        let err = context_from_request(&req).unwrap_err();
        assert!(matches!(err, ServerError::InvalidIdentity(_)));
    }

    #[test]
    fn garbage_values_are_rejected() {
        let req = request("three", "101", "cashier");
        assert!(context_from_request(&req).is_err());
        let req = request("3", "101", "barista");
        assert!(context_from_request(&req).is_err());
    }
}
