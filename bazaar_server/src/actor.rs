//! Caller identity extraction.
//!
//! The server runs behind an authenticating proxy that injects the `x-actor-id` and
//! `x-actor-role` headers on every request. These headers are trusted as-is; session handling
//! and credential verification live in the proxy, not here.

use std::{future::Future, pin::Pin, str::FromStr};

use actix_web::{FromRequest, HttpRequest};
use bazaar_engine::db_types::{Actor, ActorRole};

use crate::errors::ServerError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Wrapper around [`Actor`] so it can be pulled straight out of a request in handler signatures.
#[derive(Debug, Clone)]
pub struct RequestActor(pub Actor);

impl RequestActor {
    pub fn into_inner(self) -> Actor {
        self.0
    }
}

fn actor_from_request(req: &HttpRequest) -> Result<Actor, ServerError> {
    let id = req
        .headers()
        .get(ACTOR_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ServerError::InvalidIdentity(format!("missing {ACTOR_ID_HEADER} header")))?;
    let role = req
        .headers()
        .get(ACTOR_ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServerError::InvalidIdentity(format!("missing {ACTOR_ROLE_HEADER} header")))?;
    let role = ActorRole::from_str(role)
        .map_err(|e| ServerError::InvalidIdentity(format!("unrecognised actor role: {e}")))?;
    Ok(Actor::new(id, role))
}

impl FromRequest for RequestActor {
    type Error = ServerError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let result = actor_from_request(req).map(RequestActor);
        Box::pin(async move { result })
    }
}
