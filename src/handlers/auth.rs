//! Identity extraction from the `token` cookie.
//!
//! Missing or invalid identity is never a hard failure: pages fall back to the
//! sign-in view and mutations redirect there.

use super::AppState;
use crate::services::identity::{Identity, identify};
use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use std::convert::Infallible;
use tracing::debug;

pub const TOKEN_COOKIE: &str = "token";

fn token_from(parts: &Parts) -> Option<String> {
    CookieJar::from_headers(&parts.headers)
        .get(TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

/// Identity if the request carries a valid token, otherwise `None`.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Identity>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from(parts);
        let identity = identify(state.verifier.as_ref(), token.as_deref()).await.ok();
        Ok(MaybeUser(identity))
    }
}

/// Identity of the caller; rejects with a redirect to `/` when absent.
#[derive(Debug, Clone)]
pub struct RequireUser(pub Identity);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AuthRedirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from(parts);
        match identify(state.verifier.as_ref(), token.as_deref()).await {
            Ok(identity) => Ok(RequireUser(identity)),
            Err(err) => {
                debug!("{} for {}; redirecting to sign-in", err, parts.uri.path());
                Err(AuthRedirect)
            }
        }
    }
}

/// Rejection for [`RequireUser`].
#[derive(Debug)]
pub struct AuthRedirect;

impl IntoResponse for AuthRedirect {
    fn into_response(self) -> Response {
        Redirect::to("/").into_response()
    }
}
