//! Request authentication.
//!
//! Identity lives outside this service: a fronting proxy authenticates
//! the caller and forwards the username in `X-Remote-User`. The
//! [`Actor`] extractor resolves that header through the store; a
//! missing header, an unknown username, or a deactivated account all
//! reject the request with 401.

use axum::{extract::FromRequestParts, http::request::Parts};
use pacta_core::{store::ContractStore, user::User};

use crate::{AppState, error::ApiError};

pub const REMOTE_USER_HEADER: &str = "x-remote-user";

/// The authenticated caller, resolved to a stored [`User`].
#[derive(Debug, Clone)]
pub struct Actor(pub User);

impl<S> FromRequestParts<AppState<S>> for Actor
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let username = parts
      .headers
      .get(REMOTE_USER_HEADER)
      .and_then(|v| v.to_str().ok())
      .filter(|v| !v.is_empty())
      .ok_or_else(|| {
        ApiError::Unauthorized("missing X-Remote-User header".into())
      })?;

    let user = state
      .store
      .get_user_by_username(username.to_owned())
      .await
      .map_err(ApiError::from_store)?
      .ok_or_else(|| {
        ApiError::Unauthorized(format!("unknown user {username:?}"))
      })?;

    if !user.active {
      return Err(ApiError::Unauthorized(format!(
        "user {username:?} is deactivated"
      )));
    }
    Ok(Actor(user))
  }
}

/// Client address and user agent for read-side audit events.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
  pub ip_address: Option<String>,
  pub user_agent: Option<String>,
}

impl<S: Send + Sync> FromRequestParts<S> for RequestContext {
  type Rejection = std::convert::Infallible;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    let header = |name: &str| {
      parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
    };
    Ok(Self {
      // Behind the fronting proxy the peer address is the proxy's, so
      // the forwarded header is the one worth recording.
      ip_address: header("x-forwarded-for")
        .map(|v| v.split(',').next().unwrap_or("").trim().to_owned())
        .filter(|v| !v.is_empty()),
      user_agent: header("user-agent"),
    })
  }
}
