//! Session lifecycle: login, refresh, and authorized requests
//!
//! A session binds bearer tokens to the hosting endpoint that issued them.
//! Once created, all calls for the session target that endpoint — it is
//! never re-resolved implicitly. Tokens live only in client memory and are
//! never written to durable storage.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::AtprotoClient;
use crate::error::{ClientError, Result};
use crate::xrpc::{send_with_retry, server_message};

/// An authenticated session bound to one hosting endpoint
#[derive(Debug, Clone)]
pub struct Session {
    pub did: String,
    pub handle: String,
    /// The hosting endpoint the tokens were issued by
    pub pds: String,
    pub access_jwt: String,
    pub refresh_jwt: String,
}

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    did: String,
    handle: String,
    access_jwt: String,
    refresh_jwt: String,
}

impl AtprotoClient {
    /// Exchange a handle and app password for a session bound to the
    /// handle's resolved hosting endpoint
    pub async fn login(&self, handle: &str, password: &str) -> Result<Session> {
        if handle.is_empty() || password.is_empty() {
            return Err(ClientError::Validation(
                "handle and password are required".to_string(),
            ));
        }

        let identity = self.resolver.resolve_identity(handle).await?;
        let url = format!("{}/xrpc/com.atproto.server.createSession", identity.pds);
        let body = CreateSessionRequest {
            identifier: &identity.did,
            password,
        };

        let response = send_with_retry(self.http.post(&url).json(&body)).await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = server_message(response)
                .await
                .unwrap_or_else(|| format!("login failed ({status})"));
            return Err(ClientError::Auth(message));
        }

        let data: SessionResponse = response.json().await?;
        let session = Session {
            did: data.did,
            handle: data.handle,
            pds: identity.pds,
            access_jwt: data.access_jwt,
            refresh_jwt: data.refresh_jwt,
        };

        debug!(did = %session.did, pds = %session.pds, "session created");
        *self.session.write().await = Some(session.clone());
        Ok(session)
    }

    /// Exchange the refresh token for fresh tokens, mutating the held session.
    ///
    /// A refresh failure means the session is dead: it is cleared before the
    /// error surfaces.
    pub async fn refresh_session(&self) -> Result<Session> {
        let (pds, refresh_jwt) = {
            let guard = self.session.read().await;
            let session = guard
                .as_ref()
                .ok_or_else(|| ClientError::Auth("no session to refresh".to_string()))?;
            (session.pds.clone(), session.refresh_jwt.clone())
        };

        let url = format!("{pds}/xrpc/com.atproto.server.refreshSession");
        let response = send_with_retry(self.http.post(&url).bearer_auth(&refresh_jwt)).await?;
        if !response.status().is_success() {
            *self.session.write().await = None;
            return Err(ClientError::Auth("session expired".to_string()));
        }

        let data: SessionResponse = response.json().await?;
        let mut guard = self.session.write().await;
        let session = guard
            .as_mut()
            .ok_or_else(|| ClientError::Auth("no session to refresh".to_string()))?;
        session.access_jwt = data.access_jwt;
        session.refresh_jwt = data.refresh_jwt;
        Ok(session.clone())
    }

    /// Drop the held session
    pub async fn logout(&self) {
        *self.session.write().await = None;
    }

    /// A copy of the current session, if logged in
    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    pub async fn is_logged_in(&self) -> bool {
        self.session.read().await.is_some()
    }

    pub(crate) async fn require_session(&self) -> Result<Session> {
        self.session
            .read()
            .await
            .clone()
            .ok_or_else(|| ClientError::Auth("not logged in".to_string()))
    }

    /// Send a request with the access token attached as a bearer credential.
    ///
    /// On 401 the session is refreshed once and the request replayed with
    /// the new token; a second 401 clears the session and is terminal.
    pub(crate) async fn send_authorized(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        let session = self.require_session().await?;
        let replay = builder.try_clone();

        let response = send_with_retry(builder.bearer_auth(&session.access_jwt)).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!("access token rejected, refreshing session");
        let refreshed = self.refresh_session().await?;
        let builder = replay.ok_or_else(|| {
            ClientError::Auth("cannot replay request after token refresh".to_string())
        })?;

        let response = send_with_retry(builder.bearer_auth(&refreshed.access_jwt)).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            *self.session.write().await = None;
            return Err(ClientError::Auth(
                "unauthorized after token refresh".to_string(),
            ));
        }
        Ok(response)
    }
}
