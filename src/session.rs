//! Session lifecycle and the authenticated-request pipeline.
//!
//! [`SessionManager`] owns the current user identity and token pair. All
//! authenticated calls route through one wrapper: on a 401 the session is
//! refreshed and the call retried exactly once, for JSON and binary
//! requests alike.

use std::future::Future;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::error::Error;
use crate::token_store::TokenStore;
use crate::transport::{Transport, authorize};
use crate::types::{AuthResponse, Credentials, ProfileDraft, SignUpForm, UserProfile};

#[derive(Debug, Clone, Default)]
struct SessionState {
    user: Option<UserProfile>,
    access_token: String,
    refresh_token: String,
}

/// Client-side session over the workspace API.
///
/// Constructed once at process start and injected into consumers; state
/// transitions happen only in response to server responses, and every
/// mutation replaces the affected fields wholesale.
pub struct SessionManager {
    pub(crate) transport: Transport,
    token_store: TokenStore,
    state: RwLock<SessionState>,
    ready: AtomicBool,
}

#[derive(Serialize)]
struct RefreshRequest {
    refresh_token: String,
}

#[derive(Serialize)]
struct SignOutRequest {
    refresh_token: String,
}

#[derive(Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_name: Option<&'a str>,
}

#[derive(Deserialize)]
struct AccountPayload {
    user: UserProfile,
}

/// Wire shape for `PATCH /v1/account/me`. Outer `None` omits the field,
/// inner `None` serializes as an explicit `null` (clear the field).
#[derive(Debug, Default, Serialize)]
struct AccountPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_name: Option<Option<String>>,
}

impl SessionManager {
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let token_store = match config.token_slot {
            Some(path) => TokenStore::at_path(path),
            None => TokenStore::new(config.storage_mode),
        };
        let state = SessionState {
            // Seed the holder once from durable storage.
            refresh_token: token_store.read(),
            ..SessionState::default()
        };
        Self {
            transport: Transport::new(config.base_url, config.http),
            token_store,
            state: RwLock::new(state),
            ready: AtomicBool::new(false),
        }
    }

    /// Restore a previous session from the stored refresh token.
    ///
    /// Runs once at process start. Without a stored token this is a no-op
    /// (no network call); otherwise a refresh is attempted. Either way the
    /// session ends up ready, authenticated or anonymous.
    pub async fn bootstrap(&self) {
        if self.ready.load(Ordering::Acquire) {
            return;
        }
        if self.has_refresh_token() {
            self.refresh().await;
        }
        self.ready.store(true, Ordering::Release);
    }

    /// Whether the initial bootstrap attempt has completed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Holds iff a user is present and an access token is held.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        let state = self.state.read().expect("session lock");
        state.user.is_some() && !state.access_token.is_empty()
    }

    #[must_use]
    pub fn has_refresh_token(&self) -> bool {
        !self.state.read().expect("session lock").refresh_token.is_empty()
    }

    /// Snapshot of the current user, if authenticated.
    #[must_use]
    pub fn current_user(&self) -> Option<UserProfile> {
        self.state.read().expect("session lock").user.clone()
    }

    pub(crate) fn access_token(&self) -> String {
        self.state.read().expect("session lock").access_token.clone()
    }

    /// Register a new account and open a session.
    ///
    /// On failure the session state is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] when the server rejects the registration, or
    /// [`Error::Http`] on network failure.
    pub async fn sign_up(&self, form: &SignUpForm) -> Result<UserProfile, Error> {
        let body = SignUpRequest {
            email: &form.email,
            password: &form.password,
            first_name: form.first_name.as_deref().filter(|s| !s.is_empty()),
            last_name: form.last_name.as_deref().filter(|s| !s.is_empty()),
        };
        let payload = self
            .transport
            .send_json(
                self.transport
                    .request(Method::POST, "/v1/auth/sign-up")
                    .json(&body),
            )
            .await?;
        let auth: AuthResponse = serde_json::from_value(payload)?;
        let user = auth.user.clone();
        self.apply_auth_response(auth);
        tracing::info!(user = %user.email, "sign-up successful");
        Ok(user)
    }

    /// Open a session with existing credentials.
    ///
    /// On failure the session state is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] when the server rejects the credentials, or
    /// [`Error::Http`] on network failure.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<UserProfile, Error> {
        let payload = self
            .transport
            .send_json(
                self.transport
                    .request(Method::POST, "/v1/auth/sign-in")
                    .json(credentials),
            )
            .await?;
        let auth: AuthResponse = serde_json::from_value(payload)?;
        let user = auth.user.clone();
        self.apply_auth_response(auth);
        tracing::info!(user = %user.email, "sign-in successful");
        Ok(user)
    }

    /// Exchange the held refresh token for a new token pair.
    ///
    /// Returns false without a network call when no refresh token is held.
    /// Any failure fully clears the session, including durable storage: a
    /// failed refresh always deauthenticates.
    pub async fn refresh(&self) -> bool {
        let refresh_token = {
            self.state.read().expect("session lock").refresh_token.clone()
        };
        if refresh_token.is_empty() {
            return false;
        }

        let result = self
            .transport
            .send_json(
                self.transport
                    .request(Method::POST, "/v1/auth/refresh")
                    .json(&RefreshRequest { refresh_token }),
            )
            .await
            .and_then(|payload| {
                serde_json::from_value::<AuthResponse>(payload).map_err(Error::from)
            });

        match result {
            Ok(auth) => {
                self.apply_auth_response(auth);
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "token refresh failed; clearing session");
                self.clear_session();
                false
            }
        }
    }

    /// Invalidate the refresh token server-side (best effort) and clear the
    /// local session. A network failure never blocks the local sign-out.
    pub async fn sign_out(&self) {
        let refresh_token = {
            self.state.read().expect("session lock").refresh_token.clone()
        };
        if !refresh_token.is_empty() {
            let result = self
                .transport
                .send_json(
                    self.transport
                        .request(Method::POST, "/v1/auth/sign-out")
                        .json(&SignOutRequest { refresh_token }),
                )
                .await;
            if let Err(err) = result {
                tracing::warn!(error = %err, "sign-out request failed; clearing local session anyway");
            }
        }
        self.clear_session();
    }

    /// Fetch the account profile, replacing the held user wholesale.
    ///
    /// # Errors
    ///
    /// Propagates the unresolved failure of the authenticated call.
    pub async fn fetch_me(&self) -> Result<UserProfile, Error> {
        let payload = self
            .request_with_refresh(|token| {
                let request = authorize(
                    self.transport.request(Method::GET, "/v1/account/me"),
                    &token,
                );
                self.transport.send_json(request)
            })
            .await?;
        let account: AccountPayload = serde_json::from_value(payload)?;
        self.replace_user(account.user.clone());
        Ok(account.user)
    }

    /// Patch the account profile with the fields of `draft` that differ from
    /// the held profile; unchanged fields are omitted, fields changed to
    /// blank are sent as explicit `null`.
    ///
    /// # Errors
    ///
    /// Propagates the unresolved failure of the authenticated call.
    pub async fn update_me(&self, draft: &ProfileDraft) -> Result<UserProfile, Error> {
        let patch = {
            let state = self.state.read().expect("session lock");
            let (current_first, current_last) = state
                .user
                .as_ref()
                .map(|user| {
                    (
                        user.first_name.clone().unwrap_or_default(),
                        user.last_name.clone().unwrap_or_default(),
                    )
                })
                .unwrap_or_default();
            profile_patch(&current_first, &current_last, draft)
        };

        let payload = self
            .request_with_refresh(|token| {
                let request = authorize(
                    self.transport
                        .request(Method::PATCH, "/v1/account/me")
                        .json(&patch),
                    &token,
                );
                self.transport.send_json(request)
            })
            .await?;
        let account: AccountPayload = serde_json::from_value(payload)?;
        self.replace_user(account.user.clone());
        Ok(account.user)
    }

    /// Runs `execute` with the current access token, refreshing and retrying
    /// exactly once on a 401.
    ///
    /// An explicit two-iteration loop: after one retry the guard forbids
    /// further attempts even if the retry fails with 401 again. Any other
    /// failure propagates unchanged.
    pub(crate) async fn request_with_refresh<T, F, Fut>(&self, execute: F) -> Result<T, Error>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let mut retried = false;
        loop {
            match execute(self.access_token()).await {
                Ok(value) => return Ok(value),
                Err(err) if !retried && err.is_auth_expired() && self.has_refresh_token() => {
                    if !self.refresh().await {
                        return Err(err);
                    }
                    retried = true;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Applies an auth payload: user and both tokens replaced together, the
    /// new refresh token persisted.
    fn apply_auth_response(&self, auth: AuthResponse) {
        {
            let mut state = self.state.write().expect("session lock");
            state.user = Some(auth.user);
            state.access_token = auth.access_token;
            state.refresh_token = auth.refresh_token.clone();
        }
        self.token_store.write(&auth.refresh_token);
    }

    fn replace_user(&self, user: UserProfile) {
        self.state.write().expect("session lock").user = Some(user);
    }

    fn clear_session(&self) {
        {
            let mut state = self.state.write().expect("session lock");
            *state = SessionState::default();
        }
        self.token_store.clear();
    }
}

fn profile_patch(current_first: &str, current_last: &str, draft: &ProfileDraft) -> AccountPatch {
    let mut patch = AccountPatch::default();
    if draft.first_name != current_first {
        patch.first_name = Some(non_blank(&draft.first_name));
    }
    if draft.last_name != current_last {
        patch.last_name = Some(non_blank(&draft.last_name));
    }
    patch
}

fn non_blank(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patch_omits_unchanged_fields() {
        let draft = ProfileDraft {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
        };
        let patch = profile_patch("Ada", "", &draft);
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"last_name": "Lovelace"})
        );
    }

    #[test]
    fn patch_sends_null_for_cleared_fields() {
        let draft = ProfileDraft {
            first_name: String::new(),
            last_name: "Lovelace".into(),
        };
        let patch = profile_patch("Ada", "Lovelace", &draft);
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"first_name": null})
        );
    }

    #[test]
    fn patch_is_empty_when_nothing_changed() {
        let draft = ProfileDraft {
            first_name: "Ada".into(),
            last_name: String::new(),
        };
        let patch = profile_patch("Ada", "", &draft);
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({}));
    }

    #[test]
    fn sign_up_payload_omits_blank_names() {
        let body = SignUpRequest {
            email: "a@b.com",
            password: "pw",
            first_name: Some("Ada"),
            last_name: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"email": "a@b.com", "password": "pw", "first_name": "Ada"})
        );
    }
}
