use chrono::{DateTime, Duration, Utc};
use hudini_shared::pii::Masked;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info};

use crate::error::{PmsError, PmsResult};

/// Renew when the token has this much life left (or less).
pub const DEFAULT_REFRESH_MARGIN_SECS: i64 = 300;

pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Used by tests and simulations.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Bearer token plus the instant it stops being accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub access_token: Masked<String>,
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token.expose())
    }
}

/// What a vendor token endpoint hands back
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: String,
    pub expires_in: Duration,
}

impl TokenGrant {
    /// From a vendor's `expires_in` seconds. Out-of-range values saturate and
    /// are rejected when the session is installed.
    pub fn from_seconds(access_token: impl Into<String>, expires_in: i64) -> Self {
        Self {
            access_token: access_token.into(),
            expires_in: Duration::try_seconds(expires_in).unwrap_or(Duration::MAX),
        }
    }
}

/// Per-adapter session holder.
///
/// The session itself sits behind a short-lived `RwLock` so `is_valid()` can be
/// answered synchronously. Logins go through `login_gate`, an async mutex held
/// across the vendor call: concurrent callers that find the token near expiry
/// queue on the gate, and everyone after the first re-checks and reuses the
/// freshly installed session instead of logging in again.
pub struct SessionStore {
    provider: String,
    session: RwLock<Option<AuthSession>>,
    login_gate: tokio::sync::Mutex<()>,
    margin: Duration,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("provider", &self.provider)
            .field("expires_at", &self.expires_at())
            .field("margin_secs", &self.margin.num_seconds())
            .finish()
    }
}

impl SessionStore {
    pub fn new(provider: impl Into<String>, margin: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            provider: provider.into(),
            session: RwLock::new(None),
            login_gate: tokio::sync::Mutex::new(()),
            margin,
            clock,
        }
    }

    pub fn with_system_clock(provider: impl Into<String>) -> Self {
        Self::new(
            provider,
            Duration::seconds(DEFAULT_REFRESH_MARGIN_SECS),
            Arc::new(SystemClock),
        )
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn margin(&self) -> Duration {
        self.margin
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn current(&self) -> Option<AuthSession> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.current().map(|s| s.expires_at)
    }

    /// Token present and not yet expired
    pub fn is_valid(&self) -> bool {
        match self.current() {
            Some(session) => !session.access_token.is_blank() && self.now() < session.expires_at,
            None => false,
        }
    }

    /// No session, or inside the renewal margin
    pub fn needs_refresh(&self) -> bool {
        match self.current() {
            Some(session) => self.now() >= session.expires_at - self.margin,
            None => true,
        }
    }

    /// Authorization header value for the current session, if it is still valid
    pub fn bearer(&self) -> PmsResult<String> {
        match self.current() {
            Some(session) if self.now() < session.expires_at => Ok(session.bearer()),
            _ => Err(PmsError::SessionExpired(self.provider.clone())),
        }
    }

    /// Drop the session, e.g. after the vendor answered 401 with it.
    pub fn invalidate(&self) {
        let mut guard = self.session.write().unwrap_or_else(PoisonError::into_inner);
        if guard.take().is_some() {
            debug!(provider = %self.provider, "session invalidated");
        }
    }

    /// Unconditionally log in and install the new session.
    pub async fn establish<F, Fut>(&self, login: F) -> PmsResult<AuthSession>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = PmsResult<TokenGrant>>,
    {
        let _gate = self.login_gate.lock().await;
        self.login_and_install(login).await
    }

    /// Log in only when the session is missing or inside the margin.
    ///
    /// Returns `Ok(true)` when this call performed the login, `Ok(false)` when
    /// the session was fresh (possibly because a concurrent caller renewed it
    /// while we waited on the gate).
    pub async fn refresh_if_needed<F, Fut>(&self, login: F) -> PmsResult<bool>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = PmsResult<TokenGrant>>,
    {
        if !self.needs_refresh() {
            return Ok(false);
        }

        let _gate = self.login_gate.lock().await;
        if !self.needs_refresh() {
            debug!(provider = %self.provider, "session renewed by a concurrent caller");
            return Ok(false);
        }

        self.login_and_install(login).await?;
        Ok(true)
    }

    async fn login_and_install<F, Fut>(&self, login: F) -> PmsResult<AuthSession>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = PmsResult<TokenGrant>>,
    {
        let grant = login().await?;

        if grant.access_token.trim().is_empty() {
            return Err(PmsError::AuthenticationFailed {
                provider: self.provider.clone(),
                reason: "token endpoint returned an empty access token".to_string(),
            });
        }
        if grant.expires_in <= Duration::zero() {
            return Err(PmsError::AuthenticationFailed {
                provider: self.provider.clone(),
                reason: format!(
                    "token endpoint returned non-positive lifetime ({}s)",
                    grant.expires_in.num_seconds()
                ),
            });
        }

        let expires_at = self
            .now()
            .checked_add_signed(grant.expires_in)
            .ok_or_else(|| PmsError::AuthenticationFailed {
                provider: self.provider.clone(),
                reason: format!(
                    "token endpoint returned an out-of-range lifetime ({}s)",
                    grant.expires_in.num_seconds()
                ),
            })?;

        let session = AuthSession {
            access_token: Masked::new(grant.access_token),
            expires_at,
        };

        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        info!(
            provider = %self.provider,
            expires_at = %session.expires_at,
            "session established"
        );
        Ok(session)
    }
}
