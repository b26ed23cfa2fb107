//! Client-side token lifecycle.
//!
//! [`TokenManager`] owns the stored token pair. Callers ask it for a usable
//! access token; it refreshes proactively (on a timer, shortly before expiry)
//! and on demand, and guarantees that at most one refresh request is in
//! flight. Everyone who asks while a refresh is running waits for that one
//! result.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, RwLock as StdRwLock, Weak};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::TokenManagerConfig;
use crate::error::{ClientError, ClientResult};
use crate::jwt::decode_unverified;
use crate::refresh::{RefreshClient, RefreshError, RefreshedTokens};
use crate::storage::{TokenStorage, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, TOKEN_EXPIRY_KEY};

/// The timer is never re-armed sooner than this.
const MIN_REFRESH_DELAY: Duration = Duration::from_secs(5);
/// Longest single timer wait, for very long-lived tokens.
const MAX_REFRESH_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Where the stored tokens stand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    NoTokens,
    Valid,
    /// Inside the refresh threshold, or only a refresh token is stored
    RefreshDue,
    Refreshing,
    /// The last refresh failed for good; a new login is required
    Expired,
}

/// Snapshot of the stored access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub token: String,
    pub is_expired: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub time_until_expiry: Option<chrono::Duration>,
}

/// Raw stored tokens, without any refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// Timing read from an access token, in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Expiry {
    exp: i64,
    iat: Option<i64>,
}

impl Expiry {
    fn of(token: &str) -> Option<Self> {
        decode_unverified(token).ok().map(|claims| Self {
            exp: claims.exp,
            iat: claims.iat,
        })
    }

    /// For an opaque token the server said lives `seconds` from now.
    fn issued_now(seconds: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            exp: now.saturating_add(seconds),
            iat: Some(now),
        }
    }

    fn millis_left(&self) -> i64 {
        self.exp
            .saturating_mul(1000)
            .saturating_sub(Utc::now().timestamp_millis())
    }

    fn lifetime_millis(&self) -> Option<i64> {
        self.iat
            .filter(|iat| *iat < self.exp)
            .map(|iat| self.exp.saturating_sub(iat).saturating_mul(1000))
    }

    fn is_past(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// What asked for a refresh.
enum Trigger {
    /// The token was found inside the threshold
    OnDemand,
    Forced,
    /// The proactive timer armed for this access token
    Timer(String),
}

impl Trigger {
    fn name(&self) -> &'static str {
        match self {
            Trigger::OnDemand => "on_demand",
            Trigger::Forced => "forced",
            Trigger::Timer(_) => "timer",
        }
    }
}

type ExpiryCallback = Arc<dyn Fn() + Send + Sync>;
type Waiter = oneshot::Sender<ClientResult<String>>;

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: Vec<Waiter>,
    worker: Option<JoinHandle<()>>,
    expired: bool,
    /// Bumped whenever tokens are replaced or cleared, so a refresh that
    /// started earlier cannot write over them.
    generation: u64,
}

struct Inner {
    config: TokenManagerConfig,
    storage: Arc<dyn TokenStorage>,
    refresher: Arc<dyn RefreshClient>,
    refresh: Mutex<RefreshState>,
    timer: StdMutex<Option<JoinHandle<()>>>,
    callbacks: StdRwLock<Vec<ExpiryCallback>>,
    destroyed: AtomicBool,
}

/// Handle to the token lifecycle. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct TokenManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("config", &self.inner.config)
            .field("storage", &self.inner.storage.name())
            .field("destroyed", &self.inner.destroyed.load(Ordering::SeqCst))
            .finish()
    }
}

impl TokenManager {
    pub fn new(
        config: TokenManagerConfig,
        storage: Arc<dyn TokenStorage>,
        refresher: Arc<dyn RefreshClient>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                storage,
                refresher,
                refresh: Mutex::new(RefreshState::default()),
                timer: StdMutex::new(None),
                callbacks: StdRwLock::new(Vec::new()),
                destroyed: AtomicBool::new(false),
            }),
        }
    }

    /// Schedule the proactive refresh for tokens persisted by an earlier run.
    pub async fn initialize(&self) {
        if self.inner.is_destroyed() {
            return;
        }
        let Some(access) = self.inner.read(ACCESS_TOKEN_KEY).await else {
            debug!(storage = self.inner.storage.name(), "No stored access token");
            return;
        };
        match self.inner.expiry_of(&access).await {
            Some(expiry) => {
                info!(storage = self.inner.storage.name(), "Restored stored tokens");
                self.inner.schedule_refresh(&access, expiry);
            }
            None => warn!("Stored access token has no readable expiry"),
        }
    }

    /// A usable access token, refreshing first when it is close to expiry.
    ///
    /// If the refresh fails but the current token has not yet expired, the
    /// current token is returned.
    pub async fn get_access_token(&self) -> Option<String> {
        self.require_access_token().await.ok()
    }

    /// Like [`get_access_token`](Self::get_access_token), with the reason
    /// when there is no token.
    pub async fn require_access_token(&self) -> ClientResult<String> {
        let inner = &self.inner;
        if inner.is_destroyed() {
            return Err(ClientError::ManagerDestroyed);
        }

        let Some(token) = inner.read(ACCESS_TOKEN_KEY).await else {
            return match inner.read(REFRESH_TOKEN_KEY).await {
                Some(_) => inner.refresh(Trigger::OnDemand).await,
                None => Err(ClientError::AuthenticationRequired),
            };
        };

        let expiry = inner.expiry_of(&token).await;
        if !inner.needs_refresh(expiry) {
            return Ok(token);
        }

        match inner.refresh(Trigger::OnDemand).await {
            Ok(fresh) => Ok(fresh),
            Err(e) if !is_expired(expiry) => {
                warn!(error = %e, "Token refresh failed, using current access token");
                Ok(token)
            }
            Err(e) => Err(e),
        }
    }

    /// True when an unexpired access token or a refresh token is stored.
    pub async fn is_authenticated(&self) -> bool {
        let inner = &self.inner;
        if inner.is_destroyed() {
            return false;
        }
        if let Some(token) = inner.read(ACCESS_TOKEN_KEY).await {
            if !is_expired(inner.expiry_of(&token).await) {
                return true;
            }
        }
        inner.read(REFRESH_TOKEN_KEY).await.is_some()
    }

    /// The stored access token while it is outside the refresh threshold,
    /// otherwise the token from a refresh. Concurrent callers share one
    /// refresh. Unlike [`require_access_token`](Self::require_access_token),
    /// a failed refresh is returned as an error.
    pub async fn refresh_token_if_needed(&self) -> ClientResult<String> {
        let inner = &self.inner;
        if inner.is_destroyed() {
            return Err(ClientError::ManagerDestroyed);
        }
        if let Some(token) = inner.read(ACCESS_TOKEN_KEY).await {
            if !inner.needs_refresh(inner.expiry_of(&token).await) {
                return Ok(token);
            }
        }
        inner.refresh(Trigger::OnDemand).await
    }

    /// Refresh now, regardless of expiry.
    pub async fn force_refresh(&self) -> ClientResult<String> {
        self.inner.refresh(Trigger::Forced).await
    }

    /// Store a new pair and schedule the next proactive refresh.
    pub async fn set_tokens(&self, access_token: &str, refresh_token: &str) -> ClientResult<()> {
        let inner = &self.inner;
        if inner.is_destroyed() {
            return Err(ClientError::ManagerDestroyed);
        }
        let expiry = Expiry::of(access_token).ok_or_else(|| {
            ClientError::InvalidToken("access token has no readable expiry".to_string())
        })?;

        let mut state = inner.refresh.lock().await;
        state.generation += 1;
        state.expired = false;
        inner.write(ACCESS_TOKEN_KEY, access_token).await;
        inner.write(REFRESH_TOKEN_KEY, refresh_token).await;
        inner.write(TOKEN_EXPIRY_KEY, &expiry.exp.to_string()).await;
        inner.schedule_refresh(access_token, expiry);
        drop(state);

        debug!(exp = expiry.exp, "Tokens stored");
        Ok(())
    }

    /// Forget the stored tokens and stop the refresh timer.
    pub async fn clear_tokens(&self) {
        let inner = &self.inner;
        let mut state = inner.refresh.lock().await;
        state.generation += 1;
        state.expired = false;
        inner.cancel_timer();
        inner.clear_storage().await;
        drop(state);

        debug!("Tokens cleared");
    }

    pub async fn stored_tokens(&self) -> StoredTokens {
        StoredTokens {
            access_token: self.inner.read(ACCESS_TOKEN_KEY).await,
            refresh_token: self.inner.read(REFRESH_TOKEN_KEY).await,
        }
    }

    pub async fn token_info(&self) -> Option<TokenInfo> {
        let token = self.inner.read(ACCESS_TOKEN_KEY).await?;
        let expiry = self.inner.expiry_of(&token).await;
        let expires_at = expiry.and_then(|expiry| Utc.timestamp_opt(expiry.exp, 0).single());
        Some(TokenInfo {
            token,
            is_expired: is_expired(expiry),
            expires_at,
            time_until_expiry: expires_at.map(|at| at - Utc::now()),
        })
    }

    pub async fn state(&self) -> TokenState {
        let inner = &self.inner;
        let state = inner.refresh.lock().await;
        if state.in_flight {
            return TokenState::Refreshing;
        }
        if state.expired {
            return TokenState::Expired;
        }
        drop(state);

        match inner.read(ACCESS_TOKEN_KEY).await {
            Some(token) if !inner.needs_refresh(inner.expiry_of(&token).await) => TokenState::Valid,
            Some(_) => TokenState::RefreshDue,
            None if inner.read(REFRESH_TOKEN_KEY).await.is_some() => TokenState::RefreshDue,
            None => TokenState::NoTokens,
        }
    }

    /// Register a callback run when a refresh fails for good.
    pub fn on_token_expired<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut callbacks = match self.inner.callbacks.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        callbacks.push(Arc::new(callback));
    }

    /// Stop the timer, abandon any running refresh and reject its waiters.
    /// Every later call fails with [`ClientError::ManagerDestroyed`].
    pub async fn destroy(&self) {
        let inner = &self.inner;
        if inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        inner.cancel_timer();

        let waiters = {
            let mut state = inner.refresh.lock().await;
            if let Some(worker) = state.worker.take() {
                worker.abort();
            }
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };
        let rejected = waiters.len();
        for waiter in waiters {
            let _ = waiter.send(Err(ClientError::ManagerDestroyed));
        }
        info!(rejected, "Token manager destroyed");
    }
}

impl Inner {
    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.storage.get_token(key).await {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(key, storage = self.storage.name(), error = %e, "Token read failed");
                None
            }
        }
    }

    async fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.storage.set_token(key, value).await {
            warn!(key, storage = self.storage.name(), error = %e, "Token write failed");
        }
    }

    async fn clear_storage(&self) {
        if let Err(e) = self.storage.clear().await {
            warn!(storage = self.storage.name(), error = %e, "Token clear failed");
        }
    }

    /// Expiry read from the token, falling back to the stored copy.
    async fn expiry_of(&self, token: &str) -> Option<Expiry> {
        match Expiry::of(token) {
            Some(expiry) => Some(expiry),
            None => self
                .read(TOKEN_EXPIRY_KEY)
                .await
                .and_then(|value| value.parse().ok())
                .map(|exp| Expiry { exp, iat: None }),
        }
    }

    /// The configured threshold, capped at half the token's lifetime so a
    /// short-lived token is not already due when it arrives.
    fn threshold_millis(&self, expiry: &Expiry) -> i64 {
        let configured =
            i64::try_from(self.config.refresh_threshold.as_millis()).unwrap_or(i64::MAX);
        match expiry.lifetime_millis() {
            Some(lifetime) => configured.min(lifetime / 2),
            None => configured,
        }
    }

    /// Unknown expiry counts as due.
    fn needs_refresh(&self, expiry: Option<Expiry>) -> bool {
        match expiry {
            Some(expiry) => expiry.millis_left() <= self.threshold_millis(&expiry),
            None => true,
        }
    }

    /// Join the running refresh, or start one.
    async fn refresh(self: &Arc<Self>, trigger: Trigger) -> ClientResult<String> {
        if self.is_destroyed() {
            return Err(ClientError::ManagerDestroyed);
        }

        let receiver = {
            let mut state = self.refresh.lock().await;
            if !state.in_flight {
                // A refresh may have finished while we waited for the lock.
                match &trigger {
                    Trigger::OnDemand => {
                        if let Some(token) = self.read(ACCESS_TOKEN_KEY).await {
                            if !self.needs_refresh(self.expiry_of(&token).await) {
                                return Ok(token);
                            }
                        }
                    }
                    Trigger::Timer(scheduled) => {
                        let current = self.read(ACCESS_TOKEN_KEY).await;
                        if current.as_deref() != Some(scheduled.as_str()) {
                            debug!("Timer token already replaced");
                            return current.ok_or(ClientError::AuthenticationRequired);
                        }
                    }
                    Trigger::Forced => {}
                }
                let Some(refresh_token) = self.read(REFRESH_TOKEN_KEY).await else {
                    return Err(ClientError::AuthenticationRequired);
                };

                state.in_flight = true;
                let generation = state.generation;
                let inner = Arc::clone(self);
                state.worker = Some(tokio::spawn(async move {
                    inner.run_refresh(refresh_token, generation).await;
                }));
                debug!(trigger = trigger.name(), "Token refresh started");
            }

            let (sender, receiver) = oneshot::channel();
            state.waiters.push(sender);
            receiver
        };

        receiver.await.unwrap_or_else(|_| {
            Err(ClientError::TokenRefresh(
                "refresh task ended without a result".to_string(),
            ))
        })
    }

    async fn run_refresh(self: Arc<Self>, refresh_token: String, generation: u64) {
        let outcome = self
            .refresh_with_retry(&refresh_token)
            .await
            .and_then(|tokens| {
                let expiry = Expiry::of(&tokens.access_token)
                    .or_else(|| tokens.expires_in.map(Expiry::issued_now))
                    .ok_or_else(|| {
                        ClientError::InvalidToken(
                            "refreshed access token has no readable expiry".to_string(),
                        )
                    })?;
                Ok((tokens, expiry))
            });

        let mut state = self.refresh.lock().await;
        let current = state.generation == generation;
        let mut expired = false;

        let result = match outcome {
            Ok((tokens, expiry)) if current => {
                self.write(ACCESS_TOKEN_KEY, &tokens.access_token).await;
                if let Some(rotated) = &tokens.refresh_token {
                    self.write(REFRESH_TOKEN_KEY, rotated).await;
                }
                self.write(TOKEN_EXPIRY_KEY, &expiry.exp.to_string()).await;
                self.schedule_refresh(&tokens.access_token, expiry);
                state.expired = false;
                info!(exp = expiry.exp, "Access token refreshed");
                Ok(tokens.access_token)
            }
            Err(e) if current => {
                warn!(error = %e, "Token refresh failed, clearing tokens");
                self.cancel_timer();
                self.clear_storage().await;
                state.generation += 1;
                state.expired = true;
                expired = true;
                Err(e)
            }
            // Tokens were replaced or cleared while this refresh ran.
            _ => {
                debug!("Discarding stale refresh result");
                self.read(ACCESS_TOKEN_KEY)
                    .await
                    .ok_or(ClientError::AuthenticationRequired)
            }
        };

        state.in_flight = false;
        state.worker = None;
        let waiters = std::mem::take(&mut state.waiters);
        drop(state);

        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
        if expired {
            self.notify_expired();
        }
    }

    async fn refresh_with_retry(&self, refresh_token: &str) -> ClientResult<RefreshedTokens> {
        let max_attempts = self.config.max_refresh_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.refresher.refresh(refresh_token).await {
                Ok(tokens) => return Ok(tokens),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.config.retry_delay(attempt);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        reason = %e,
                        "Token refresh failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(RefreshError::Rejected {
                    status,
                    code,
                    message,
                }) => {
                    warn!(status, code = %code, "Refresh token rejected");
                    return Err(if code == "TOKEN_EXPIRED" {
                        ClientError::TokenExpired
                    } else {
                        ClientError::TokenRefresh(message)
                    });
                }
                Err(RefreshError::Transient(reason)) => {
                    return Err(ClientError::TokenRefresh(reason));
                }
            }
        }
    }

    /// Arm the timer to refresh `token` once it enters the threshold.
    fn schedule_refresh(self: &Arc<Self>, token: &str, expiry: Expiry) {
        if self.is_destroyed() {
            return;
        }
        let due_in = expiry
            .millis_left()
            .saturating_sub(self.threshold_millis(&expiry));
        let delay = Duration::from_millis(u64::try_from(due_in).unwrap_or(0))
            .clamp(MIN_REFRESH_DELAY, MAX_REFRESH_DELAY);

        let scheduled = token.to_string();
        let weak: Weak<Inner> = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            debug!("Proactive token refresh");
            if let Err(e) = inner.refresh(Trigger::Timer(scheduled)).await {
                warn!(error = %e, "Proactive token refresh failed");
            }
        });

        if let Some(previous) = self.lock_timer().replace(handle) {
            previous.abort();
        }
        debug!(delay_ms = delay.as_millis() as u64, "Token refresh scheduled");
    }

    fn cancel_timer(&self) {
        if let Some(handle) = self.lock_timer().take() {
            handle.abort();
        }
    }

    fn lock_timer(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        match self.timer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn notify_expired(&self) {
        let callbacks: Vec<ExpiryCallback> = match self.callbacks.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        for callback in callbacks {
            callback();
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let timer = match self.timer.get_mut() {
            Ok(timer) => timer,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(handle) = timer.take() {
            handle.abort();
        }
    }
}

/// Strictly past expiry. Unknown expiry counts as expired.
fn is_expired(expiry: Option<Expiry>) -> bool {
    expiry.map_or(true, |expiry| expiry.is_past())
}
