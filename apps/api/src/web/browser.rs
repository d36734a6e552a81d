//! Per-browser state: the current session and the in-progress assessment.
//!
//! Each browser is identified by the `compass_sid` cookie. Its context lives in
//! memory; only the signed-in session is persisted, by a subscription that
//! writes every session change to the `SessionStore`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::assessment::AssessmentFlow;
use crate::identity::{AuthError, IdentityProvider, SessionClient, SessionState, Subscription};
use crate::models::Session;
use crate::state::AppState;
use crate::web::sessions::{SessionStore, SESSION_TTL_SECS};

pub const SESSION_COOKIE: &str = "compass_sid";

/// Signed-out contexts idle this long are dropped.
const ANONYMOUS_IDLE: Duration = Duration::from_secs(30 * 60);
const SWEEP_EVERY: Duration = Duration::from_secs(60);

pub struct BrowserContext {
    pub sid: Uuid,
    pub session: SessionClient,
    flow: Arc<Mutex<AssessmentFlow>>,
    last_seen: Mutex<Instant>,
    _persistence: Subscription,
}

impl BrowserContext {
    /// Never hold this guard across an `.await`.
    pub fn flow(&self) -> MutexGuard<'_, AssessmentFlow> {
        self.flow.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn touch(&self) {
        *self.last_seen.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }

    fn is_idle(&self, now: Instant) -> bool {
        let last_seen = *self.last_seen.lock().unwrap_or_else(|e| e.into_inner());
        let limit = if self.session.user().is_some() {
            Duration::from_secs(SESSION_TTL_SECS)
        } else {
            ANONYMOUS_IDLE
        };
        now.duration_since(last_seen) >= limit
    }
}

/// Registry of live browser contexts.
#[derive(Clone)]
pub struct BrowserSessions {
    contexts: Arc<RwLock<HashMap<Uuid, Arc<BrowserContext>>>>,
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn SessionStore>,
}

impl BrowserSessions {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            contexts: Arc::default(),
            identity,
            store,
        }
    }

    fn lookup(&self, sid: Uuid) -> Option<Arc<BrowserContext>> {
        let contexts = self.contexts.read().unwrap_or_else(|e| e.into_inner());
        let context = contexts.get(&sid).cloned()?;
        context.touch();
        Some(context)
    }

    /// Number of live contexts.
    pub fn live(&self) -> usize {
        self.contexts.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Finds the context for `sid`. A sid this process has not seen is only
    /// honoured when the session store holds a session for it; anything else
    /// gets a freshly minted id. The flag is true when the cookie must be set.
    pub async fn resolve(&self, sid: Option<Uuid>) -> (Arc<BrowserContext>, bool) {
        if let Some(existing) = sid.and_then(|sid| self.lookup(sid)) {
            return (existing, false);
        }

        let saved = match sid {
            Some(sid) => self.load(sid).await.map(|session| (sid, session)),
            None => None,
        };
        let (sid, saved, minted) = match saved {
            Some((sid, session)) => {
                info!("Restored session for uid {} on browser {sid}", session.uid);
                (sid, Some(session), false)
            }
            None => (Uuid::new_v4(), None, true),
        };

        let context = self.build(sid, Arc::default());
        context.session.restore(saved);

        let mut contexts = self.contexts.write().unwrap_or_else(|e| e.into_inner());
        let context = contexts.entry(sid).or_insert_with(|| Arc::new(context)).clone();
        (context, minted)
    }

    /// Signs in on a new browser id. The in-progress assessment moves over and
    /// the old id stops resolving. The caller must send the new cookie.
    pub async fn sign_in(
        &self,
        current: &BrowserContext,
        email: &str,
        password: &str,
    ) -> Result<(Arc<BrowserContext>, Session), AuthError> {
        let next = self.build(Uuid::new_v4(), current.flow.clone());
        let session = next.session.sign_in(email, password).await?;
        Ok((self.rotate(current, next).await, session))
    }

    /// Same as [`BrowserSessions::sign_in`] for a new account.
    pub async fn sign_up(
        &self,
        current: &BrowserContext,
        email: &str,
        password: &str,
    ) -> Result<(Arc<BrowserContext>, Session), AuthError> {
        let next = self.build(Uuid::new_v4(), current.flow.clone());
        let session = next.session.sign_up(email, password).await?;
        Ok((self.rotate(current, next).await, session))
    }

    /// Drops contexts that have been idle too long and returns how many went.
    /// Persisted sessions stay in the store and are restored on the next visit.
    pub fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let mut contexts = self.contexts.write().unwrap_or_else(|e| e.into_inner());
        let before = contexts.len();
        contexts.retain(|_, context| !context.is_idle(now));
        before - contexts.len()
    }

    /// Runs [`BrowserSessions::evict_idle`] every minute until the handle is aborted.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let browsers = self.clone();
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(SWEEP_EVERY);
            loop {
                ticks.tick().await;
                let evicted = browsers.evict_idle();
                if evicted > 0 {
                    info!(
                        "Evicted {evicted} idle browser contexts; {} live",
                        browsers.live()
                    );
                }
            }
        })
    }

    async fn load(&self, sid: Uuid) -> Option<Session> {
        match self.store.load(sid).await {
            Ok(Some(session)) => Some(session),
            Ok(None) => {
                debug!("No saved session for browser {sid}; minting a new id");
                None
            }
            Err(e) => {
                warn!("Could not restore session for browser {sid}: {e:#}");
                None
            }
        }
    }

    fn build(&self, sid: Uuid, flow: Arc<Mutex<AssessmentFlow>>) -> BrowserContext {
        let session = SessionClient::new(self.identity.clone());
        let store = self.store.clone();
        let persistence = session.subscribe(move |state| {
            let store = store.clone();
            async move { persist(sid, store.as_ref(), state).await }
        });
        BrowserContext {
            sid,
            session,
            flow,
            last_seen: Mutex::new(Instant::now()),
            _persistence: persistence,
        }
    }

    async fn rotate(&self, previous: &BrowserContext, next: BrowserContext) -> Arc<BrowserContext> {
        let next = Arc::new(next);
        {
            let mut contexts = self.contexts.write().unwrap_or_else(|e| e.into_inner());
            contexts.remove(&previous.sid);
            contexts.insert(next.sid, next.clone());
        }
        if let Err(e) = self.store.remove(previous.sid).await {
            warn!("Could not drop saved session for browser {}: {e:#}", previous.sid);
        }
        info!("Browser {} moved to {} on sign-in", previous.sid, next.sid);
        next
    }
}

/// Mirrors one session delivery into the store.
async fn persist(sid: Uuid, store: &dyn SessionStore, state: SessionState) {
    let outcome = match &state.user {
        Some(user) => {
            debug!("Browser {sid} signed in as uid {}", user.uid);
            store.save(sid, user).await
        }
        None => {
            debug!("Browser {sid} signed out");
            store.remove(sid).await
        }
    };
    if let Err(e) = outcome {
        warn!("Could not persist session for browser {sid}: {e:#}");
    }
}

pub fn sid_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

pub fn session_cookie(sid: Uuid) -> String {
    format!("{SESSION_COOKIE}={sid}; Path=/; HttpOnly; SameSite=Lax; Max-Age={SESSION_TTL_SECS}")
}

/// Middleware: attaches the caller's `Arc<BrowserContext>` to the request and
/// sets the cookie on the response when a new browser id was minted, unless the
/// handler already issued one.
pub async fn attach_browser(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let sid = sid_from_headers(request.headers());
    let (context, minted) = state.browsers.resolve(sid).await;
    let cookie = session_cookie(context.sid);
    request.extensions_mut().insert(context);

    let mut response = next.run(request).await;
    let already_set = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.starts_with(SESSION_COOKIE));
    if minted && !already_set {
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}
