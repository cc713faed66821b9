//! In-memory stand-in for the betting service, served over real HTTP.
//!
//! Semantics follow the service: one session per customer, one (highest)
//! stake per customer per offer, leaderboards sorted by stake and capped at
//! [LEADERBOARD_CAPACITY]. Tests can script expiries and canned responses.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use highstakes_types::{LEADERBOARD_CAPACITY, SESSION_KEY_PARAM};
use std::{
    collections::{HashMap, HashSet},
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

/// One stake request as seen by the mock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StakeRequest {
    pub bet_offer: u32,
    pub session_key: String,
    pub body: String,
    pub status: u16,
}

#[derive(Default)]
pub struct MockState {
    customer_sessions: Mutex<HashMap<u32, String>>,
    session_customers: Mutex<HashMap<String, u32>>,
    stakes: Mutex<HashMap<u32, HashMap<u32, u64>>>,
    next_key: AtomicUsize,
    session_requests: AtomicUsize,
    stake_requests: Mutex<Vec<StakeRequest>>,
    expire_on: Mutex<HashSet<usize>>,
    unauthorized_on: Mutex<HashSet<usize>>,
    session_status: Mutex<Option<StatusCode>>,
    stake_status: Mutex<Option<StatusCode>>,
    high_stakes_response: Mutex<Option<(StatusCode, String)>>,
}

impl MockState {
    /// Expire the caller's session just before handling the `index`-th
    /// (zero-based) stake request, which then answers 401.
    pub fn expire_on_stake(&self, index: usize) {
        self.expire_on.lock().unwrap().insert(index);
    }

    /// Answer 401 to the `index`-th stake request while leaving the session
    /// valid.
    pub fn unauthorized_on_stake(&self, index: usize) {
        self.unauthorized_on.lock().unwrap().insert(index);
    }

    pub fn fail_sessions(&self, status: StatusCode) {
        *self.session_status.lock().unwrap() = Some(status);
    }

    pub fn fail_stakes(&self, status: StatusCode) {
        *self.stake_status.lock().unwrap() = Some(status);
    }

    pub fn set_high_stakes(&self, status: StatusCode, body: impl Into<String>) {
        *self.high_stakes_response.lock().unwrap() = Some((status, body.into()));
    }

    pub fn session_requests(&self) -> usize {
        self.session_requests.load(Ordering::SeqCst)
    }

    pub fn stake_requests(&self) -> Vec<StakeRequest> {
        self.stake_requests.lock().unwrap().clone()
    }

    fn session_for(&self, customer: u32) -> String {
        let mut sessions = self.customer_sessions.lock().unwrap();
        if let Some(key) = sessions.get(&customer) {
            return key.clone();
        }
        let key = format!("key{:08x}", self.next_key.fetch_add(1, Ordering::SeqCst));
        sessions.insert(customer, key.clone());
        self.session_customers
            .lock()
            .unwrap()
            .insert(key.clone(), customer);
        key
    }

    fn expire(&self, key: &str) {
        if let Some(customer) = self.session_customers.lock().unwrap().remove(key) {
            self.customer_sessions.lock().unwrap().remove(&customer);
        }
    }

    fn customer_for(&self, key: &str) -> Option<u32> {
        self.session_customers.lock().unwrap().get(key).copied()
    }

    fn leaderboard(&self, bet_offer: u32) -> String {
        let stakes = self.stakes.lock().unwrap();
        let Some(offer) = stakes.get(&bet_offer) else {
            return String::new();
        };
        let mut entries: Vec<_> = offer.iter().map(|(c, s)| (*c, *s)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
            .into_iter()
            .take(LEADERBOARD_CAPACITY)
            .map(|(customer, stake)| format!("{customer}={stake}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

async fn session(State(state): State<Arc<MockState>>, Path(customer): Path<u32>) -> Response {
    state.session_requests.fetch_add(1, Ordering::SeqCst);
    if let Some(status) = *state.session_status.lock().unwrap() {
        return status.into_response();
    }
    (StatusCode::OK, state.session_for(customer)).into_response()
}

async fn stake(
    State(state): State<Arc<MockState>>,
    Path(bet_offer): Path<u32>,
    Query(params): Query<HashMap<String, String>>,
    body: String,
) -> Response {
    let session_key = params.get(SESSION_KEY_PARAM).cloned().unwrap_or_default();
    let index = state.stake_requests.lock().unwrap().len();

    let status = if let Some(status) = *state.stake_status.lock().unwrap() {
        status
    } else if state.unauthorized_on.lock().unwrap().remove(&index) {
        StatusCode::UNAUTHORIZED
    } else if state.expire_on.lock().unwrap().remove(&index) {
        state.expire(&session_key);
        StatusCode::UNAUTHORIZED
    } else {
        match (state.customer_for(&session_key), body.parse::<u64>()) {
            (None, _) => StatusCode::UNAUTHORIZED,
            (Some(_), Err(_)) => StatusCode::BAD_REQUEST,
            (Some(customer), Ok(amount)) => {
                let mut stakes = state.stakes.lock().unwrap();
                let best = stakes
                    .entry(bet_offer)
                    .or_default()
                    .entry(customer)
                    .or_insert(amount);
                *best = (*best).max(amount);
                StatusCode::OK
            }
        }
    };

    state.stake_requests.lock().unwrap().push(StakeRequest {
        bet_offer,
        session_key,
        body,
        status: status.as_u16(),
    });
    status.into_response()
}

async fn high_stakes(State(state): State<Arc<MockState>>, Path(bet_offer): Path<u32>) -> Response {
    if let Some((status, body)) = state.high_stakes_response.lock().unwrap().clone() {
        return (status, body).into_response();
    }
    (StatusCode::OK, state.leaderboard(bet_offer)).into_response()
}

pub fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/:id/session", get(session))
        .route("/:id/stake", post(stake))
        .route("/:id/highstakes", get(high_stakes))
        .with_state(state)
}

/// A running mock; the server stops when this is dropped.
pub struct MockService {
    pub base_url: String,
    pub state: Arc<MockState>,
    handle: tokio::task::JoinHandle<()>,
}

impl MockService {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        let actual_addr = listener.local_addr().unwrap();
        let base_url = format!("http://{actual_addr}");

        let app = router(state.clone());
        let handle = tokio::spawn(async move {
            axum::serve(listener, app.into_make_service()).await.unwrap();
        });

        Self {
            base_url,
            state,
            handle,
        }
    }
}

impl Drop for MockService {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
