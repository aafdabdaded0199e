use crate::dashboard::views::DashboardView;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UpdateState {
    Idle,
    Recomputing { token: u64 },
    Error { message: String },
}

/// Issued when a recompute starts. Later tokens supersede earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct RequestToken(pub u64);

#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    Applied(Arc<DashboardView>),
    /// The fit failed; `previous` is the view still on display.
    Failed {
        message: String,
        previous: Option<Arc<DashboardView>>,
    },
    /// A newer request started before this one finished; its result was dropped.
    Superseded { latest: RequestToken },
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    #[serde(flatten)]
    pub state: UpdateState,
    pub latest_token: u64,
    pub last_error: Option<String>,
    pub view: Option<Arc<DashboardView>>,
}

#[derive(Debug)]
struct Inner {
    latest_token: u64,
    state: UpdateState,
    current: Option<Arc<DashboardView>>,
    last_error: Option<String>,
}

/// Idle -> Recomputing -> Idle | Error. The displayed view only changes on a
/// successful, non-superseded recompute.
#[derive(Debug)]
pub struct DashboardSession {
    inner: Mutex<Inner>,
}

impl Default for DashboardSession {
    fn default() -> Self {
        Self::new(None)
    }
}

impl DashboardSession {
    pub fn new(initial: Option<DashboardView>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                latest_token: 0,
                state: UpdateState::Idle,
                current: initial.map(Arc::new),
                last_error: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn begin(&self) -> RequestToken {
        let mut inner = self.lock();
        inner.latest_token += 1;
        let token = inner.latest_token;
        inner.state = UpdateState::Recomputing { token };
        RequestToken(token)
    }

    pub fn complete(
        &self,
        token: RequestToken,
        result: anyhow::Result<DashboardView>,
    ) -> UpdateOutcome {
        let mut inner = self.lock();
        if token.0 != inner.latest_token {
            tracing::debug!(
                token = token.0,
                latest = inner.latest_token,
                "discarding superseded recompute"
            );
            return UpdateOutcome::Superseded {
                latest: RequestToken(inner.latest_token),
            };
        }

        match result {
            Ok(view) => {
                let view = Arc::new(view);
                inner.current = Some(Arc::clone(&view));
                inner.state = UpdateState::Idle;
                inner.last_error = None;
                UpdateOutcome::Applied(view)
            }
            Err(err) => {
                let message = format!("{err:#}");
                inner.state = UpdateState::Error {
                    message: message.clone(),
                };
                inner.last_error = Some(message.clone());
                UpdateOutcome::Failed {
                    message,
                    previous: inner.current.clone(),
                }
            }
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.lock();
        SessionSnapshot {
            state: inner.state.clone(),
            latest_token: inner.latest_token,
            last_error: inner.last_error.clone(),
            view: inner.current.clone(),
        }
    }

    pub fn current(&self) -> Option<Arc<DashboardView>> {
        self.lock().current.clone()
    }
}
