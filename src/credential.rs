/// Shared authentication state for a session: the current bearer token plus
/// the bookkeeping the refresh state machine needs.
///
/// Owned by the dispatcher and mutated only under its serialization point;
/// `retry_count` is monotonically non-decreasing while `refresh_in_progress`
/// stays true and resets only when a refresh succeeds.
#[derive(Clone, Debug)]
pub struct Credential {
    token: Option<String>,
    refresh_in_progress: bool,
    retry_count: u32,
}

impl Credential {
    /// A credential with no token yet; the first dispatch will trigger a refresh.
    pub fn anonymous() -> Self {
        Self {
            token: None,
            refresh_in_progress: false,
            retry_count: 0,
        }
    }

    pub fn with_token(value: impl Into<String>) -> Self {
        Self {
            token: Some(value.into()),
            refresh_in_progress: false,
            retry_count: 0,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn refresh_in_progress(&self) -> bool {
        self.refresh_in_progress
    }

    pub fn set_refresh_in_progress(&mut self, refreshing: bool) {
        self.refresh_in_progress = refreshing;
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Counts a refresh attempt against the budget. Any attempt counts,
    /// whether triggered by a missing token or a 401.
    pub fn record_attempt(&mut self) {
        self.retry_count += 1;
    }

    /// Installs a freshly acquired token: clears the in-progress flag and
    /// resets the retry budget.
    pub fn install_token(&mut self, value: impl Into<String>) {
        self.token = Some(value.into());
        self.refresh_in_progress = false;
        self.retry_count = 0;
    }

    /// Explicit external reset, the only recovery path after exhaustion.
    pub fn reset_retries(&mut self) {
        self.retry_count = 0;
    }
}
