//! Per-connection authorization state.
//!
//! A session starts unauthenticated. Sending a logon moves it to
//! "login sent"; a fresh confirmation authorizes it. Authorization never
//! survives the connection: a new connection gets a new session, and a
//! closed connection resets its session.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Observable authorization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    LoginSent,
    Authorized,
}

/// Outcome of applying a logon confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginConfirmation {
    /// The session is now authorized. `first` is false for duplicates.
    Accepted { first: bool },
    /// The confirmation does not match a recent request; the pending request
    /// was cleared and a new logon should be sent.
    Stale,
}

#[derive(Debug, Default)]
struct SessionState {
    authorized: bool,
    login_requested_at: Option<Instant>,
}

/// Authorization state shared by the connection's tasks.
#[derive(Debug, Default)]
pub struct Session {
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authorized(&self) -> bool {
        self.state.lock().authorized
    }

    pub fn auth_state(&self) -> AuthState {
        let state = self.state.lock();
        if state.authorized {
            AuthState::Authorized
        } else if state.login_requested_at.is_some() {
            AuthState::LoginSent
        } else {
            AuthState::Unauthenticated
        }
    }

    pub fn login_requested_at(&self) -> Option<Instant> {
        self.state.lock().login_requested_at
    }

    /// Claim the right to send a logon.
    ///
    /// Refused when already authorized or when a logon went out less than
    /// `throttle` ago. On success the request time is recorded before the
    /// lock is released, so concurrent callers see the claim.
    pub fn try_begin_login(&self, now: Instant, throttle: Duration) -> bool {
        let mut state = self.state.lock();
        if state.authorized {
            return false;
        }
        if let Some(at) = state.login_requested_at {
            if now.saturating_duration_since(at) < throttle {
                return false;
            }
        }
        state.login_requested_at = Some(now);
        true
    }

    /// Release a claim whose logon was never enqueued.
    pub fn abort_login(&self) {
        self.state.lock().login_requested_at = None;
    }

    /// Apply a logon confirmation received at `received_at`.
    ///
    /// Accepted only if a logon was requested within `window` before the
    /// confirmation arrived. Otherwise the request marker is cleared so the
    /// caller can log in again immediately.
    pub fn confirm_login(&self, received_at: Instant, window: Duration) -> LoginConfirmation {
        let mut state = self.state.lock();
        let fresh = state
            .login_requested_at
            .is_some_and(|at| received_at.saturating_duration_since(at) <= window);

        if !fresh {
            state.login_requested_at = None;
            return LoginConfirmation::Stale;
        }

        let first = !state.authorized;
        state.authorized = true;
        LoginConfirmation::Accepted { first }
    }

    /// Forget all authorization (connection closed).
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.authorized = false;
        state.login_requested_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THROTTLE: Duration = Duration::from_secs(30);
    const WINDOW: Duration = Duration::from_secs(30);

    #[test]
    fn test_initial_state() {
        let session = Session::new();
        assert!(!session.is_authorized());
        assert_eq!(session.auth_state(), AuthState::Unauthenticated);
    }

    #[test]
    fn test_login_throttle() {
        let session = Session::new();
        let t0 = Instant::now();
        assert!(session.try_begin_login(t0, THROTTLE));
        assert_eq!(session.auth_state(), AuthState::LoginSent);

        assert!(!session.try_begin_login(t0 + Duration::from_secs(1), THROTTLE));
        assert!(!session.try_begin_login(t0 + Duration::from_secs(29), THROTTLE));
        assert!(session.try_begin_login(t0 + Duration::from_secs(31), THROTTLE));
    }

    #[test]
    fn test_no_login_when_authorized() {
        let session = Session::new();
        let t0 = Instant::now();
        assert!(session.try_begin_login(t0, THROTTLE));
        assert_eq!(
            session.confirm_login(t0 + Duration::from_millis(50), WINDOW),
            LoginConfirmation::Accepted { first: true }
        );
        assert!(!session.try_begin_login(t0 + Duration::from_secs(120), THROTTLE));
    }

    #[test]
    fn test_confirm_within_window() {
        let session = Session::new();
        let t0 = Instant::now();
        session.try_begin_login(t0, THROTTLE);
        let outcome = session.confirm_login(t0 + Duration::from_secs(2), WINDOW);
        assert_eq!(outcome, LoginConfirmation::Accepted { first: true });
        assert!(session.is_authorized());
        assert_eq!(session.auth_state(), AuthState::Authorized);
    }

    #[test]
    fn test_duplicate_confirmation() {
        let session = Session::new();
        let t0 = Instant::now();
        session.try_begin_login(t0, THROTTLE);
        session.confirm_login(t0, WINDOW);
        assert_eq!(
            session.confirm_login(t0 + Duration::from_secs(1), WINDOW),
            LoginConfirmation::Accepted { first: false }
        );
    }

    #[test]
    fn test_stale_confirmation_clears_request() {
        let session = Session::new();
        let t0 = Instant::now();
        session.try_begin_login(t0, THROTTLE);

        let outcome = session.confirm_login(t0 + Duration::from_secs(31), WINDOW);
        assert_eq!(outcome, LoginConfirmation::Stale);
        assert!(!session.is_authorized());
        assert_eq!(session.login_requested_at(), None);

        // Cleared marker means the retry is not throttled.
        assert!(session.try_begin_login(t0 + Duration::from_secs(31), THROTTLE));
    }

    #[test]
    fn test_unsolicited_confirmation_is_stale() {
        let session = Session::new();
        assert_eq!(
            session.confirm_login(Instant::now(), WINDOW),
            LoginConfirmation::Stale
        );
        assert!(!session.is_authorized());
    }

    #[test]
    fn test_abort_login() {
        let session = Session::new();
        let t0 = Instant::now();
        session.try_begin_login(t0, THROTTLE);
        session.abort_login();
        assert!(session.try_begin_login(t0, THROTTLE));
    }

    #[test]
    fn test_reset() {
        let session = Session::new();
        let t0 = Instant::now();
        session.try_begin_login(t0, THROTTLE);
        session.confirm_login(t0, WINDOW);
        session.reset();
        assert!(!session.is_authorized());
        assert_eq!(session.auth_state(), AuthState::Unauthenticated);
    }
}
