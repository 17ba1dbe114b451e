use tracing::debug;

/// Backend session as seen by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    /// The authorization URL was handed out; waiting for the redirect.
    Authenticating,
    Authenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Result of `GET /auth/status`.
    StatusChecked { authenticated: bool },
    LoginStarted,
    LoginSucceeded,
    LoginFailed,
    LoggedOut,
}

impl SessionState {
    pub fn is_authenticated(self) -> bool {
        self == SessionState::Authenticated
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionState::Unauthenticated => "signed out",
            SessionState::Authenticating => "signing in…",
            SessionState::Authenticated => "signed in",
        }
    }

    /// The state after `event`, or `None` if the event does not apply here.
    pub fn next(self, event: SessionEvent) -> Option<SessionState> {
        use SessionEvent::*;
        use SessionState::*;
        match (self, event) {
            (Unauthenticated, StatusChecked { authenticated: true }) => Some(Authenticated),
            (Authenticated, StatusChecked { authenticated: false }) => Some(Unauthenticated),
            (Unauthenticated, LoginStarted) => Some(Authenticating),
            (Authenticating, LoginSucceeded) => Some(Authenticated),
            (Authenticating, LoginFailed) => Some(Unauthenticated),
            (Authenticated, LoggedOut) => Some(Unauthenticated),
            _ => None,
        }
    }

    /// Apply `event` in place.  Returns whether the state changed.
    pub fn on(&mut self, event: SessionEvent) -> bool {
        match self.next(event) {
            Some(next) => {
                debug!("[session] {:?} --{:?}--> {:?}", self, event, next);
                *self = next;
                true
            }
            None => {
                debug!("[session] {:?} ignored in {:?}", event, self);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_round_trip() {
        let mut s = SessionState::default();
        assert!(s.on(SessionEvent::LoginStarted));
        assert_eq!(s, SessionState::Authenticating);
        assert!(s.on(SessionEvent::LoginSucceeded));
        assert!(s.is_authenticated());
        assert!(s.on(SessionEvent::LoggedOut));
        assert_eq!(s, SessionState::Unauthenticated);
    }

    #[test]
    fn test_failed_login_returns_to_unauthenticated() {
        let mut s = SessionState::Authenticating;
        assert!(s.on(SessionEvent::LoginFailed));
        assert_eq!(s, SessionState::Unauthenticated);
    }

    #[test]
    fn test_status_check() {
        let mut s = SessionState::Unauthenticated;
        assert!(!s.on(SessionEvent::StatusChecked {
            authenticated: false
        }));
        assert!(s.on(SessionEvent::StatusChecked {
            authenticated: true
        }));
        assert_eq!(s, SessionState::Authenticated);
    }

    #[test]
    fn test_irrelevant_events_leave_state() {
        let mut s = SessionState::Authenticated;
        assert!(!s.on(SessionEvent::LoginSucceeded));
        assert!(!s.on(SessionEvent::LoginStarted));
        assert_eq!(s, SessionState::Authenticated);

        let mut s = SessionState::Unauthenticated;
        assert!(!s.on(SessionEvent::LoggedOut));
        assert_eq!(s, SessionState::Unauthenticated);
    }
}
