//! Device session state machine

use btaps_core::{BtapsError, BtapsResult};

/// Device session state
///
/// # State Transitions
/// ```text
/// Disconnected -> Connecting   (connect())
/// Connecting   -> Syncing      (channel opened)
/// Syncing      -> Ready        (initial state fetch succeeded)
/// any          -> Disconnected (disconnect(), link closed, failed connect)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No channel open; cache is empty (initial state)
    #[default]
    Disconnected,
    /// Discovering and opening the channel
    Connecting,
    /// Channel open, fetching the initial device state
    ///
    /// Only the state fetch exchange may run in this state.
    Syncing,
    /// Cache populated, commands accepted
    Ready,
}

impl SessionState {
    /// Check if the session accepts commands
    pub fn is_ready(&self) -> bool {
        matches!(self, SessionState::Ready)
    }

    /// Check if a channel is (being) held open
    pub fn is_connected(&self) -> bool {
        !matches!(self, SessionState::Disconnected)
    }

    /// Validate state transition
    ///
    /// # Returns
    /// `Ok(())` if transition is valid, `Err` otherwise
    pub fn validate_transition(&self, new_state: SessionState) -> BtapsResult<()> {
        let valid = match (*self, new_state) {
            (SessionState::Disconnected, SessionState::Connecting) => true,
            (SessionState::Connecting, SessionState::Syncing) => true,
            (SessionState::Syncing, SessionState::Ready) => true,
            // disconnect, link loss and failed connects
            (_, SessionState::Disconnected) => true,
            _ => false,
        };

        if valid {
            Ok(())
        } else {
            Err(BtapsError::InvalidState(format!(
                "Invalid state transition: {:?} -> {:?}",
                self, new_state
            )))
        }
    }

    /// Get human-readable state name
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Disconnected => "Disconnected",
            SessionState::Connecting => "Connecting",
            SessionState::Syncing => "Syncing",
            SessionState::Ready => "Ready",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_path() {
        assert!(SessionState::Disconnected.validate_transition(SessionState::Connecting).is_ok());
        assert!(SessionState::Connecting.validate_transition(SessionState::Syncing).is_ok());
        assert!(SessionState::Syncing.validate_transition(SessionState::Ready).is_ok());
    }

    #[test]
    fn test_any_state_can_disconnect() {
        for state in [
            SessionState::Disconnected,
            SessionState::Connecting,
            SessionState::Syncing,
            SessionState::Ready,
        ] {
            assert!(state.validate_transition(SessionState::Disconnected).is_ok());
        }
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(SessionState::Disconnected.validate_transition(SessionState::Ready).is_err());
        assert!(SessionState::Ready.validate_transition(SessionState::Connecting).is_err());
        assert!(SessionState::Connecting.validate_transition(SessionState::Ready).is_err());
    }

    #[test]
    fn test_flags() {
        assert!(SessionState::Ready.is_ready());
        assert!(!SessionState::Syncing.is_ready());
        assert!(SessionState::Syncing.is_connected());
        assert!(!SessionState::Disconnected.is_connected());
        assert_eq!(SessionState::default().as_str(), "Disconnected");
    }
}
