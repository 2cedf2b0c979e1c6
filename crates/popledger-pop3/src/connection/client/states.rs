//! Type-state markers for POP3 client connection states.

/// Marker type for the AUTHORIZATION state.
///
/// In this state, only authentication commands (USER/PASS, APOP, RPOP) and
/// STLS are valid.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authorization;

/// Marker type for the TRANSACTION state.
///
/// The maildrop is locked; STAT, UIDL, RETR and NOOP are valid.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transaction;

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_send<T: Send>() {}
    fn _assert_sync<T: Sync>() {}

    #[test]
    fn test_state_markers_are_send_sync() {
        _assert_send::<Authorization>();
        _assert_sync::<Authorization>();
        _assert_send::<Transaction>();
        _assert_sync::<Transaction>();
    }
}
