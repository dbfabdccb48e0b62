//! Strategy for targets with no connect-with-data mechanism.

use super::{ConnectOutcome, ConnectRequest, FailureKind, FastOpenConnect};

/// Fails every request with [`FailureKind::Unsupported`] and never touches
/// the socket. No emulation through a plain connect is attempted.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedConnector;

impl FastOpenConnect for UnsupportedConnector {
    fn attempt(&self, _request: ConnectRequest<'_>) -> ConnectOutcome {
        ConnectOutcome::Failed(FailureKind::Unsupported)
    }
}
