//! Outcome normalization for the three connect-with-data strategies.
//!
//! Each strategy is written once here against an abstract syscall closure
//! and a table of native error codes, so the branching over syscall
//! results is identical on every target and can be driven with simulated
//! codes. The platform modules only supply the real syscalls.

use super::{ConnectOutcome, FailureKind};

/// Native error codes the strategies branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCodes {
    /// Payload does not fit in the initial fast-open segment (`EMSGSIZE`).
    pub msg_size: i32,
    /// Connect started but not finished (`EINPROGRESS`).
    pub in_progress: i32,
    /// Call interrupted by a signal (`EINTR`).
    pub interrupted: i32,
    /// Overlapped operation will complete later (`ERROR_IO_PENDING`).
    pub io_pending: i32,
}

impl ErrorCodes {
    /// Codes of the host platform.
    #[cfg(unix)]
    pub const fn native() -> Self {
        Self {
            msg_size: libc::EMSGSIZE,
            in_progress: libc::EINPROGRESS,
            interrupted: libc::EINTR,
            // No overlapped I/O on Unix; never matches an errno.
            io_pending: -1,
        }
    }

    #[cfg(windows)]
    pub const fn native() -> Self {
        Self {
            msg_size: 10040,    // WSAEMSGSIZE
            in_progress: 10036, // WSAEINPROGRESS
            interrupted: 10004, // WSAEINTR
            io_pending: 997,    // ERROR_IO_PENDING
        }
    }
}

/// Raw result of a `connectx`-style call: the error (if the call failed)
/// and the byte count the kernel wrote back, which is meaningful in both cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectxResult {
    pub error: Option<i32>,
    pub sent: usize,
}

/// Immediate result of starting an overlapped connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlappedStart {
    /// The call completed synchronously with this many bytes sent.
    Completed(usize),
    /// The call failed with this code (which may be the "pending" code).
    Failed(i32),
}

/// Maps a code none of the strategy-specific branches claimed.
fn classify_common(code: i32, codes: &ErrorCodes) -> ConnectOutcome {
    if code == codes.msg_size {
        ConnectOutcome::Failed(FailureKind::PayloadTooLarge)
    } else {
        ConnectOutcome::Failed(FailureKind::Errno(code))
    }
}

fn transferred(n: usize, len: usize) -> ConnectOutcome {
    ConnectOutcome::BytesTransferred(n.min(len))
}

/// An empty payload has nothing a cookie could carry.
fn pending(len: usize) -> ConnectOutcome {
    if len == 0 {
        ConnectOutcome::BytesTransferred(0)
    } else {
        ConnectOutcome::PendingNoCookie
    }
}

/// Strategy A: one `sendto`-style call that targets the peer and carries
/// the payload with fast-open semantics.
///
/// The call is reissued while it reports `interrupted`: a signal that
/// lands before any byte moved returns the error, one that lands after a
/// partial transfer returns the partial count, which is reported as is.
pub fn send_to_outcome<F>(len: usize, codes: &ErrorCodes, mut syscall: F) -> ConnectOutcome
where
    F: FnMut() -> Result<usize, i32>,
{
    loop {
        match syscall() {
            Ok(n) => return transferred(n, len),
            Err(code) if code == codes.interrupted => continue,
            Err(code) if code == codes.in_progress => return pending(len),
            Err(code) => return classify_common(code, codes),
        }
    }
}

/// Strategy B: `connectx`-style call with a singleton destination list and
/// a gather buffer.
///
/// "In progress" is folded into the same call: the kernel has already
/// written back how much of the payload it queued, so a nonzero count is
/// reported as transferred and only a zero count means no cookie.
pub fn connectx_outcome<F>(len: usize, codes: &ErrorCodes, mut syscall: F) -> ConnectOutcome
where
    F: FnMut() -> ConnectxResult,
{
    let result = syscall();
    match result.error {
        None => transferred(result.sent, len),
        Some(code) if code == codes.in_progress => {
            if result.sent > 0 {
                transferred(result.sent, len)
            } else {
                pending(len)
            }
        }
        Some(code) => classify_common(code, codes),
    }
}

/// Strategy C: connect-with-payload reported through a caller-owned
/// completion object.
///
/// `token` is reset to its zero state before `start` runs. `wait` is only
/// invoked when `start` reports the pending code, and receives the
/// caller's blocking flag unchanged.
pub fn overlapped_outcome<T, S, W>(
    len: usize,
    codes: &ErrorCodes,
    token: &mut T,
    blocking: bool,
    start: S,
    wait: W,
) -> ConnectOutcome
where
    T: Default,
    S: FnOnce(&mut T) -> OverlappedStart,
    W: FnOnce(&mut T, bool) -> Result<usize, i32>,
{
    *token = T::default();

    match start(token) {
        OverlappedStart::Completed(n) => transferred(n, len),
        OverlappedStart::Failed(code) if code == codes.io_pending => match wait(token, blocking) {
            Ok(n) => transferred(n, len),
            Err(code) => ConnectOutcome::Failed(FailureKind::Errno(code)),
        },
        OverlappedStart::Failed(code) => ConnectOutcome::Failed(FailureKind::Errno(code)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Linux-flavoured values so the tests read the same on every host.
    const CODES: ErrorCodes = ErrorCodes {
        msg_size: 90,
        in_progress: 115,
        interrupted: 4,
        io_pending: 997,
    };
    const ECONNREFUSED: i32 = 111;

    #[test]
    fn test_send_to_too_large() {
        let outcome = send_to_outcome(4096, &CODES, || Err(CODES.msg_size));
        assert_eq!(
            outcome,
            ConnectOutcome::Failed(FailureKind::PayloadTooLarge)
        );
    }

    #[test]
    fn test_send_to_full_payload() {
        let outcome = send_to_outcome(16, &CODES, || Ok(16));
        assert_eq!(outcome, ConnectOutcome::BytesTransferred(16));
    }

    #[test]
    fn test_send_to_no_cookie() {
        let outcome = send_to_outcome(16, &CODES, || Err(CODES.in_progress));
        assert_eq!(outcome, ConnectOutcome::PendingNoCookie);
    }

    #[test]
    fn test_send_to_partial_count_reported() {
        let outcome = send_to_outcome(100, &CODES, || Ok(40));
        assert_eq!(outcome, ConnectOutcome::BytesTransferred(40));
    }

    #[test]
    fn test_send_to_retries_interrupt() {
        let mut calls = 0;
        let outcome = send_to_outcome(16, &CODES, || {
            calls += 1;
            if calls < 3 {
                Err(CODES.interrupted)
            } else {
                Ok(16)
            }
        });
        assert_eq!(calls, 3);
        assert_eq!(outcome, ConnectOutcome::BytesTransferred(16));
    }

    #[test]
    fn test_send_to_interrupt_then_no_cookie() {
        let mut calls = 0;
        let outcome = send_to_outcome(16, &CODES, || {
            calls += 1;
            if calls == 1 {
                Err(CODES.interrupted)
            } else {
                Err(CODES.in_progress)
            }
        });
        assert_eq!(outcome, ConnectOutcome::PendingNoCookie);
    }

    #[test]
    fn test_send_to_other_errno_verbatim() {
        let outcome = send_to_outcome(16, &CODES, || Err(ECONNREFUSED));
        assert_eq!(
            outcome,
            ConnectOutcome::Failed(FailureKind::Errno(ECONNREFUSED))
        );
    }

    #[test]
    fn test_count_never_exceeds_len() {
        assert_eq!(
            send_to_outcome(8, &CODES, || Ok(64)),
            ConnectOutcome::BytesTransferred(8)
        );
        let connectx = connectx_outcome(8, &CODES, || ConnectxResult {
            error: None,
            sent: 64,
        });
        assert_eq!(connectx, ConnectOutcome::BytesTransferred(8));
    }

    #[test]
    fn test_zero_length_payload() {
        assert_eq!(
            send_to_outcome(0, &CODES, || Ok(0)),
            ConnectOutcome::BytesTransferred(0)
        );
        let connectx = connectx_outcome(0, &CODES, || ConnectxResult {
            error: None,
            sent: 0,
        });
        assert_eq!(connectx, ConnectOutcome::BytesTransferred(0));
    }

    #[test]
    fn test_zero_length_payload_in_progress() {
        assert_eq!(
            send_to_outcome(0, &CODES, || Err(CODES.in_progress)),
            ConnectOutcome::BytesTransferred(0)
        );
        let connectx = connectx_outcome(0, &CODES, || ConnectxResult {
            error: Some(CODES.in_progress),
            sent: 0,
        });
        assert_eq!(connectx, ConnectOutcome::BytesTransferred(0));
    }

    #[test]
    fn test_zero_length_payload_other_errno() {
        assert_eq!(
            send_to_outcome(0, &CODES, || Err(ECONNREFUSED)),
            ConnectOutcome::Failed(FailureKind::Errno(ECONNREFUSED))
        );
    }

    #[test]
    fn test_mapping_is_stable() {
        for code in [CODES.msg_size, CODES.in_progress, ECONNREFUSED, 0, 1, 9999] {
            let first = send_to_outcome(32, &CODES, || Err(code));
            let second = send_to_outcome(32, &CODES, || Err(code));
            assert_eq!(first, second, "code {code}");
        }
    }

    #[test]
    fn test_connectx_in_progress_with_bytes() {
        // Plaintext SYN data can still go out without a cookie.
        let outcome = connectx_outcome(50, &CODES, || ConnectxResult {
            error: Some(CODES.in_progress),
            sent: 50,
        });
        assert_eq!(outcome, ConnectOutcome::BytesTransferred(50));
    }

    #[test]
    fn test_connectx_in_progress_without_bytes() {
        let outcome = connectx_outcome(50, &CODES, || ConnectxResult {
            error: Some(CODES.in_progress),
            sent: 0,
        });
        assert_eq!(outcome, ConnectOutcome::PendingNoCookie);
    }

    #[test]
    fn test_connectx_too_large() {
        let outcome = connectx_outcome(4096, &CODES, || ConnectxResult {
            error: Some(CODES.msg_size),
            sent: 0,
        });
        assert_eq!(
            outcome,
            ConnectOutcome::Failed(FailureKind::PayloadTooLarge)
        );
    }

    #[test]
    fn test_connectx_other_errno() {
        let outcome = connectx_outcome(10, &CODES, || ConnectxResult {
            error: Some(ECONNREFUSED),
            sent: 0,
        });
        assert_eq!(
            outcome,
            ConnectOutcome::Failed(FailureKind::Errno(ECONNREFUSED))
        );
    }

    #[derive(Default, Debug, PartialEq)]
    struct FakeToken {
        internal: usize,
        waited: bool,
    }

    #[test]
    fn test_overlapped_pending_then_success() {
        let mut token = FakeToken::default();
        let outcome = overlapped_outcome(
            10,
            &CODES,
            &mut token,
            true,
            |_| OverlappedStart::Failed(CODES.io_pending),
            |t, blocking| {
                assert!(blocking);
                t.waited = true;
                Ok(10)
            },
        );
        assert_eq!(outcome, ConnectOutcome::BytesTransferred(10));
        assert!(token.waited);
    }

    #[test]
    fn test_overlapped_immediate_success_skips_wait() {
        let mut token = FakeToken::default();
        let outcome = overlapped_outcome(
            16,
            &CODES,
            &mut token,
            false,
            |_| OverlappedStart::Completed(16),
            |_, _| panic!("wait must not run"),
        );
        assert_eq!(outcome, ConnectOutcome::BytesTransferred(16));
    }

    #[test]
    fn test_overlapped_wait_failure() {
        let mut token = FakeToken::default();
        let outcome = overlapped_outcome(
            16,
            &CODES,
            &mut token,
            false,
            |_| OverlappedStart::Failed(CODES.io_pending),
            |_, blocking| {
                assert!(!blocking);
                Err(10061)
            },
        );
        assert_eq!(outcome, ConnectOutcome::Failed(FailureKind::Errno(10061)));
    }

    #[test]
    fn test_overlapped_start_failure() {
        let mut token = FakeToken::default();
        let outcome = overlapped_outcome(
            16,
            &CODES,
            &mut token,
            true,
            |_| OverlappedStart::Failed(10049),
            |_, _| panic!("wait must not run"),
        );
        assert_eq!(outcome, ConnectOutcome::Failed(FailureKind::Errno(10049)));
    }

    #[test]
    fn test_overlapped_token_zeroed_before_start() {
        let mut token = FakeToken {
            internal: 0xdead,
            waited: true,
        };
        overlapped_outcome(
            4,
            &CODES,
            &mut token,
            true,
            |t| {
                assert_eq!(*t, FakeToken::default());
                t.internal = 1;
                OverlappedStart::Completed(4)
            },
            |_, _| Ok(0),
        );
        assert_eq!(token.internal, 1);
    }
}
