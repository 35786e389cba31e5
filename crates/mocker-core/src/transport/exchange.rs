//! Lifecycle of a single intercepted request.

use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Pending,
    Matched,
    Responding,
    Unmatched,
    PassedThrough,
    Failed,
    Completed,
}

/// Tracks one request through
/// `Pending → Matched → Responding → Completed` or
/// `Pending → Unmatched → PassedThrough → Completed`.
///
/// Handler failures go `Failed → Responding` or `Failed → PassedThrough`.
/// Illegal transitions are logged and ignored.
#[derive(Debug)]
pub struct Exchange {
    id: u64,
    state: ExchangeState,
}

impl Exchange {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            state: ExchangeState::Pending,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    pub fn is_completed(&self) -> bool {
        self.state == ExchangeState::Completed
    }

    /// Move to `next`; returns `false` (and keeps the state) if not allowed.
    pub fn advance(&mut self, next: ExchangeState) -> bool {
        use ExchangeState::*;

        let allowed = matches!(
            (self.state, next),
            (Pending, Matched)
                | (Pending, Unmatched)
                | (Pending, Failed)
                | (Matched, Responding)
                | (Matched, Failed)
                | (Unmatched, PassedThrough)
                | (Failed, Responding)
                | (Failed, PassedThrough)
                | (Responding, Completed)
                | (PassedThrough, Completed)
        );

        if !allowed {
            error!(
                "Request {}: ignoring illegal transition {:?} -> {:?}",
                self.id, self.state, next
            );
            return false;
        }

        self.state = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tracing_test::traced_test;
    use super::ExchangeState::*;

    #[rstest]
    #[case(&[Matched, Responding, Completed])]
    #[case(&[Unmatched, PassedThrough, Completed])]
    #[case(&[Failed, Responding, Completed])]
    #[case(&[Matched, Failed, PassedThrough, Completed])]
    fn test_legal_paths(#[case] path: &[ExchangeState]) {
        let mut exchange = Exchange::new(1);
        for state in path {
            assert!(exchange.advance(*state), "{:?} should be allowed", state);
        }
        assert!(exchange.is_completed());
    }

    #[rstest]
    #[traced_test]
    fn test_nothing_after_completed() {
        for next in [Pending, Matched, Responding, PassedThrough, Completed] {
            let mut exchange = Exchange::new(7);
            exchange.advance(Unmatched);
            exchange.advance(PassedThrough);
            exchange.advance(Completed);

            assert!(!exchange.advance(next), "{next:?} after Completed");
            assert_eq!(exchange.state(), Completed);
        }
        assert!(logs_contain("illegal transition"));
    }

    #[rstest]
    #[case(Pending, Completed)]
    #[case(Unmatched, Responding)]
    #[case(Matched, PassedThrough)]
    fn test_skipping_states_is_rejected(#[case] from: ExchangeState, #[case] to: ExchangeState) {
        let mut exchange = Exchange::new(2);
        if from != Pending {
            exchange.advance(from);
        }
        assert!(!exchange.advance(to));
        assert_eq!(exchange.state(), from);
    }
}
