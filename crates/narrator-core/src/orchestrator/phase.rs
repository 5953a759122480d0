use std::fmt;

/// Per-document run state machine.
///
/// `Init -> Splitting -> [Resuming] -> Dispatching -> Assembling -> Done`;
/// `Failed` is absorbing and reachable from `Dispatching` or `Assembling`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Init,
    Splitting,
    Resuming,
    Dispatching,
    Assembling,
    Done,
    Failed,
}

impl RunPhase {
    pub fn can_advance_to(self, next: RunPhase) -> bool {
        use RunPhase::*;
        matches!(
            (self, next),
            (Init, Splitting)
                | (Splitting, Resuming)
                | (Splitting, Dispatching)
                | (Resuming, Dispatching)
                | (Dispatching, Assembling)
                | (Dispatching, Failed)
                | (Assembling, Done)
                | (Assembling, Failed)
        )
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunPhase::Init => "init",
            RunPhase::Splitting => "splitting",
            RunPhase::Resuming => "resuming",
            RunPhase::Dispatching => "dispatching",
            RunPhase::Assembling => "assembling",
            RunPhase::Done => "done",
            RunPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Logs every transition of one document's run.
pub(super) struct PhaseTracker {
    document: String,
    current: RunPhase,
}

impl PhaseTracker {
    pub(super) fn new(document: impl Into<String>) -> Self {
        let document = document.into();
        tracing::info!(document = %document, phase = %RunPhase::Init, "run started");
        Self {
            document,
            current: RunPhase::Init,
        }
    }

    pub(super) fn current(&self) -> RunPhase {
        self.current
    }

    pub(super) fn advance(&mut self, next: RunPhase) {
        debug_assert!(
            self.current.can_advance_to(next),
            "illegal transition {} -> {}",
            self.current,
            next
        );
        tracing::info!(document = %self.document, from = %self.current, to = %next, "phase change");
        self.current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_are_allowed() {
        use RunPhase::*;
        let path = [Init, Splitting, Resuming, Dispatching, Assembling, Done];
        for w in path.windows(2) {
            assert!(w[0].can_advance_to(w[1]), "{} -> {}", w[0], w[1]);
        }
        assert!(Splitting.can_advance_to(Dispatching));
    }

    #[test]
    fn failed_is_absorbing_and_only_from_dispatch_or_assembly() {
        use RunPhase::*;
        assert!(Dispatching.can_advance_to(Failed));
        assert!(Assembling.can_advance_to(Failed));
        assert!(!Splitting.can_advance_to(Failed));
        for next in [Init, Splitting, Resuming, Dispatching, Assembling, Done] {
            assert!(!Failed.can_advance_to(next));
        }
        assert!(!Done.can_advance_to(Failed));
    }
}
