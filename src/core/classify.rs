use crate::{
    constants::{
        EXIT_ERROR, EXIT_INVARIANT_BROKEN_NOT_PROFITABLE, EXIT_NO_INVARIANT_BROKEN, EXIT_PANIC,
        EXIT_SUCCESS,
    },
    core::domain::{Completion, Outcome, OutcomeKind, TargetRow},
};

/// Maps the tool's exit status to an outcome kind. Total over `i32`.
pub fn classify(status: i32) -> OutcomeKind {
    match status {
        EXIT_SUCCESS => OutcomeKind::Success,
        EXIT_ERROR => OutcomeKind::Error,
        EXIT_PANIC => OutcomeKind::Panic,
        EXIT_NO_INVARIANT_BROKEN => OutcomeKind::NoInvariantBroken,
        EXIT_INVARIANT_BROKEN_NOT_PROFITABLE => OutcomeKind::InvariantBrokenNotProfitable,
        other => OutcomeKind::Unknown(other),
    }
}

impl From<(TargetRow, Completion)> for Outcome {
    fn from((row, completion): (TargetRow, Completion)) -> Self {
        match completion {
            Completion::Exited {
                status,
                stdout,
                stderr,
                ..
            } => Outcome {
                row,
                kind: classify(status),
                stdout,
                stderr,
            },
            Completion::TimedOut { .. } => Outcome {
                row,
                kind: OutcomeKind::TimedOut,
                stdout: String::new(),
                stderr: String::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::Chain;

    #[test]
    fn test_known_codes() {
        assert_eq!(classify(0), OutcomeKind::Success);
        assert_eq!(classify(1), OutcomeKind::Error);
        assert_eq!(classify(134), OutcomeKind::Panic);
        assert_eq!(classify(135), OutcomeKind::NoInvariantBroken);
        assert_eq!(classify(136), OutcomeKind::InvariantBrokenNotProfitable);
    }

    #[test]
    fn test_every_other_code_is_unknown() {
        let known = [0, 1, 134, 135, 136];
        let samples = (-300..=300).chain([i32::MIN, i32::MAX, 124, 137, 143]);
        for code in samples.filter(|c| !known.contains(c)) {
            assert_eq!(classify(code), OutcomeKind::Unknown(code), "code {code}");
        }
    }

    #[test]
    fn test_timeout_dominates_exit_status() {
        let row = TargetRow {
            target: "0x1".to_string(),
            base: "0x2".to_string(),
            pair: "0x3".to_string(),
            chain: Chain::Bsc,
            block_number: 10,
        };
        let outcome: Outcome = (
            row.clone(),
            Completion::TimedOut {
                execution_time_ms: 5000,
            },
        )
            .into();
        assert_eq!(outcome.kind, OutcomeKind::TimedOut);
        assert_eq!(outcome.row, row);
    }

    #[test]
    fn test_exit_keeps_captured_text() {
        let row = TargetRow {
            target: "0x1".to_string(),
            base: "0x2".to_string(),
            pair: "0x3".to_string(),
            chain: Chain::Eth,
            block_number: 10,
        };
        let outcome: Outcome = (
            row,
            Completion::Exited {
                status: 134,
                stdout: "out".to_string(),
                stderr: "panicked at".to_string(),
                execution_time_ms: 12,
            },
        )
            .into();
        assert_eq!(outcome.kind, OutcomeKind::Panic);
        assert_eq!(outcome.stderr, "panicked at");
        assert_eq!(outcome.stdout, "out");
    }
}
