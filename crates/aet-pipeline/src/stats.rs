use aet_schemas::ErrorKind;
use serde::Serialize;
use std::fmt;

/// Per-process counters. Reset on start, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub processed: u64,
    pub successful: u64,
    pub failed: u64,
    pub duplicates: u64,
}

impl RunStats {
    pub(crate) fn record_success(&mut self) {
        self.processed += 1;
        self.successful += 1;
    }

    /// Duplicates count as failed as well.
    pub(crate) fn record_failure(&mut self, kind: ErrorKind) {
        self.processed += 1;
        self.failed += 1;
        if kind == ErrorKind::DuplicateError {
            self.duplicates += 1;
        }
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed={} successful={} failed={} duplicates={}",
            self.processed, self.successful, self.failed, self.duplicates
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_also_count_as_failed() {
        let mut s = RunStats::default();
        s.record_success();
        s.record_failure(ErrorKind::DuplicateError);
        s.record_failure(ErrorKind::ApiError);
        assert_eq!(
            s,
            RunStats {
                processed: 3,
                successful: 1,
                failed: 2,
                duplicates: 1
            }
        );
        assert_eq!(s.to_string(), "processed=3 successful=1 failed=2 duplicates=1");
    }
}
