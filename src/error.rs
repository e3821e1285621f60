use std::path::PathBuf;

/// Errors that can occur while loading the branch-exit tree and its
/// instrumentation metadata.
///
/// The instrumentation hook (`Runtime::pen`) is infallible by construction;
/// it never produces one of these. Numeric pathologies (NaN, Inf, division
/// by zero) are absorbed locally by the predicate library and the scheduler,
/// never surfaced here.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path:?} is malformed: expected `brCount argCount`, got {reason}")]
    MalformedMeta { path: PathBuf, reason: String },

    #[error("{path:?} is malformed at entry {index}: {reason}")]
    MalformedEdges {
        path: PathBuf,
        index: usize,
        reason: String,
    },

    #[error("2 * brCount ({got}) exceeds MAXN ({max})")]
    TooManyExits { got: i64, max: i64 },

    #[error("edge {0} participates in a parent cycle")]
    Cycle(i32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_are_distinguishable_and_display_their_context() {
        let err = RuntimeError::TooManyExits { got: 250_000, max: 100_000 };
        assert!(matches!(err, RuntimeError::TooManyExits { .. }));
        assert!(err.to_string().contains("250000"));

        let err = RuntimeError::Cycle(7);
        assert!(matches!(err, RuntimeError::Cycle(7)));
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn io_error_exposes_its_source() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = RuntimeError::Io { path: PathBuf::from("output/edges.txt"), source };
        assert!(std::error::Error::source(&err).is_some());
    }
}
