//! Error types for the dispatch loop.

use crate::ids::LoopId;

/// Failure raised by user code inside a body.
pub type BodyError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug)]
pub enum TcoError {
    /// A tail-call signal reached the top of a run without any enclosing
    /// loop claiming it: the callback escaped the loop that created it.
    MisroutedSignal {
        owner: LoopId,
        follow: LoopId,
    },
    /// A callback was invoked after the graph owning its target was dropped.
    ReleasedContinuation {
        id: LoopId,
    },
    UnknownContinuation {
        name: String,
    },
    Arity {
        expected: usize,
        got: usize,
    },
    Type {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },
    Body(BodyError),
}

impl std::fmt::Display for TcoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TcoError::MisroutedSignal { owner, follow } => {
                write!(
                    f,
                    "misrouted tail call: signal owned by {} (targeting {}) was not claimed by any enclosing loop",
                    owner, follow
                )
            }
            TcoError::ReleasedContinuation { id } => {
                write!(f, "continuation {} was released before it was called", id)
            }
            TcoError::UnknownContinuation { name } => {
                write!(f, "no continuation named '{}'", name)
            }
            TcoError::Arity { expected, got } => {
                write!(f, "arity mismatch: expected {} arguments, got {}", expected, got)
            }
            TcoError::Type {
                index,
                expected,
                found,
            } => write!(
                f,
                "type error: argument {} should be {}, found {}",
                index, expected, found
            ),
            TcoError::Body(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for TcoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TcoError::Body(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl TcoError {
    pub fn misrouted(owner: LoopId, follow: LoopId) -> Self {
        TcoError::MisroutedSignal { owner, follow }
    }

    pub fn released_continuation(id: LoopId) -> Self {
        TcoError::ReleasedContinuation { id }
    }

    pub fn unknown_continuation(name: impl Into<String>) -> Self {
        TcoError::UnknownContinuation { name: name.into() }
    }

    pub fn arity(expected: usize, got: usize) -> Self {
        TcoError::Arity { expected, got }
    }

    pub fn type_error(index: usize, expected: &'static str, found: &'static str) -> Self {
        TcoError::Type {
            index,
            expected,
            found,
        }
    }

    /// Wrap any user error so it travels through the loop unchanged.
    pub fn body(err: impl Into<BodyError>) -> Self {
        TcoError::Body(err.into())
    }

    /// Body failure carrying only a message.
    pub fn failed(message: impl Into<String>) -> Self {
        let message: String = message.into();
        TcoError::Body(message.into())
    }

    pub fn is_misrouted(&self) -> bool {
        matches!(self, TcoError::MisroutedSignal { .. })
    }

    pub fn is_arity(&self) -> bool {
        matches!(self, TcoError::Arity { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_display() {
        let err = TcoError::misrouted(LoopId::from_raw(3), LoopId::from_raw(4));
        assert!(err.to_string().contains("misrouted tail call"));
        assert!(err.to_string().contains("loop#3"));

        let err = TcoError::arity(2, 3);
        assert_eq!(err.to_string(), "arity mismatch: expected 2 arguments, got 3");

        let err = TcoError::failed("boom");
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_body_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = TcoError::body(io);
        let source = err.source().expect("body errors expose their source");
        assert!(source.downcast_ref::<std::io::Error>().is_some());
        assert!(TcoError::arity(1, 0).source().is_none());
    }
}
