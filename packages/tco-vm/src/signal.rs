//! The control-transfer signal and the discriminated result bodies return.
//!
//! A body never calls its continuation directly. It returns
//! [`Bounce::Jump`] carrying a [`TailCall`], and the dispatch loop that owns
//! the signal resumes the target in its own frame.

use std::fmt;
use std::sync::Arc;

use crate::error::TcoError;
use crate::ids::LoopId;
use crate::value::{Args, Value};

/// A continuation body: runs one step and either finishes or bounces.
pub type Body = dyn Fn(Args) -> Outcome + Send + Sync;

/// What a body (or a callback) produces.
pub type Outcome = Result<Bounce, TcoError>;

/// Pending call "jump to `target` with `args`", routed by identity.
///
/// `owner` is the loop whose construction created the invoked callback;
/// only a frame currently expecting `owner` may consume the signal.
/// `follow` is the identity of the invoked continuation and becomes the
/// consuming frame's new expectation.
#[derive(Clone)]
pub struct TailCall {
    pub(crate) target: Arc<Body>,
    pub args: Args,
    pub owner: LoopId,
    pub follow: LoopId,
}

impl TailCall {
    pub(crate) fn new(target: Arc<Body>, args: Args, owner: LoopId, follow: LoopId) -> Self {
        TailCall {
            target,
            args,
            owner,
            follow,
        }
    }

    /// A self-call keeps the loop's expectation unchanged.
    pub fn is_self_call(&self) -> bool {
        self.owner == self.follow
    }
}

impl fmt::Debug for TailCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TailCall")
            .field("owner", &self.owner)
            .field("follow", &self.follow)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum Bounce {
    /// Final value of the computation.
    Done(Value),
    /// Tail call still waiting for a frame to claim it.
    Jump(TailCall),
}

impl Bounce {
    pub fn done(value: impl Into<Value>) -> Self {
        Bounce::Done(value.into())
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Bounce::Done(_))
    }

    pub fn is_jump(&self) -> bool {
        matches!(self, Bounce::Jump(_))
    }

    /// Resolve at the top of a run: a signal nobody claimed is misrouted.
    pub fn into_value(self) -> Result<Value, TcoError> {
        match self {
            Bounce::Done(value) => Ok(value),
            Bounce::Jump(signal) => Err(TcoError::misrouted(signal.owner, signal.follow)),
        }
    }
}

/// Finish a body with an ordinary (non-tail) value.
pub fn done(value: impl Into<Value>) -> Outcome {
    Ok(Bounce::done(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;

    fn noop_body() -> Arc<Body> {
        Arc::new(|_args: Args| done(()))
    }

    #[test]
    fn test_done_resolves_to_value() {
        let bounce = done(42).unwrap();
        assert!(bounce.is_done());
        assert_eq!(bounce.into_value().unwrap(), Value::Int(42));
    }

    #[test]
    fn test_unclaimed_jump_is_misrouted() {
        let owner = LoopId::fresh();
        let follow = LoopId::fresh();
        let bounce = Bounce::Jump(TailCall::new(noop_body(), args![1], owner, follow));
        assert!(bounce.is_jump());
        match bounce.into_value() {
            Err(TcoError::MisroutedSignal { owner: o, follow: f }) => {
                assert_eq!(o, owner);
                assert_eq!(f, follow);
            }
            other => panic!("expected misrouted signal, got {:?}", other),
        }
    }

    #[test]
    fn test_self_call_detection() {
        let id = LoopId::fresh();
        let call = TailCall::new(noop_body(), args![], id, id);
        assert!(call.is_self_call());
        let call = TailCall::new(noop_body(), args![], id, LoopId::fresh());
        assert!(!call.is_self_call());
    }
}
