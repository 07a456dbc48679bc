//! Continuation handles and the callbacks handed to user bodies.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::builder::EntryPoint;
use crate::error::TcoError;
use crate::ids::LoopId;
use crate::signal::{Body, Bounce, Outcome, TailCall};
use crate::value::Args;

/// A built continuation: its identity, the body it runs, and the
/// auxiliary graphs it was bound to.
///
/// Owned by the [`EntryPoint`] that created it. The auxiliaries are kept
/// alive here because callbacks only hold weak references.
pub(crate) struct Handle {
    pub(crate) id: LoopId,
    pub(crate) body: Arc<Body>,
    pub(crate) auxiliaries: Vec<EntryPoint>,
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id)
            .field("auxiliaries", &self.auxiliaries.len())
            .finish_non_exhaustive()
    }
}

/// The continuation a body calls in tail position.
///
/// Calling it never runs the target: it produces a [`TailCall`] addressed to
/// the loop that was being built when this callback was created.
#[derive(Clone)]
pub struct Callback {
    target: Weak<Handle>,
    target_id: LoopId,
    owner: LoopId,
}

impl Callback {
    pub(crate) fn new(target: Weak<Handle>, target_id: LoopId, owner: LoopId) -> Self {
        Callback {
            target,
            target_id,
            owner,
        }
    }

    /// Identity of the continuation this callback jumps to.
    pub fn id(&self) -> LoopId {
        self.target_id
    }

    /// Identity of the loop entitled to intercept calls to this callback.
    pub fn owner(&self) -> LoopId {
        self.owner
    }

    pub fn call(&self, args: Args) -> Outcome {
        let handle = self
            .target
            .upgrade()
            .ok_or_else(|| TcoError::released_continuation(self.target_id))?;
        Ok(Bounce::Jump(TailCall::new(
            Arc::clone(&handle.body),
            args,
            self.owner,
            self.target_id,
        )))
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("target", &self.target_id)
            .field("owner", &self.owner)
            .finish()
    }
}
