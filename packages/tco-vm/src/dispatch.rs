//! The dispatch loop: one physical frame that keeps resuming whatever body
//! the last claimed signal pointed at.
//!
//! # State machine
//!
//! - `Running`: evaluate `current(args)`.
//! - `Caught`: the body bounced with a signal whose owner matches the
//!   expected owner; adopt its target, arguments and follow tag.
//! - `Returned`: the body produced an ordinary value (terminal).
//! - `Escaped`: the signal belongs to an enclosing loop and is handed back
//!   unchanged to the caller (terminal).
//! - `Failed`: the body failed; the error propagates untouched (terminal).

use std::sync::Arc;

use crate::error::TcoError;
use crate::ids::LoopId;
use crate::signal::{Body, Bounce, Outcome, TailCall};
use crate::tco_debug_log;
use crate::value::{Args, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Caught,
    Returned,
    Escaped,
    Failed,
}

impl LoopState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LoopState::Returned | LoopState::Escaped | LoopState::Failed
        )
    }
}

/// Counters for one run of a loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Body evaluations.
    pub steps: u64,
    /// Claimed signals that kept the same expected owner.
    pub self_calls: u64,
    /// Claimed signals that spliced another continuation into this frame.
    pub switches: u64,
}

#[derive(Debug)]
pub enum StepEvent {
    Continue,
    Done(Value),
    Escaped(TailCall),
    Error(TcoError),
}

impl StepEvent {
    pub fn is_continue(&self) -> bool {
        matches!(self, StepEvent::Continue)
    }

    pub fn is_done(&self) -> bool {
        matches!(self, StepEvent::Done(_))
    }
}

/// Run `body` as loop `id` until it returns, fails, or releases a signal
/// owned by some enclosing loop.
pub fn run_loop(id: LoopId, body: Arc<Body>, args: Args) -> Outcome {
    DispatchLoop::new(id, body, args).run()
}

pub struct DispatchLoop {
    id: LoopId,
    current: Arc<Body>,
    args: Args,
    expected: LoopId,
    state: LoopState,
    stats: LoopStats,
}

impl DispatchLoop {
    pub(crate) fn new(id: LoopId, body: Arc<Body>, args: Args) -> Self {
        DispatchLoop {
            id,
            current: body,
            args,
            expected: id,
            state: LoopState::Running,
            stats: LoopStats::default(),
        }
    }

    pub fn id(&self) -> LoopId {
        self.id
    }

    /// Identity currently allowed to deliver a signal to this frame.
    pub fn expected_owner(&self) -> LoopId {
        self.expected
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Run the current body once and route its result.
    pub fn step(&mut self) -> StepEvent {
        if self.state.is_terminal() {
            return StepEvent::Error(TcoError::failed(format!(
                "dispatch {} already terminated ({:?})",
                self.id, self.state
            )));
        }
        self.state = LoopState::Running;
        self.stats.steps += 1;

        let args = std::mem::take(&mut self.args);
        let outcome = (self.current)(args);
        match outcome {
            Ok(Bounce::Done(value)) => {
                self.state = LoopState::Returned;
                StepEvent::Done(value)
            }
            Ok(Bounce::Jump(signal)) if signal.owner == self.expected => {
                tco_debug_log!(
                    "{} caught signal owner={} follow={} args={}",
                    self.id,
                    signal.owner,
                    signal.follow,
                    signal.args.len()
                );
                if signal.follow == self.expected {
                    self.stats.self_calls += 1;
                } else {
                    self.stats.switches += 1;
                }
                self.state = LoopState::Caught;
                self.current = signal.target;
                self.args = signal.args;
                self.expected = signal.follow;
                StepEvent::Continue
            }
            Ok(Bounce::Jump(signal)) => {
                tco_debug_log!(
                    "{} passing signal owner={} upward (expecting {})",
                    self.id,
                    signal.owner,
                    self.expected
                );
                self.state = LoopState::Escaped;
                StepEvent::Escaped(signal)
            }
            Err(err) => {
                self.state = LoopState::Failed;
                StepEvent::Error(err)
            }
        }
    }

    /// Drive the loop to a terminal state.
    ///
    /// An escaped signal comes back as `Ok(Bounce::Jump(..))` so that an
    /// enclosing body can return it and let its own loop claim it.
    pub fn run(mut self) -> Outcome {
        loop {
            match self.step() {
                StepEvent::Continue => continue,
                StepEvent::Done(value) => {
                    log::debug!(
                        "{} returned after {} steps ({} self calls, {} switches)",
                        self.id,
                        self.stats.steps,
                        self.stats.self_calls,
                        self.stats.switches
                    );
                    return Ok(Bounce::Done(value));
                }
                StepEvent::Escaped(signal) => {
                    log::debug!(
                        "{} released signal owned by {} after {} steps",
                        self.id,
                        signal.owner,
                        self.stats.steps
                    );
                    return Ok(Bounce::Jump(signal));
                }
                StepEvent::Error(err) => return Err(err),
            }
        }
    }
}

impl std::fmt::Debug for DispatchLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchLoop")
            .field("id", &self.id)
            .field("expected", &self.expected)
            .field("state", &self.state)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
