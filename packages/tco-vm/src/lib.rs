//! tco-vm: tail-call dispatch for continuation-passing code.
//!
//! Bodies never call their continuations directly. A continuation callback
//! returns a tail-call signal tagged with the identity of the loop that
//! created it; the dispatch loop owning that identity swaps in the new body
//! and arguments and keeps going in the same physical frame. Unbounded tail
//! recursion, and chains of continuations tail-calling each other, therefore
//! run in constant stack depth.
//!
//! # Architecture
//!
//! - **Identity tagging**: one [`LoopId`] per graph construction; owner and
//!   follow tags on every [`TailCall`]
//! - **Signals as values**: bodies return [`Bounce`], never unwind
//! - **Selective interception**: a loop claims only signals addressed to
//!   its current expectation and hands everything else back to its caller
//! - **Splicing**: a tail call into an auxiliary continuation runs that
//!   continuation's body inline, without a new loop frame

pub mod builder;
pub mod continuation;
pub mod dispatch;
pub mod error;
pub mod ids;
mod logging;
pub mod named;
pub mod signal;
pub mod value;

#[cfg(feature = "python_bridge")]
pub mod py_object;
#[cfg(feature = "python_bridge")]
pub mod pybridge;


#[doc(hidden)]
pub use log as __log;

// Re-exports for convenience
pub use builder::{make_continuation, ContinuationBuilder, EntryPoint};
pub use continuation::Callback;
pub use dispatch::{run_loop, DispatchLoop, LoopState, LoopStats, StepEvent};
pub use error::{BodyError, TcoError};
pub use ids::LoopId;
pub use named::{with_continuations, Conts, NamedContinuations};
pub use signal::{done, Body, Bounce, Outcome, TailCall};
pub use value::{Args, Value};
