//! Continuation graph construction.
//!
//! A factory receives the self callback plus one callback per auxiliary
//! continuation and returns the body that the graph's loop will execute.
//! All callbacks created during one construction carry that construction's
//! [`LoopId`] as their owner.

use std::convert::Infallible;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::continuation::{Callback, Handle};
use crate::dispatch::{run_loop, DispatchLoop};
use crate::error::TcoError;
use crate::ids::LoopId;
use crate::signal::{Body, Outcome};
use crate::value::{Args, Value};

type Factory = dyn Fn(Callback, Vec<Callback>) -> Arc<Body> + Send + Sync;

/// Build one graph: allocate its identity, create its callbacks and ask
/// `factory` for the body.
///
/// The handle is created with `Arc::new_cyclic`, so the self callback can
/// point at the handle it belongs to before the body exists.
pub(crate) fn assemble<E>(
    auxiliaries: &[EntryPoint],
    factory: impl FnOnce(Callback, Vec<Callback>) -> Result<Arc<Body>, E>,
) -> Result<EntryPoint, E> {
    let id = LoopId::fresh();
    let mut failure = None;
    let handle = Arc::new_cyclic(|this: &Weak<Handle>| {
        let self_k = Callback::new(this.clone(), id, id);
        let aux_k = auxiliaries
            .iter()
            .map(|aux| Callback::new(Arc::downgrade(&aux.handle), aux.id(), id))
            .collect();
        let body = match factory(self_k, aux_k) {
            Ok(body) => body,
            Err(err) => {
                failure = Some(err);
                unbuilt_body()
            }
        };
        Handle {
            id,
            body,
            auxiliaries: auxiliaries.to_vec(),
        }
    });
    if let Some(err) = failure {
        return Err(err);
    }
    log::debug!(
        "built continuation {} with {} auxiliaries",
        id,
        auxiliaries.len()
    );
    Ok(EntryPoint { handle })
}

fn unbuilt_body() -> Arc<Body> {
    Arc::new(|_args: Args| -> Outcome { Err(TcoError::failed("continuation factory failed")) })
}

/// Wrap a body factory into a reusable graph builder.
///
/// ```
/// use tco_vm::{args, done, make_continuation, Args, Outcome};
///
/// let factorial = make_continuation(|this, _aux| {
///     move |args: Args| -> Outcome {
///         let n = args.int(0)?;
///         let acc = args.int(1)?;
///         if n > 1 {
///             this.call(tco_vm::args![n - 1, acc * n])
///         } else {
///             done(acc)
///         }
///     }
/// })
/// .build();
///
/// assert_eq!(factorial.call(args![7, 1]).unwrap().as_int(), Some(5040));
/// ```
pub fn make_continuation<F, B>(factory: F) -> ContinuationBuilder
where
    F: Fn(Callback, Vec<Callback>) -> B + Send + Sync + 'static,
    B: Fn(Args) -> Outcome + Send + Sync + 'static,
{
    ContinuationBuilder {
        factory: Arc::new(move |this: Callback, aux: Vec<Callback>| {
            Arc::new(factory(this, aux)) as Arc<Body>
        }),
    }
}

#[derive(Clone)]
pub struct ContinuationBuilder {
    factory: Arc<Factory>,
}

impl ContinuationBuilder {
    /// Bind auxiliary continuations, in the order the factory expects them.
    ///
    /// Every call creates an independent graph with a fresh identity.
    pub fn bind(&self, auxiliaries: &[EntryPoint]) -> EntryPoint {
        let factory = Arc::clone(&self.factory);
        match assemble(auxiliaries, move |this, aux| {
            Ok::<_, Infallible>(factory(this, aux))
        }) {
            Ok(entry) => entry,
            Err(never) => match never {},
        }
    }

    pub fn build(&self) -> EntryPoint {
        self.bind(&[])
    }
}

impl fmt::Debug for ContinuationBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContinuationBuilder").finish_non_exhaustive()
    }
}

/// Invocable entry point of a built graph.
#[derive(Clone)]
pub struct EntryPoint {
    pub(crate) handle: Arc<Handle>,
}

impl EntryPoint {
    pub fn id(&self) -> LoopId {
        self.handle.id
    }

    /// Number of auxiliary continuations this graph was bound to.
    pub fn auxiliary_count(&self) -> usize {
        self.handle.auxiliaries.len()
    }

    /// Create a loop for step-wise driving.
    pub fn start(&self, args: Args) -> DispatchLoop {
        DispatchLoop::new(self.handle.id, Arc::clone(&self.handle.body), args)
    }

    /// Run to completion, handing unclaimed signals back to the caller.
    ///
    /// Use this when the graph runs inside another graph's body in tail
    /// position: a signal owned by the enclosing loop is returned as
    /// `Bounce::Jump` and the enclosing loop claims it.
    pub fn invoke(&self, args: Args) -> Outcome {
        run_loop(self.handle.id, Arc::clone(&self.handle.body), args)
    }

    /// Run to completion at the top of a computation.
    pub fn call(&self, args: Args) -> Result<Value, TcoError> {
        self.invoke(args)?.into_value()
    }
}

impl fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPoint")
            .field("id", &self.handle.id)
            .field("auxiliaries", &self.handle.auxiliaries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::signal::{done, Bounce};

    #[test]
    fn test_callbacks_share_owner_identity() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let out = make_continuation(|_this, _aux| |args: Args| -> Outcome { done(args.int(0)?) })
            .build();

        let record = Arc::clone(&seen);
        let entry = make_continuation(move |this, aux| {
            let mut seen = record.lock().unwrap();
            seen.push((this.owner(), this.id()));
            for k in &aux {
                seen.push((k.owner(), k.id()));
            }
            |_args: Args| done(())
        })
        .bind(&[out.clone()]);

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![(entry.id(), entry.id()), (entry.id(), out.id())]
        );
        assert_eq!(entry.auxiliary_count(), 1);
    }

    #[test]
    fn test_rebinding_creates_fresh_graph() {
        let builder = make_continuation(|_this, _aux| |_args: Args| done(1));
        let a = builder.build();
        let b = builder.build();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.call(args![]).unwrap(), b.call(args![]).unwrap());
    }

    #[test]
    fn test_failed_factory_reports_error() {
        let result = assemble(&[], |_this, _aux| Err::<Arc<Body>, _>("no body"));
        assert_eq!(result.unwrap_err(), "no body");
    }

    #[test]
    fn test_invoke_passes_foreign_signal_upward() {
        let leaked = Arc::new(std::sync::Mutex::new(None));
        let sink = Arc::clone(&leaked);
        let _origin = make_continuation(move |this, _aux| {
            *sink.lock().unwrap() = Some(this);
            |_args: Args| done(())
        })
        .build();
        let foreign: Callback = leaked.lock().unwrap().clone().unwrap();

        let runner = make_continuation(move |_this, _aux| {
            let foreign = foreign.clone();
            move |args: Args| foreign.call(args)
        })
        .build();

        match runner.invoke(args![9]).unwrap() {
            Bounce::Jump(signal) => assert_eq!(signal.args, args![9]),
            Bounce::Done(v) => panic!("foreign signal was swallowed: {:?}", v),
        }
        assert!(runner.call(args![9]).unwrap_err().is_misrouted());
    }
}
