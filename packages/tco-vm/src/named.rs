//! Continuations addressed by name instead of position.
//!
//! A [`NamedContinuations`] table is resolved once, when the graph is built;
//! bodies then look their callbacks up through [`Conts`].

use std::sync::Arc;

use crate::builder::{make_continuation, EntryPoint};
use crate::continuation::Callback;
use crate::error::TcoError;
use crate::signal::Outcome;
use crate::value::Args;

/// Ordered name → continuation table.
#[derive(Debug, Clone, Default)]
pub struct NamedContinuations {
    entries: Vec<(String, EntryPoint)>,
}

impl NamedContinuations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, entry: EntryPoint) -> Self {
        self.insert(name, entry);
        self
    }

    /// Add a continuation; an existing entry with the same name is replaced
    /// in place.
    pub fn insert(&mut self, name: impl Into<String>, entry: EntryPoint) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = entry,
            None => self.entries.push((name, entry)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&EntryPoint> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, entry)| entry)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Callbacks available to a named-continuation body.
#[derive(Debug)]
pub struct Conts {
    this: Callback,
    names: Arc<[String]>,
    callbacks: Vec<Callback>,
}

impl Conts {
    /// The self callback.
    pub fn this(&self) -> &Callback {
        &self.this
    }

    pub fn get(&self, name: &str) -> Result<&Callback, TcoError> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| &self.callbacks[idx])
            .ok_or_else(|| TcoError::unknown_continuation(name))
    }
}

/// Build a graph whose body receives its continuations by name.
///
/// ```
/// use tco_vm::{args, done, make_continuation, with_continuations, Args, NamedContinuations, Outcome};
///
/// let identity = make_continuation(|_this, _aux| {
///     |args: Args| -> Outcome { done(args.get(0)?.clone()) }
/// })
/// .build();
/// let factorial = with_continuations(
///     &NamedContinuations::new().with("out", identity),
///     |args, k| {
///         let (n, acc) = (args.int(0)?, args.int(1)?);
///         if n > 1 {
///             k.this().call(args![n - 1, acc * n])
///         } else {
///             k.get("out")?.call(args![acc])
///         }
///     },
/// );
/// assert_eq!(factorial.call(args![5, 1]).unwrap().as_int(), Some(120));
/// ```
pub fn with_continuations<F>(config: &NamedContinuations, body: F) -> EntryPoint
where
    F: Fn(Args, &Conts) -> Outcome + Send + Sync + 'static,
{
    let names: Arc<[String]> = config.names().map(String::from).collect();
    let auxiliaries: Vec<EntryPoint> = config.entries.iter().map(|(_, e)| e.clone()).collect();
    let body = Arc::new(body);
    make_continuation(move |this, callbacks| {
        let conts = Conts {
            this,
            names: Arc::clone(&names),
            callbacks,
        };
        let body = Arc::clone(&body);
        move |args: Args| body(args, &conts)
    })
    .bind(&auxiliaries)
}
