//! Demonstration scenarios driven by the `tco` binary.

use std::fmt;
use std::hint::black_box;
use std::time::{Duration, Instant};

use tco_vm::{args, done, make_continuation, Args, EntryPoint, Outcome, TcoError, Value};

/// Stack bytes assumed per native recursion frame when deciding whether
/// the native side of `compare` can run at all.
const NATIVE_FRAME_BYTES: usize = 256;

pub fn factorial_entry() -> EntryPoint {
    make_continuation(|this, _aux| {
        move |args: Args| -> Outcome {
            args.expect_arity(2)?;
            let (n, acc) = (args.int(0)?, args.int(1)?);
            if n > 1 {
                let acc = acc
                    .checked_mul(n)
                    .ok_or_else(|| TcoError::failed(format!("factorial overflows i64 at n = {}", n)))?;
                this.call(args![n - 1, acc])
            } else {
                done(acc)
            }
        }
    })
    .build()
}

pub fn factorial(n: i64) -> Result<i64, TcoError> {
    if n < 0 {
        return Err(TcoError::failed(format!("factorial of negative number {}", n)));
    }
    let value = factorial_entry().call(args![n, 1])?;
    value
        .as_int()
        .ok_or_else(|| TcoError::type_error(0, "int", value.type_name()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParityHit {
    pub branch: String,
    pub index: i64,
    pub flag: bool,
}

impl fmt::Display for ParityHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, {})", self.branch, self.index, self.flag)
    }
}

fn reporter(branch: &'static str) -> EntryPoint {
    make_continuation(move |_this, _aux| {
        move |args: Args| -> Outcome {
            args.expect_arity(2)?;
            done(vec![
                Value::from(branch),
                args.get(0)?.clone(),
                args.get(1)?.clone(),
            ])
        }
    })
    .build()
}

/// Outer graph bound to `even`/`odd` reporters. Every call builds a fresh
/// inner graph that flips a flag `count` times and exits through whichever
/// reporter matches, so the exit signal has to cross the inner loop.
pub fn parity_entry() -> EntryPoint {
    make_continuation(|_this, aux| {
        let (k_even, k_odd) = (aux[0].clone(), aux[1].clone());
        move |args: Args| -> Outcome {
            let (k_even, k_odd) = (k_even.clone(), k_odd.clone());
            let inner = make_continuation(move |flip, _aux| {
                let (k_even, k_odd) = (k_even.clone(), k_odd.clone());
                move |args: Args| -> Outcome {
                    let (i, even) = (args.int(0)?, args.boolean(1)?);
                    if i > 0 {
                        flip.call(args![i - 1, !even])
                    } else if even {
                        k_even.call(args![i, even])
                    } else {
                        k_odd.call(args![i, even])
                    }
                }
            })
            .build();
            inner.invoke(args![args.int(0)?, true])
        }
    })
    .bind(&[reporter("even"), reporter("odd")])
}

pub fn parity(count: i64) -> Result<ParityHit, TcoError> {
    let value = parity_entry().call(args![count])?;
    let items = value
        .as_list()
        .ok_or_else(|| TcoError::type_error(0, "list", value.type_name()))?;
    let hit = Args::new(items.to_vec());
    Ok(ParityHit {
        branch: hit.str(0)?.to_string(),
        index: hit.int(1)?,
        flag: hit.boolean(2)?,
    })
}

/// Self-recursive walk that exits through an auxiliary reporting how many
/// hops it took.
pub fn chain_entry() -> EntryPoint {
    let out = make_continuation(|_this, _aux| {
        |args: Args| -> Outcome {
            args.expect_arity(1)?;
            done(args.int(0)?)
        }
    })
    .build();
    make_continuation(|this, aux| {
        let out = aux[0].clone();
        move |args: Args| -> Outcome {
            let (remaining, hops) = (args.int(0)?, args.int(1)?);
            if remaining > 0 {
                this.call(args![remaining - 1, hops + 1])
            } else {
                out.call(args![hops])
            }
        }
    })
    .bind(&[out])
}

pub fn chain(depth: i64) -> Result<i64, TcoError> {
    let value = chain_entry().call(args![depth, 0])?;
    value
        .as_int()
        .ok_or_else(|| TcoError::type_error(0, "int", value.type_name()))
}

fn sum_entry() -> EntryPoint {
    make_continuation(|this, _aux| {
        move |args: Args| -> Outcome {
            let (n, acc) = (args.int(0)?, args.int(1)?);
            if n > 0 {
                this.call(args![n - 1, acc + n])
            } else {
                done(acc)
            }
        }
    })
    .build()
}

fn native_sum(n: i64) -> i64 {
    if n > 0 {
        n + native_sum(black_box(n - 1))
    } else {
        0
    }
}

#[derive(Debug, Clone)]
pub struct Comparison {
    pub depth: i64,
    pub result: i64,
    /// `None` when native recursion would not fit in the stack.
    pub native: Option<Duration>,
    pub dispatch: Duration,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "depth:    {}", self.depth)?;
        writeln!(f, "result:   {}", self.result)?;
        match self.native {
            Some(elapsed) => writeln!(f, "native:   {:?}", elapsed)?,
            None => writeln!(f, "native:   skipped (stack too small)")?,
        }
        write!(f, "dispatch: {:?}", self.dispatch)
    }
}

pub fn native_fits(depth: i64, stack_bytes: usize) -> bool {
    usize::try_from(depth)
        .map(|depth| depth.saturating_mul(NATIVE_FRAME_BYTES) < stack_bytes / 2)
        .unwrap_or(true)
}

/// Sum `1..=depth` with native recursion (when it fits) and through the
/// dispatch loop.
pub fn compare(depth: i64, stack_bytes: usize) -> Result<Comparison, TcoError> {
    let native = if native_fits(depth, stack_bytes) {
        let start = Instant::now();
        let expected = native_sum(depth);
        Some((start.elapsed(), expected))
    } else {
        log::info!("skipping native recursion at depth {}", depth);
        None
    };

    let entry = sum_entry();
    let start = Instant::now();
    let value = entry.call(args![depth, 0])?;
    let dispatch = start.elapsed();
    let result = value
        .as_int()
        .ok_or_else(|| TcoError::type_error(0, "int", value.type_name()))?;

    if let Some((_, expected)) = native {
        if expected != result {
            return Err(TcoError::failed(format!(
                "native recursion returned {}, dispatch loop returned {}",
                expected, result
            )));
        }
    }

    Ok(Comparison {
        depth,
        result,
        native: native.map(|(elapsed, _)| elapsed),
        dispatch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factorial() {
        assert_eq!(factorial(7).unwrap(), 5040);
        assert_eq!(factorial(0).unwrap(), 1);
        assert_eq!(factorial(20).unwrap(), 2_432_902_008_176_640_000);
    }

    #[test]
    fn test_factorial_rejects_overflow_and_negatives() {
        assert!(factorial(21).unwrap_err().to_string().contains("overflows"));
        assert!(factorial(-1).is_err());
    }

    #[test]
    fn test_parity_picks_branch() {
        let even = parity(1000).unwrap();
        assert_eq!(
            even,
            ParityHit {
                branch: "even".to_string(),
                index: 0,
                flag: true,
            }
        );
        assert_eq!(even.to_string(), "even(0, true)");

        let odd = parity(1001).unwrap();
        assert_eq!(odd.branch, "odd");
        assert!(!odd.flag);
    }

    #[test]
    fn test_chain_counts_hops() {
        assert_eq!(chain(0).unwrap(), 0);
        assert_eq!(chain(100_000).unwrap(), 100_000);
    }

    #[test]
    fn test_compare_agrees_with_native() {
        let cmp = compare(1_000, 8 * 1024 * 1024).unwrap();
        assert_eq!(cmp.result, 500_500);
        assert!(cmp.native.is_some());
    }

    #[test]
    fn test_compare_skips_native_on_small_stack() {
        assert!(!native_fits(1_000_000, 256 * 1024));
        let cmp = compare(1_000_000, 256 * 1024).unwrap();
        assert!(cmp.native.is_none());
        assert_eq!(cmp.result, 500_000_500_000);
        assert!(cmp.to_string().contains("skipped"));
    }
}
