//! Deep continuation chains must run in bounded stack space.
//!
//! Each scenario runs on a thread with a deliberately small stack; native
//! recursion to the same depth would overflow it.

use std::thread;

use tco_vm::{args, done, make_continuation, Args, EntryPoint, Outcome, TcoError, Value};

const SMALL_STACK: usize = 256 * 1024;

fn on_small_stack<T, F>(f: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    thread::Builder::new()
        .name("small-stack".into())
        .stack_size(SMALL_STACK)
        .spawn(f)
        .unwrap()
        .join()
        .unwrap()
}

fn countdown() -> EntryPoint {
    make_continuation(|this, _aux| {
        move |args: Args| -> Outcome {
            let n = args.int(0)?;
            if n > 0 {
                this.call(args![n - 1])
            } else {
                done("bottom")
            }
        }
    })
    .build()
}

/// `ping` and `pong` bounce a counter between two graphs; `pong` is built
/// inside `ping` so it can hold ping's self callback.
fn ping_pong() -> EntryPoint {
    make_continuation(|ping, _aux| {
        let back = ping.clone();
        let pong = make_continuation(move |_this, _aux| {
            let back = back.clone();
            move |args: Args| -> Outcome { back.call(args![args.int(0)? - 1]) }
        })
        .build();
        move |args: Args| -> Outcome {
            let n = args.int(0)?;
            if n > 0 {
                pong.invoke(args![n - 1])
            } else {
                done(n)
            }
        }
    })
    .build()
}

#[test]
fn test_million_self_calls() {
    let result = on_small_stack(|| countdown().call(args![1_000_000]));
    assert_eq!(result.unwrap().as_str(), Some("bottom"));
}

#[test]
fn test_million_mutual_calls() {
    let result = on_small_stack(|| ping_pong().call(args![1_000_000]));
    assert_eq!(result.unwrap(), Value::Int(0));
}

#[test]
fn test_long_chain_into_recursive_auxiliary() {
    let result = on_small_stack(|| {
        let sum = make_continuation(|this, _aux| {
            move |args: Args| -> Outcome {
                let (n, acc) = (args.int(0)?, args.int(1)?);
                if n > 0 {
                    this.call(args![n - 1, acc + n])
                } else {
                    done(acc)
                }
            }
        })
        .build();
        let chain = make_continuation(|this, aux| {
            let sum = aux[0].clone();
            move |args: Args| -> Outcome {
                let (n, total) = (args.int(0)?, args.int(1)?);
                if n > 0 {
                    this.call(args![n - 1, total])
                } else {
                    sum.call(args![total, 0])
                }
            }
        })
        .bind(&[sum]);
        chain.call(args![100_000, 100_000])
    });
    assert_eq!(result.unwrap().as_int(), Some(100_000 * 100_001 / 2));
}

#[test]
fn test_deep_failure_surfaces_without_overflow() {
    let result = on_small_stack(|| {
        make_continuation(|this, _aux| {
            move |args: Args| -> Outcome {
                let n = args.int(0)?;
                if n > 0 {
                    this.call(args![n - 1])
                } else {
                    Err(TcoError::failed("bottom reached"))
                }
            }
        })
        .build()
        .call(args![500_000])
    });
    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "bottom reached");
}
