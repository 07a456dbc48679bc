//! Compile-time gated debug logging for the dispatch loop.

/// Emit per-bounce trace logs only when the `dispatch_debug_logs` Cargo
/// feature is enabled.
///
/// With the feature disabled (default), this macro compiles to a no-op while
/// still type-checking format arguments, so the hot loop pays nothing.
#[macro_export]
macro_rules! tco_debug_log {
    ($($arg:tt)*) => {{
        #[cfg(feature = "dispatch_debug_logs")]
        {
            $crate::__log::trace!(target: "tco_vm::dispatch", $($arg)*);
        }
        #[cfg(not(feature = "dispatch_debug_logs"))]
        {
            let _ = format_args!($($arg)*);
        }
    }};
}
