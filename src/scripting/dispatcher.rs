//! Event fan-out with bounded waits.
//!
//! Every handler invocation runs on its own worker thread; the dispatcher
//! waits up to 5 seconds for it (the inner budget) and, when the caller
//! asked to wait, up to 6 more seconds at the outer layer. A handler that
//! blows the inner budget contributes integer 0, gets a
//! `<fn> took too long to respond` warning, and is asked to terminate
//! cooperatively via the instance interrupt, so the interpreter bails at its
//! next progress check instead of leaking a thread.
//!
//! Aggregation: the result is the count of handlers that returned a nonzero
//! integer, except for `onPlayerAuth`, where the first string return is the
//! authentication verdict and short-circuits the remaining handlers.

use crossbeam_channel::bounded;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::scripting::instance::ScriptInstance;
use crate::scripting::value::{ScriptArgument, ScriptValue};

/// The sole event whose string return carries meaning.
pub const AUTH_EVENT: &str = "onPlayerAuth";

/// Wall-clock budget for one handler invocation.
pub const INNER_TIMEOUT: Duration = Duration::from_secs(5);

/// Additional budget the dispatcher grants when the caller waits.
pub const OUTER_WAIT: Duration = Duration::from_secs(6);

/// Dispatch scope: every registered instance, or only those sharing the
/// caller's plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventScope {
    Global,
    Local,
}

/// Fan one event out over the given instances (plugin-engine order).
///
/// Not re-entrant-safe against mutating the instance set during traversal;
/// callers pass a snapshot and must not load or unload plugins from inside a
/// handler.
pub fn dispatch(
    instances: &[Arc<ScriptInstance>],
    event: &str,
    scope: EventScope,
    caller_plugin: Option<&str>,
    args: &[ScriptArgument],
    wait: bool,
) -> ScriptValue {
    let mut fired = 0_i64;
    for instance in instances {
        let Some(function) = instance.get_registered(event) else {
            continue;
        };
        if scope == EventScope::Local && caller_plugin != Some(instance.plugin_name()) {
            continue;
        }
        match outer_wait_call(instance, &function, args, wait) {
            ScriptValue::Str(verdict) if event == AUTH_EVENT => {
                return ScriptValue::Str(verdict);
            }
            ScriptValue::Int(n) if n != 0 => fired += 1,
            _ => {}
        }
    }
    ScriptValue::Int(fired)
}

/// Outer layer: hand the bounded call to its own thread and wait 0 or 6
/// seconds for the result. With `wait = false` the handler still runs to
/// completion in the background, it just cannot contribute to aggregation.
fn outer_wait_call(
    instance: &Arc<ScriptInstance>,
    function: &str,
    args: &[ScriptArgument],
    wait: bool,
) -> ScriptValue {
    let (tx, rx) = bounded(1);
    let spawned = {
        let instance = Arc::clone(instance);
        let function = function.to_string();
        let args = args.to_vec();
        thread::Builder::new()
            .name(format!("event-{function}"))
            .spawn(move || {
                let _ = tx.send(bounded_call(&instance, &function, &args));
            })
    };
    if let Err(err) = spawned {
        log::error!("failed to spawn event thread for {function}: {err}");
        return ScriptValue::Int(0);
    }
    let limit = if wait { OUTER_WAIT } else { Duration::ZERO };
    rx.recv_timeout(limit).unwrap_or(ScriptValue::Int(0))
}

/// Inner layer: run the call under the instance mutex on a worker thread,
/// enforcing the 5-second budget.
fn bounded_call(
    instance: &Arc<ScriptInstance>,
    function: &str,
    args: &[ScriptArgument],
) -> ScriptValue {
    let (tx, rx) = bounded(1);
    let spawned = {
        let instance = Arc::clone(instance);
        let function = function.to_string();
        let args = args.to_vec();
        thread::Builder::new()
            .name(format!("call-{function}"))
            .spawn(move || {
                let _ = tx.send(instance.call(&function, &args));
            })
    };
    if let Err(err) = spawned {
        log::error!("failed to spawn call thread for {function}: {err}");
        return ScriptValue::Int(0);
    }
    match rx.recv_timeout(INNER_TIMEOUT) {
        Ok(result) => result,
        Err(_) => {
            log::warn!(
                "{} | {function} took too long to respond",
                instance.origin()
            );
            instance.interrupt();
            ScriptValue::Int(0)
        }
    }
}
