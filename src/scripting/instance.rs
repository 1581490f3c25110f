//! One isolated script interpreter plus its lifecycle metadata.
//!
//! A [`ScriptInstance`] owns a `rhai::Engine`, a persistent `Scope`, and the
//! accumulated AST of everything the instance has executed. The three live
//! behind one `parking_lot::Mutex`; every path that runs script code holds
//! that mutex for the full duration of the call, so strictly one script
//! frame executes at a time per instance regardless of how many threads are
//! knocking.
//!
//! Error isolation: script failures (syntax, runtime, termination) are
//! logged with the instance's source-file basename (or `_Console` for the
//! interactive console instance) and never escape into the host. Panics
//! raised inside the interpreter or a host binding are caught at the call
//! boundary and logged with a `Thread in <source-file>` origin.

use parking_lot::Mutex;
use rhai::{CallFnOptions, Dynamic, Engine, EvalAltResult, Scope, AST};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::context::ServerContext;
use crate::logging;
use crate::scripting::api;
use crate::scripting::value::{self, ScriptArgument, ScriptValue};

/// Interpreter state guarded by the per-instance mutex.
struct Interpreter {
    engine: Engine,
    scope: Scope<'static>,
    /// Merged AST of the source file and any functions defined through
    /// `execute`. `None` until the first successful compile.
    ast: Option<AST>,
}

/// One plugin script (or the interactive console) and everything it owns.
pub struct ScriptInstance {
    plugin_name: String,
    source_path: PathBuf,
    is_console: bool,
    last_modified: Mutex<Option<SystemTime>>,
    /// event name -> script function name; latest registration wins
    registered: Mutex<HashMap<String, String>>,
    /// cooperative cancellation channel read by background workers
    stop_flag: AtomicBool,
    /// cooperative termination of the currently-executing frame
    interrupt: AtomicBool,
    interp: Mutex<Interpreter>,
}

impl ScriptInstance {
    /// Create a plugin instance: open the standard library, install the host
    /// API, execute the source file, and fire `onInit`.
    pub fn new(
        plugin_name: impl Into<String>,
        source_path: impl Into<PathBuf>,
        ctx: &Arc<ServerContext>,
    ) -> Arc<Self> {
        let instance = Self::bare(plugin_name.into(), source_path.into(), false);
        instance.install(ctx);
        instance.reload();
        instance
    }

    /// Create the interactive console instance. It has no source file and is
    /// excluded from broadcast dispatch, but the host API works identically.
    pub fn console(ctx: &Arc<ServerContext>) -> Arc<Self> {
        let instance = Self::bare(String::new(), PathBuf::new(), true);
        instance.install(ctx);
        instance
    }

    fn bare(plugin_name: String, source_path: PathBuf, is_console: bool) -> Arc<Self> {
        Arc::new(Self {
            plugin_name,
            source_path,
            is_console,
            last_modified: Mutex::new(None),
            registered: Mutex::new(HashMap::new()),
            stop_flag: AtomicBool::new(false),
            interrupt: AtomicBool::new(false),
            interp: Mutex::new(Interpreter {
                engine: Engine::new(),
                scope: Scope::new(),
                ast: None,
            }),
        })
    }

    /// Wire the interrupt hook and the host API into the engine. Host
    /// functions capture a `Weak` back-pointer to this instance, so the
    /// caller of any API function is known without a registry search.
    fn install(self: &Arc<Self>, ctx: &Arc<ServerContext>) {
        let mut interp = self.interp.lock();
        let hook = Arc::downgrade(self);
        interp.engine.on_progress(move |_ops| match hook.upgrade() {
            Some(instance) if instance.interrupt.load(Ordering::Relaxed) => Some(Dynamic::UNIT),
            _ => None,
        });
        api::install(&mut interp.engine, Arc::downgrade(self), ctx);
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn is_console(&self) -> bool {
        self.is_console
    }

    /// Prefix used for everything this instance logs.
    pub fn origin(&self) -> String {
        if self.is_console {
            return "_Console".to_string();
        }
        self.source_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "_Console".to_string())
    }

    // --- event registration table -------------------------------------

    pub fn register_event(&self, event: impl Into<String>, function: impl Into<String>) {
        self.registered.lock().insert(event.into(), function.into());
    }

    pub fn unregister_event(&self, event: &str) {
        self.registered.lock().remove(event);
    }

    pub fn is_registered(&self, event: &str) -> bool {
        self.registered.lock().contains_key(event)
    }

    pub fn get_registered(&self, event: &str) -> Option<String> {
        self.registered.lock().get(event).cloned()
    }

    // --- cancellation channels ----------------------------------------

    pub fn set_stop_thread(&self, stop: bool) {
        self.stop_flag.store(stop, Ordering::SeqCst);
    }

    pub fn get_stop_thread(&self) -> bool {
        self.stop_flag.load(Ordering::SeqCst)
    }

    /// Ask the currently-executing frame to terminate at its next progress
    /// check (or inside `Sleep`). Cleared when the next frame starts.
    pub fn interrupt(&self) {
        self.interrupt.store(true, Ordering::Relaxed);
    }

    pub(crate) fn interrupted(&self) -> bool {
        self.interrupt.load(Ordering::Relaxed)
    }

    // --- hot reload bookkeeping ---------------------------------------

    pub fn last_modified(&self) -> Option<SystemTime> {
        *self.last_modified.lock()
    }

    /// True when the source file's mtime is newer than the recorded one.
    pub fn source_modified(&self) -> bool {
        if self.is_console {
            return false;
        }
        let current = std::fs::metadata(&self.source_path)
            .and_then(|meta| meta.modified())
            .ok();
        match (current, self.last_modified()) {
            (Some(now), Some(recorded)) => now > recorded,
            (Some(_), None) => true,
            _ => false,
        }
    }

    fn touch_last_modified(&self) {
        *self.last_modified.lock() = std::fs::metadata(&self.source_path)
            .and_then(|meta| meta.modified())
            .ok();
    }

    // --- script execution ---------------------------------------------

    /// Evaluate a one-shot expression or statement from the console.
    ///
    /// Errors are logged with the `_Console |` prefix and do not propagate.
    /// Variables persist in the scope across calls, and functions defined at
    /// the prompt are merged into the instance AST so later events can call
    /// them.
    pub fn execute(&self, command: &str) {
        let mut interp = self.interp.lock();
        self.interrupt.store(false, Ordering::Relaxed);
        let Interpreter { engine, scope, ast } = &mut *interp;
        let compiled = match engine.compile(command) {
            Ok(compiled) => compiled,
            Err(err) => {
                log::warn!("_Console | {err}");
                return;
            }
        };
        if let Err(err) = engine.eval_ast_with_scope::<Dynamic>(scope, &compiled) {
            log::warn!("_Console | {err}");
        }
        match ast {
            Some(existing) => {
                existing.combine(compiled);
            }
            None => *ast = Some(compiled),
        }
    }

    /// Re-execute the source file; on success invoke `onInit` with no
    /// arguments. Failures are logged, never propagated.
    pub fn reload(&self) {
        let source = match std::fs::read_to_string(&self.source_path) {
            Ok(source) => source,
            Err(err) => {
                log::warn!("{} | {err}", self.origin());
                return;
            }
        };
        self.touch_last_modified();
        let ok = {
            let mut interp = self.interp.lock();
            self.interrupt.store(false, Ordering::Relaxed);
            let Interpreter { engine, scope, ast } = &mut *interp;
            match engine.compile(&source) {
                Err(err) => {
                    log::warn!("{} | {err}", self.origin());
                    false
                }
                Ok(compiled) => {
                    let ran = engine.eval_ast_with_scope::<Dynamic>(scope, &compiled);
                    // keep whatever functions the file defined even if a
                    // top-level statement failed part-way
                    *ast = Some(compiled);
                    match ran {
                        Ok(_) => true,
                        Err(err) => {
                            log::warn!("{} | {err}", self.origin());
                            false
                        }
                    }
                }
            }
        };
        if ok {
            self.call("onInit", &[]);
        }
    }

    /// Call a named script function with the given arguments and one
    /// expected return.
    ///
    /// If the name is not a defined function the result is integer 0 with no
    /// logging. Script errors are logged with this instance's origin prefix;
    /// a panic inside the interpreter is caught and logged as coming from
    /// `Thread in <source-file>`. The host never observes an `Err`.
    pub fn call(&self, function: &str, args: &[ScriptArgument]) -> ScriptValue {
        let mut interp = self.interp.lock();
        self.interrupt.store(false, Ordering::Relaxed);
        let Interpreter { engine, scope, ast } = &mut *interp;
        let Some(ast) = ast.as_ref() else {
            return ScriptValue::Int(0);
        };
        if !ast.iter_functions().any(|meta| meta.name == function) {
            return ScriptValue::Int(0);
        }
        let call_args: Vec<Dynamic> = args.iter().map(value::to_dynamic).collect();
        let options = CallFnOptions::new().eval_ast(false).rewind_scope(true);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            engine.call_fn_with_options::<Dynamic>(options, scope, ast, function, call_args)
        }));
        match outcome {
            Ok(Ok(ret)) => value::marshal_return(ret),
            Ok(Err(err)) => {
                if matches!(*err, EvalAltResult::ErrorTerminated(..)) {
                    log::debug!("{} | {function} terminated after timeout", self.origin());
                } else {
                    log::warn!("{} | {err}", self.origin());
                }
                ScriptValue::Int(0)
            }
            Err(_) => {
                logging::except(&format!("Thread in {}", self.origin()));
                ScriptValue::Int(0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RecordingTransport;
    use std::io::Write;
    use std::time::{Duration, Instant};

    fn test_ctx() -> Arc<ServerContext> {
        ServerContext::new(Arc::new(RecordingTransport::new()))
    }

    fn write_plugin(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).expect("create plugin file");
        file.write_all(body.as_bytes()).expect("write plugin file");
        path
    }

    #[test]
    fn call_returns_marshalled_value() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_plugin(&dir, "math.rhai", "fn add(a, b) { a + b }");
        let instance = ScriptInstance::new("math", path, &test_ctx());
        let result = instance.call(
            "add",
            &[ScriptArgument::Int(2), ScriptArgument::Int(3)],
        );
        assert_eq!(result, ScriptValue::Int(5));
    }

    #[test]
    fn call_on_missing_function_is_silent_zero() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_plugin(&dir, "empty.rhai", "let unused = 1;");
        let instance = ScriptInstance::new("empty", path, &test_ctx());
        assert_eq!(instance.call("nope", &[]), ScriptValue::Int(0));
    }

    #[test]
    fn registration_latest_wins() {
        let ctx = test_ctx();
        let instance = ScriptInstance::console(&ctx);
        instance.register_event("onPlayerJoin", "first");
        instance.register_event("onPlayerJoin", "second");
        assert!(instance.is_registered("onPlayerJoin"));
        assert_eq!(
            instance.get_registered("onPlayerJoin").as_deref(),
            Some("second")
        );
        instance.unregister_event("onPlayerJoin");
        assert!(!instance.is_registered("onPlayerJoin"));
    }

    #[test]
    fn execute_keeps_scope_and_functions() {
        let ctx = test_ctx();
        let instance = ScriptInstance::console(&ctx);
        instance.execute("let x = 41;");
        instance.execute("x += 1; print(x);");
        assert_eq!(ctx.console.drain(), vec!["42\n".to_string()]);
        instance.execute("fn twice(n) { n * 2 }");
        assert_eq!(
            instance.call("twice", &[ScriptArgument::Int(21)]),
            ScriptValue::Int(42)
        );
    }

    #[test]
    fn execute_errors_do_not_poison_the_instance() {
        let ctx = test_ctx();
        let instance = ScriptInstance::console(&ctx);
        instance.execute("this is not a program");
        instance.execute("print(\"still alive\");");
        assert_eq!(ctx.console.drain(), vec!["still alive\n".to_string()]);
    }

    #[test]
    fn reload_fires_on_init() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_plugin(
            &dir,
            "greeter.rhai",
            "fn onInit() { print(\"ready\"); }\nRegisterEvent(\"onInit\", \"onInit\");",
        );
        let ctx = test_ctx();
        let instance = ScriptInstance::new("greeter", path, &ctx);
        assert!(instance.is_registered("onInit"));
        assert_eq!(ctx.console.drain(), vec!["ready\n".to_string()]);
    }

    #[test]
    fn frames_are_serialized_per_instance() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_plugin(&dir, "hold.rhai", "fn hold() { Sleep(120); 1 }");
        let instance = ScriptInstance::new("hold", path, &test_ctx());
        let started = Instant::now();
        let a = {
            let instance = Arc::clone(&instance);
            std::thread::spawn(move || instance.call("hold", &[]))
        };
        let b = {
            let instance = Arc::clone(&instance);
            std::thread::spawn(move || instance.call("hold", &[]))
        };
        assert_eq!(a.join().expect("join"), ScriptValue::Int(1));
        assert_eq!(b.join().expect("join"), ScriptValue::Int(1));
        // two 120 ms frames on one instance cannot overlap
        assert!(started.elapsed() >= Duration::from_millis(240));
    }

    #[test]
    fn stop_flag_round_trips() {
        let instance = ScriptInstance::console(&test_ctx());
        assert!(!instance.get_stop_thread());
        instance.set_stop_thread(true);
        assert!(instance.get_stop_thread());
    }
}
