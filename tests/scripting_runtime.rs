//! End-to-end tests of the plugin runtime: discovery, event dispatch,
//! aggregation, the authentication short-circuit, timeout bounds, and
//! background tasks, all driven through real script files on disk.

use convoy::context::ServerContext;
use convoy::scripting::{EventScope, ScriptArgument, ScriptValue};
use convoy::transport::RecordingTransport;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Lay out a plugins directory: one (plugin, file, body) triple per script.
fn plugins_dir(scripts: &[(&str, &str, &str)]) -> TempDir {
    let root = tempfile::tempdir().expect("tempdir");
    for (plugin, file, body) in scripts {
        let dir = root.path().join(plugin);
        if !dir.exists() {
            std::fs::create_dir(&dir).expect("plugin dir");
        }
        let mut handle = std::fs::File::create(dir.join(file)).expect("script file");
        handle.write_all(body.as_bytes()).expect("script body");
    }
    root
}

fn load(root: &Path) -> (Arc<ServerContext>, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::new());
    let ctx = ServerContext::new(transport.clone());
    ctx.plugins.load_plugins(root, &ctx).expect("load plugins");
    (ctx, transport)
}

#[test]
fn event_reaches_handler_with_exact_arguments() {
    let root = plugins_dir(&[(
        "greeter",
        "main.rhai",
        r#"
            RegisterEvent("onPlayerJoin", "greet");
            fn greet(id, name) {
                print(id);
                print(name);
                1
            }
        "#,
    )]);
    let (ctx, _transport) = load(root.path());
    let result = ctx.plugins.dispatch(
        "onPlayerJoin",
        &[ScriptArgument::Int(42), ScriptArgument::Str("alice".into())],
        true,
    );
    assert_eq!(result, ScriptValue::Int(1));
    assert_eq!(
        ctx.console.drain(),
        vec!["42\n".to_string(), "alice\n".to_string()]
    );
}

#[test]
fn aggregation_counts_nonzero_integer_returns() {
    let returns = [1, 0, 1, 1, 0];
    let bodies: Vec<String> = returns
        .iter()
        .map(|ret| {
            format!(
                "RegisterEvent(\"onTick\", \"handle\");\nfn handle(n) {{ {ret} }}"
            )
        })
        .collect();
    let scripts: Vec<(&str, &str, &str)> = bodies
        .iter()
        .enumerate()
        .map(|(i, body)| {
            let name: &str = ["p1", "p2", "p3", "p4", "p5"][i];
            (name, "main.rhai", body.as_str())
        })
        .collect();
    let root = plugins_dir(&scripts);
    let (ctx, _transport) = load(root.path());
    assert_eq!(ctx.plugins.len(), 5);
    let result = ctx
        .plugins
        .dispatch("onTick", &[ScriptArgument::Int(7)], true);
    assert_eq!(result, ScriptValue::Int(3));
}

#[test]
fn auth_string_short_circuits_later_handlers() {
    let root = plugins_dir(&[
        (
            "aa_banlist",
            "main.rhai",
            r#"
                RegisterEvent("onPlayerAuth", "auth");
                fn auth(name) { "banned" }
            "#,
        ),
        (
            "bb_greeter",
            "main.rhai",
            r#"
                RegisterEvent("onPlayerAuth", "auth");
                fn auth(name) {
                    SendChatMessage(-1, "should never run");
                    0
                }
            "#,
        ),
    ]);
    let (ctx, transport) = load(root.path());
    let verdict = ctx
        .plugins
        .dispatch("onPlayerAuth", &[ScriptArgument::Str("mallory".into())], true);
    assert_eq!(verdict, ScriptValue::Str("banned".to_string()));
    // the second instance never ran
    assert!(transport.take().is_empty());
}

#[test]
fn auth_string_is_ignored_for_other_events() {
    let root = plugins_dir(&[(
        "oracle",
        "main.rhai",
        r#"
            RegisterEvent("onWeather", "forecast");
            fn forecast() { "rain" }
        "#,
    )]);
    let (ctx, _transport) = load(root.path());
    let result = ctx.plugins.dispatch("onWeather", &[], true);
    // a string from a non-auth event contributes nothing
    assert_eq!(result, ScriptValue::Int(0));
}

#[test]
fn local_scope_only_reaches_the_callers_plugin() {
    let root = plugins_dir(&[
        (
            "home",
            "main.rhai",
            r#"
                RegisterEvent("onSignal", "seen");
                fn seen() { print("home"); 1 }
            "#,
        ),
        (
            "away",
            "main.rhai",
            r#"
                RegisterEvent("onSignal", "seen");
                fn seen() { print("away"); 1 }
            "#,
        ),
    ]);
    let (ctx, _transport) = load(root.path());
    let result =
        ctx.plugins
            .dispatch_from("onSignal", EventScope::Local, Some("home"), &[], true);
    assert_eq!(result, ScriptValue::Int(1));
    assert_eq!(ctx.console.drain(), vec!["home\n".to_string()]);
}

#[test]
fn fire_and_forget_dispatch_returns_within_budget() {
    let root = plugins_dir(&[(
        "sleeper",
        "main.rhai",
        r#"
            RegisterEvent("onSlow", "slow");
            fn slow() { Sleep(10000); 1 }
        "#,
    )]);
    let (ctx, _transport) = load(root.path());
    let started = Instant::now();
    let result = ctx.plugins.dispatch("onSlow", &[], false);
    // the handler still runs in the background, but contributes nothing
    assert_eq!(result, ScriptValue::Int(0));
    assert!(started.elapsed() < Duration::from_millis(5500));
}

#[test]
fn overlong_handler_times_out_and_contributes_zero() {
    let root = plugins_dir(&[(
        "sleeper",
        "main.rhai",
        r#"
            RegisterEvent("onSlow", "slow");
            fn slow() { Sleep(6500); 1 }
        "#,
    )]);
    let (ctx, _transport) = load(root.path());
    let started = Instant::now();
    let result = ctx.plugins.dispatch("onSlow", &[], true);
    let elapsed = started.elapsed();
    assert_eq!(result, ScriptValue::Int(0));
    // the 5 s inner budget bounds the wait even though the caller asked
    // for up to 6 more seconds
    assert!(elapsed >= Duration::from_millis(4900), "returned too early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(5600), "returned too late: {elapsed:?}");
}

#[test]
fn background_task_ticks_and_stops_cooperatively() {
    let root = plugins_dir(&[(
        "pulse",
        "main.rhai",
        r#"
            fn onInit() { CreateThread("beat", 200); }
            fn beat() { print("b"); }
        "#,
    )]);
    let (ctx, _transport) = load(root.path());
    std::thread::sleep(Duration::from_millis(100));
    let ticks = ctx.console.drain().len();
    // 200 Hz over 100 ms; generous bounds to survive a loaded machine
    assert!(ticks >= 8, "expected a steady beat, got {ticks} ticks");
    assert!(ticks <= 40, "beat too fast: {ticks} ticks");

    let instance = &ctx.plugins.snapshot()[0];
    instance.set_stop_thread(true);
    std::thread::sleep(Duration::from_millis(30));
    ctx.console.drain();
    std::thread::sleep(Duration::from_millis(100));
    assert!(
        ctx.console.drain().is_empty(),
        "task kept ticking after StopThread"
    );
}

#[test]
fn scripts_can_trigger_events_across_plugins() {
    let root = plugins_dir(&[
        (
            // sorts before the emitter so the handler is registered by the
            // time the emitter's onInit fires
            "alpha_listener",
            "main.rhai",
            r#"
                RegisterEvent("onPing", "pong");
                fn pong(tag) { print("pong:" + tag); 1 }
            "#,
        ),
        (
            "beta_emitter",
            "main.rhai",
            r#"
                fn onInit() { TriggerGlobalEvent("onPing", "boot"); }
            "#,
        ),
    ]);
    let (ctx, _transport) = load(root.path());
    // the trigger is fire-and-forget; give the handler thread a moment
    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(ctx.console.drain(), vec!["pong:boot\n".to_string()]);
}

#[test]
fn unregistered_events_dispatch_to_nobody() {
    let root = plugins_dir(&[("idle", "main.rhai", "let quiet = true;")]);
    let (ctx, _transport) = load(root.path());
    assert_eq!(
        ctx.plugins.dispatch("onNothing", &[], true),
        ScriptValue::Int(0)
    );
}
