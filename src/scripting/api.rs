//! Host API surface installed into every script instance.
//!
//! Each global is a thin adapter: it validates argument types, dispatches to
//! the server collaborators, and reports misuse through the caller's warning
//! channel (`<origin> | Incorrect Call of <api> <detail>`). No script input,
//! however malformed, can raise an error into the host; a bad call logs and
//! yields no script value.
//!
//! Variadic globals (`print`, `TriggerGlobalEvent`, `TriggerLocalEvent`) are
//! registered as arity overloads over `Dynamic` parameters, which is how the
//! engine expresses "any number of any values".
//!
//! Argument-count misuse never escapes either: every global is additionally
//! registered under every other arity up to eight parameters with a
//! warn-only stub, so calling e.g. `GetPlayerName()` or
//! `CreateThread("f", 1, 2)` logs the count mismatch and the calling script
//! frame continues past the no-op instead of aborting on an unresolved
//! function.

use rhai::{Dynamic, Engine, EvalAltResult, Position};
use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::config::SETTINGS;
use crate::context::ServerContext;
use crate::scripting::dispatcher::EventScope;
use crate::scripting::instance::ScriptInstance;
use crate::scripting::value;
use crate::scripting::worker::{BackgroundTask, MAX_HZ, MIN_HZ};

type VariadicHandler = Arc<dyn Fn(Vec<Dynamic>) -> Dynamic + Send + Sync>;

/// Register one handler under every arity in the given parameter lists.
macro_rules! register_variadic {
    ($engine:expr, $name:expr, $handler:expr, [$(($($arg:ident),*)),+ $(,)?]) => {
        $({
            let handler = $handler.clone();
            $engine.register_fn($name, move |$($arg: Dynamic),*| -> Dynamic {
                handler(vec![$($arg),*])
            });
        })+
    };
}

/// Register a warn-only stub for one specific argument count.
macro_rules! arity_stub {
    ($engine:expr, $owner:expr, $name:expr, $fmt:expr, 0) => {{
        let owner = $owner.clone();
        $engine.register_fn($name, move || -> Dynamic {
            incorrect_call(&owner, &($fmt)(0usize));
            Dynamic::UNIT
        });
    }};
    ($engine:expr, $owner:expr, $name:expr, $fmt:expr, 1) => {{
        let owner = $owner.clone();
        $engine.register_fn($name, move |_a: Dynamic| -> Dynamic {
            incorrect_call(&owner, &($fmt)(1usize));
            Dynamic::UNIT
        });
    }};
    ($engine:expr, $owner:expr, $name:expr, $fmt:expr, 2) => {{
        let owner = $owner.clone();
        $engine.register_fn($name, move |_a: Dynamic, _b: Dynamic| -> Dynamic {
            incorrect_call(&owner, &($fmt)(2usize));
            Dynamic::UNIT
        });
    }};
    ($engine:expr, $owner:expr, $name:expr, $fmt:expr, 3) => {{
        let owner = $owner.clone();
        $engine.register_fn($name, move |_a: Dynamic, _b: Dynamic, _c: Dynamic| -> Dynamic {
            incorrect_call(&owner, &($fmt)(3usize));
            Dynamic::UNIT
        });
    }};
    ($engine:expr, $owner:expr, $name:expr, $fmt:expr, 4) => {{
        let owner = $owner.clone();
        $engine.register_fn(
            $name,
            move |_a: Dynamic, _b: Dynamic, _c: Dynamic, _d: Dynamic| -> Dynamic {
                incorrect_call(&owner, &($fmt)(4usize));
                Dynamic::UNIT
            },
        );
    }};
    ($engine:expr, $owner:expr, $name:expr, $fmt:expr, 5) => {{
        let owner = $owner.clone();
        $engine.register_fn(
            $name,
            move |_a: Dynamic, _b: Dynamic, _c: Dynamic, _d: Dynamic, _e: Dynamic| -> Dynamic {
                incorrect_call(&owner, &($fmt)(5usize));
                Dynamic::UNIT
            },
        );
    }};
    ($engine:expr, $owner:expr, $name:expr, $fmt:expr, 6) => {{
        let owner = $owner.clone();
        $engine.register_fn(
            $name,
            move |_a: Dynamic,
                  _b: Dynamic,
                  _c: Dynamic,
                  _d: Dynamic,
                  _e: Dynamic,
                  _f: Dynamic|
                  -> Dynamic {
                incorrect_call(&owner, &($fmt)(6usize));
                Dynamic::UNIT
            },
        );
    }};
    ($engine:expr, $owner:expr, $name:expr, $fmt:expr, 7) => {{
        let owner = $owner.clone();
        $engine.register_fn(
            $name,
            move |_a: Dynamic,
                  _b: Dynamic,
                  _c: Dynamic,
                  _d: Dynamic,
                  _e: Dynamic,
                  _f: Dynamic,
                  _g: Dynamic|
                  -> Dynamic {
                incorrect_call(&owner, &($fmt)(7usize));
                Dynamic::UNIT
            },
        );
    }};
    ($engine:expr, $owner:expr, $name:expr, $fmt:expr, 8) => {{
        let owner = $owner.clone();
        $engine.register_fn(
            $name,
            move |_a: Dynamic,
                  _b: Dynamic,
                  _c: Dynamic,
                  _d: Dynamic,
                  _e: Dynamic,
                  _f: Dynamic,
                  _g: Dynamic,
                  _h: Dynamic|
                  -> Dynamic {
                incorrect_call(&owner, &($fmt)(8usize));
                Dynamic::UNIT
            },
        );
    }};
}

/// Cover the given argument counts of a host function with warn-only stubs
/// so a miscounted call logs and the script keeps running.
macro_rules! register_arity_errors {
    ($engine:expr, $owner:expr, $name:expr, $fmt:expr, [$($count:tt),+ $(,)?]) => {
        $( arity_stub!($engine, $owner, $name, $fmt, $count); )+
    };
}

/// Install the full global table. `owner` identifies the calling instance
/// from inside every native function without any registry search.
pub(crate) fn install(engine: &mut Engine, owner: Weak<ScriptInstance>, ctx: &Arc<ServerContext>) {
    // ------------------------------------------------------------------
    // Console output
    // ------------------------------------------------------------------

    // route the engine's own print/debug output into the console queue as
    // well, so no script output ever bypasses the prompt redraw
    {
        let queue = Arc::clone(&ctx.console);
        engine.on_print(move |text| queue.push(format!("{text}\n")));
    }

    let print_handler: VariadicHandler = {
        let queue = Arc::clone(&ctx.console);
        Arc::new(move |values: Vec<Dynamic>| {
            for value in values {
                if value.is_unit() {
                    queue.push("nil\n".to_string());
                } else {
                    queue.push(format!("{value}\n"));
                }
            }
            Dynamic::UNIT
        })
    };
    register_variadic!(engine, "print", print_handler, [
        (),
        (a),
        (a, b),
        (a, b, c),
        (a, b, c, d),
        (a, b, c, d, e),
        (a, b, c, d, e, f),
    ]);
    register_arity_errors!(
        engine,
        owner,
        "print",
        |got: usize| format!("print invalid argument count expected at most 6 got {got}"),
        [7, 8]
    );

    // ------------------------------------------------------------------
    // Event bus
    // ------------------------------------------------------------------

    let global_trigger = trigger_handler(
        owner.clone(),
        Arc::clone(ctx),
        EventScope::Global,
        "TriggerGlobalEvent",
    );
    register_variadic!(engine, "TriggerGlobalEvent", global_trigger, [
        (),
        (a),
        (a, b),
        (a, b, c),
        (a, b, c, d),
        (a, b, c, d, e),
        (a, b, c, d, e, f),
        (a, b, c, d, e, f, g),
    ]);
    register_arity_errors!(
        engine,
        owner,
        "TriggerGlobalEvent",
        |got: usize| {
            format!("TriggerGlobalEvent invalid argument count expected at most 7 got {got}")
        },
        [8]
    );

    let local_trigger = trigger_handler(
        owner.clone(),
        Arc::clone(ctx),
        EventScope::Local,
        "TriggerLocalEvent",
    );
    register_variadic!(engine, "TriggerLocalEvent", local_trigger, [
        (),
        (a),
        (a, b),
        (a, b, c),
        (a, b, c, d),
        (a, b, c, d, e),
        (a, b, c, d, e, f),
        (a, b, c, d, e, f, g),
    ]);
    register_arity_errors!(
        engine,
        owner,
        "TriggerLocalEvent",
        |got: usize| {
            format!("TriggerLocalEvent invalid argument count expected at most 7 got {got}")
        },
        [8]
    );

    {
        let owner = owner.clone();
        engine.register_fn(
            "RegisterEvent",
            move |event: Dynamic, function: Dynamic| -> Dynamic {
                let Some(event) = as_str(&event) else {
                    incorrect_call(&owner, "RegisterEvent invalid argument [1] expected string");
                    return Dynamic::UNIT;
                };
                let Some(function) = as_str(&function) else {
                    incorrect_call(&owner, "RegisterEvent invalid argument [2] expected string");
                    return Dynamic::UNIT;
                };
                if let Some(instance) = owner.upgrade() {
                    instance.register_event(event, function);
                }
                Dynamic::UNIT
            },
        );
    }
    register_arity_errors!(
        engine,
        owner,
        "RegisterEvent",
        |got: usize| format!("RegisterEvent invalid argument count expected 2 got {got}"),
        [0, 1, 3, 4, 5, 6, 7, 8]
    );

    {
        let owner = owner.clone();
        let ctx = Arc::clone(ctx);
        engine.register_fn(
            "TriggerClientEvent",
            move |client_id: Dynamic, event: Dynamic, payload: Dynamic| -> Dynamic {
                let Some(client_id) = as_number(&client_id) else {
                    incorrect_call(&owner, "TriggerClientEvent invalid argument [1] expected number");
                    return Dynamic::UNIT;
                };
                let Some(event) = as_str(&event) else {
                    incorrect_call(&owner, "TriggerClientEvent invalid argument [2] expected string");
                    return Dynamic::UNIT;
                };
                let Some(payload) = as_str(&payload) else {
                    incorrect_call(&owner, "TriggerClientEvent invalid argument [3] expected string");
                    return Dynamic::UNIT;
                };
                let packet = format!("E:{event}:{payload}");
                if client_id == -1 {
                    ctx.transport.broadcast(&packet);
                } else if ctx.clients.get(client_id).is_some() {
                    ctx.transport.send_to(client_id, &packet);
                } else {
                    incorrect_call(&owner, "TriggerClientEvent invalid Player ID");
                }
                Dynamic::UNIT
            },
        );
    }
    register_arity_errors!(
        engine,
        owner,
        "TriggerClientEvent",
        |got: usize| format!("TriggerClientEvent invalid argument count expected 3 got {got}"),
        [0, 1, 2, 4, 5, 6, 7, 8]
    );

    // ------------------------------------------------------------------
    // Background work
    // ------------------------------------------------------------------

    {
        let owner = owner.clone();
        engine.register_fn(
            "CreateThread",
            move |function: Dynamic, hz: Dynamic| -> Dynamic {
                let Some(function) = as_str(&function) else {
                    incorrect_call(&owner, "CreateThread invalid argument [1] expected string");
                    return Dynamic::UNIT;
                };
                let Some(hz) = as_number(&hz) else {
                    incorrect_call(&owner, "CreateThread invalid argument [2] expected number");
                    return Dynamic::UNIT;
                };
                if !(MIN_HZ..=MAX_HZ).contains(&hz) {
                    incorrect_call(
                        &owner,
                        "CreateThread invalid argument [2] number must be between 1 and 500",
                    );
                    return Dynamic::UNIT;
                }
                if let Some(task) = BackgroundTask::new(owner.clone(), function, hz) {
                    task.spawn();
                }
                Dynamic::UNIT
            },
        );
    }
    register_arity_errors!(
        engine,
        owner,
        "CreateThread",
        |_got: usize| String::from("CreateThread not enough arguments"),
        [0, 1]
    );
    register_arity_errors!(
        engine,
        owner,
        "CreateThread",
        |got: usize| format!("CreateThread invalid argument count expected 2 got {got}"),
        [3, 4, 5, 6, 7, 8]
    );

    {
        let owner = owner.clone();
        engine.register_fn("StopThread", move || -> Dynamic {
            if let Some(instance) = owner.upgrade() {
                instance.set_stop_thread(true);
            }
            Dynamic::UNIT
        });
    }
    register_arity_errors!(
        engine,
        owner,
        "StopThread",
        |got: usize| format!("StopThread invalid argument count expected 0 got {got}"),
        [1, 2, 3, 4, 5, 6, 7, 8]
    );

    {
        let owner = owner.clone();
        engine.register_fn(
            "Sleep",
            move |ms: Dynamic| -> Result<Dynamic, Box<EvalAltResult>> {
                let Some(ms) = as_number(&ms) else {
                    incorrect_call(&owner, "Sleep invalid argument [1] expected number");
                    return Ok(Dynamic::UNIT);
                };
                // sleep in slices so a timed-out frame can be terminated
                // while blocked here
                const SLICE: Duration = Duration::from_millis(25);
                let mut remaining = Duration::from_millis(ms.max(0) as u64);
                while !remaining.is_zero() {
                    let step = remaining.min(SLICE);
                    std::thread::sleep(step);
                    remaining -= step;
                    if owner.upgrade().is_some_and(|i| i.interrupted()) {
                        return Err(
                            EvalAltResult::ErrorTerminated(Dynamic::UNIT, Position::NONE).into()
                        );
                    }
                }
                Ok(Dynamic::UNIT)
            },
        );
    }
    register_arity_errors!(
        engine,
        owner,
        "Sleep",
        |_got: usize| String::from("Sleep not enough arguments"),
        [0]
    );
    register_arity_errors!(
        engine,
        owner,
        "Sleep",
        |got: usize| format!("Sleep invalid argument count expected 1 got {got}"),
        [2, 3, 4, 5, 6, 7, 8]
    );

    // ------------------------------------------------------------------
    // Player queries
    // ------------------------------------------------------------------

    {
        let ctx = Arc::clone(ctx);
        engine.register_fn("GetPlayerCount", move || -> Dynamic {
            Dynamic::from(ctx.clients.len() as i64)
        });
    }
    register_arity_errors!(
        engine,
        owner,
        "GetPlayerCount",
        |got: usize| format!("GetPlayerCount invalid argument count expected 0 got {got}"),
        [1, 2, 3, 4, 5, 6, 7, 8]
    );

    {
        let owner = owner.clone();
        let ctx = Arc::clone(ctx);
        engine.register_fn("isPlayerConnected", move |id: Dynamic| -> Dynamic {
            let Some(id) = as_number(&id) else {
                incorrect_call(&owner, "isPlayerConnected invalid argument [1] expected number");
                return Dynamic::UNIT;
            };
            match ctx.clients.get(id) {
                Some(client) => Dynamic::from(client.is_connected()),
                None => Dynamic::UNIT,
            }
        });
    }
    register_arity_errors!(
        engine,
        owner,
        "isPlayerConnected",
        |_got: usize| String::from("isPlayerConnected not enough arguments"),
        [0]
    );
    register_arity_errors!(
        engine,
        owner,
        "isPlayerConnected",
        |got: usize| format!("isPlayerConnected invalid argument count expected 1 got {got}"),
        [2, 3, 4, 5, 6, 7, 8]
    );

    {
        let owner = owner.clone();
        let ctx = Arc::clone(ctx);
        engine.register_fn("GetPlayerName", move |id: Dynamic| -> Dynamic {
            let Some(id) = as_number(&id) else {
                incorrect_call(&owner, "GetPlayerName invalid argument [1] expected number");
                return Dynamic::UNIT;
            };
            match ctx.clients.get(id) {
                Some(client) => Dynamic::from(client.name().to_string()),
                None => Dynamic::UNIT,
            }
        });
    }
    register_arity_errors!(
        engine,
        owner,
        "GetPlayerName",
        |_got: usize| String::from("GetPlayerName not enough arguments"),
        [0]
    );
    register_arity_errors!(
        engine,
        owner,
        "GetPlayerName",
        |got: usize| format!("GetPlayerName invalid argument count expected 1 got {got}"),
        [2, 3, 4, 5, 6, 7, 8]
    );

    {
        let owner = owner.clone();
        let ctx = Arc::clone(ctx);
        engine.register_fn("GetPlayerGuest", move |id: Dynamic| -> Dynamic {
            let Some(id) = as_number(&id) else {
                incorrect_call(&owner, "GetPlayerGuest invalid argument [1] expected number");
                return Dynamic::UNIT;
            };
            match ctx.clients.get(id) {
                Some(client) => Dynamic::from(client.is_guest()),
                None => Dynamic::UNIT,
            }
        });
    }
    register_arity_errors!(
        engine,
        owner,
        "GetPlayerGuest",
        |_got: usize| String::from("GetPlayerGuest not enough arguments"),
        [0]
    );
    register_arity_errors!(
        engine,
        owner,
        "GetPlayerGuest",
        |got: usize| format!("GetPlayerGuest invalid argument count expected 1 got {got}"),
        [2, 3, 4, 5, 6, 7, 8]
    );

    {
        let ctx = Arc::clone(ctx);
        engine.register_fn("GetPlayers", move || -> Dynamic {
            let clients = ctx.clients.snapshot();
            if clients.is_empty() {
                return Dynamic::UNIT;
            }
            let mut table = rhai::Map::new();
            for client in clients {
                table.insert(
                    client.id().to_string().into(),
                    Dynamic::from(client.name().to_string()),
                );
            }
            Dynamic::from(table)
        });
    }
    register_arity_errors!(
        engine,
        owner,
        "GetPlayers",
        |got: usize| format!("GetPlayers invalid argument count expected 0 got {got}"),
        [1, 2, 3, 4, 5, 6, 7, 8]
    );

    {
        let owner = owner.clone();
        let ctx = Arc::clone(ctx);
        engine.register_fn("GetPlayerVehicles", move |id: Dynamic| -> Dynamic {
            let Some(id) = as_number(&id) else {
                incorrect_call(&owner, "GetPlayerVehicles invalid argument [1] expected number");
                return Dynamic::UNIT;
            };
            let Some(client) = ctx.clients.get(id) else {
                return Dynamic::UNIT;
            };
            let vehicles = client.vehicles();
            if vehicles.is_empty() {
                return Dynamic::UNIT;
            }
            let mut table = rhai::Map::new();
            for (vehicle_id, data) in vehicles {
                // drop the 3-byte transport prefix before scripts see it
                let payload = data.get(3..).unwrap_or("").to_string();
                table.insert(vehicle_id.to_string().into(), Dynamic::from(payload));
            }
            Dynamic::from(table)
        });
    }
    register_arity_errors!(
        engine,
        owner,
        "GetPlayerVehicles",
        |_got: usize| String::from("GetPlayerVehicles not enough arguments"),
        [0]
    );
    register_arity_errors!(
        engine,
        owner,
        "GetPlayerVehicles",
        |got: usize| format!("GetPlayerVehicles invalid argument count expected 1 got {got}"),
        [2, 3, 4, 5, 6, 7, 8]
    );

    {
        let owner = owner.clone();
        let ctx = Arc::clone(ctx);
        engine.register_fn("GetPlayerDiscordID", move |id: Dynamic| -> Dynamic {
            let Some(id) = as_number(&id) else {
                incorrect_call(&owner, "GetPlayerDiscordID invalid argument [1] expected number");
                return Dynamic::UNIT;
            };
            match ctx.clients.get(id) {
                // placeholder semantics until account linking exists
                Some(client) if client.is_guest() => {
                    Dynamic::from(format!("Guest-{}", client.name()))
                }
                Some(client) => Dynamic::from(client.name().to_string()),
                None => Dynamic::UNIT,
            }
        });
    }
    register_arity_errors!(
        engine,
        owner,
        "GetPlayerDiscordID",
        |_got: usize| String::from("GetPlayerDiscordID not enough arguments"),
        [0]
    );
    register_arity_errors!(
        engine,
        owner,
        "GetPlayerDiscordID",
        |got: usize| format!("GetPlayerDiscordID invalid argument count expected 1 got {got}"),
        [2, 3, 4, 5, 6, 7, 8]
    );

    engine.register_fn("GetPlayerHWID", || -> Dynamic { Dynamic::from(-1_i64) });
    register_arity_errors!(
        engine,
        owner,
        "GetPlayerHWID",
        |got: usize| format!("GetPlayerHWID invalid argument count expected 0 got {got}"),
        [1, 2, 3, 4, 5, 6, 7, 8]
    );

    // ------------------------------------------------------------------
    // Moderation & vehicle control
    // ------------------------------------------------------------------

    {
        let owner = owner.clone();
        let ctx = Arc::clone(ctx);
        engine.register_fn(
            "RemoveVehicle",
            move |player_id: Dynamic, vehicle_id: Dynamic| -> Dynamic {
                let (Some(player_id), Some(vehicle_id)) =
                    (as_number(&player_id), as_number(&vehicle_id))
                else {
                    incorrect_call(&owner, "RemoveVehicle invalid argument expected number");
                    return Dynamic::UNIT;
                };
                let Some(client) = ctx.clients.get(player_id) else {
                    incorrect_call(&owner, "RemoveVehicle invalid Player ID");
                    return Dynamic::UNIT;
                };
                if client.vehicle_data(vehicle_id).is_some() {
                    ctx.transport
                        .broadcast(&format!("Od:{player_id}-{vehicle_id}"));
                    client.delete_vehicle(vehicle_id);
                }
                Dynamic::UNIT
            },
        );
    }
    register_arity_errors!(
        engine,
        owner,
        "RemoveVehicle",
        |got: usize| format!("RemoveVehicle invalid argument count expected 2 got {got}"),
        [0, 1, 3, 4, 5, 6, 7, 8]
    );

    {
        let owner = owner.clone();
        let ctx = Arc::clone(ctx);
        engine.register_fn(
            "SendChatMessage",
            move |id: Dynamic, message: Dynamic| -> Dynamic {
                let Some(id) = as_number(&id) else {
                    incorrect_call(&owner, "SendChatMessage invalid argument [1] expected number");
                    return Dynamic::UNIT;
                };
                let Some(message) = as_str(&message) else {
                    incorrect_call(&owner, "SendChatMessage invalid argument [2] expected string");
                    return Dynamic::UNIT;
                };
                let packet = format!("C:Server: {message}");
                if id == -1 {
                    ctx.transport.broadcast(&packet);
                    return Dynamic::UNIT;
                }
                match ctx.clients.get(id) {
                    Some(client) => {
                        if client.is_synced() {
                            ctx.transport.send_to(id, &packet);
                        }
                    }
                    None => incorrect_call(&owner, "SendChatMessage invalid argument [1] invalid ID"),
                }
                Dynamic::UNIT
            },
        );
    }
    register_arity_errors!(
        engine,
        owner,
        "SendChatMessage",
        |_got: usize| String::from("SendChatMessage invalid argument [1] expected number"),
        [0]
    );
    register_arity_errors!(
        engine,
        owner,
        "SendChatMessage",
        |_got: usize| String::from("SendChatMessage invalid argument [2] expected string"),
        [1]
    );
    register_arity_errors!(
        engine,
        owner,
        "SendChatMessage",
        |got: usize| format!("SendChatMessage invalid argument count expected 2 got {got}"),
        [3, 4, 5, 6, 7, 8]
    );

    {
        let drop_handler = drop_player_handler(owner.clone(), Arc::clone(ctx));
        let one_arg = drop_handler.clone();
        engine.register_fn("DropPlayer", move |id: Dynamic| -> Dynamic {
            one_arg(id, None)
        });
        engine.register_fn("DropPlayer", move |id: Dynamic, reason: Dynamic| -> Dynamic {
            drop_handler(id, Some(reason))
        });
    }
    register_arity_errors!(
        engine,
        owner,
        "DropPlayer",
        |_got: usize| String::from("DropPlayer not enough arguments"),
        [0]
    );
    register_arity_errors!(
        engine,
        owner,
        "DropPlayer",
        |got: usize| format!("DropPlayer invalid argument count expected at most 2 got {got}"),
        [3, 4, 5, 6, 7, 8]
    );

    // ------------------------------------------------------------------
    // Settings & process control
    // ------------------------------------------------------------------

    {
        let owner = owner.clone();
        engine.register_fn("Set", move |key: Dynamic, value: Dynamic| -> Dynamic {
            apply_setting(&owner, &key, &value);
            Dynamic::UNIT
        });
    }
    register_arity_errors!(
        engine,
        owner,
        "Set",
        |got: usize| format!("set invalid argument count expected 2 got {got}"),
        [0, 1, 3, 4, 5, 6, 7, 8]
    );

    engine.register_fn("exit", || -> Dynamic { std::process::exit(0) });
    engine.register_fn("exit", |code: Dynamic| -> Dynamic {
        std::process::exit(as_number(&code).unwrap_or(0) as i32)
    });
    register_arity_errors!(
        engine,
        owner,
        "exit",
        |got: usize| format!("exit invalid argument count expected at most 1 got {got}"),
        [2, 3, 4, 5, 6, 7, 8]
    );
}

// ----------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------

fn origin_of(owner: &Weak<ScriptInstance>) -> String {
    owner
        .upgrade()
        .map(|instance| instance.origin())
        .unwrap_or_else(|| "_Console".to_string())
}

/// Plugin name used when attributing settings changes.
fn caller_name(owner: &Weak<ScriptInstance>) -> String {
    owner
        .upgrade()
        .filter(|instance| !instance.is_console() && !instance.plugin_name().is_empty())
        .map(|instance| instance.plugin_name().to_string())
        .unwrap_or_else(|| "_Console".to_string())
}

fn incorrect_call(owner: &Weak<ScriptInstance>, detail: &str) {
    log::warn!("{} | Incorrect Call of {detail}", origin_of(owner));
}

fn as_str(value: &Dynamic) -> Option<String> {
    if value.is::<rhai::ImmutableString>() {
        value.clone().into_string().ok()
    } else {
        None
    }
}

/// Numeric view accepting both integers and floats (truncating), the way
/// every id-taking global treats its arguments.
fn as_number(value: &Dynamic) -> Option<i64> {
    if value.is::<i64>() {
        value.as_int().ok()
    } else if value.is::<f64>() {
        value.as_float().ok().map(|f| f as i64)
    } else {
        None
    }
}

fn as_bool(value: &Dynamic) -> Option<bool> {
    if value.is::<bool>() {
        value.as_bool().ok()
    } else {
        None
    }
}

fn trigger_handler(
    owner: Weak<ScriptInstance>,
    ctx: Arc<ServerContext>,
    scope: EventScope,
    api_name: &'static str,
) -> VariadicHandler {
    Arc::new(move |mut values: Vec<Dynamic>| {
        if values.is_empty() {
            incorrect_call(&owner, &format!("{api_name} not enough arguments"));
            return Dynamic::UNIT;
        }
        let event = values.remove(0);
        let Some(event) = as_str(&event) else {
            incorrect_call(&owner, &format!("{api_name} invalid argument [1] expected string"));
            return Dynamic::UNIT;
        };
        let args = value::classify_all(&values);
        let caller = owner.upgrade();
        let caller_plugin = caller.as_ref().map(|instance| instance.plugin_name());
        // fire-and-forget: handlers run on their own threads and this frame
        // keeps its interpreter lock, so nothing here may wait on them
        ctx.plugins
            .dispatch_from(&event, scope, caller_plugin, &args, false);
        Dynamic::UNIT
    })
}

type DropHandler = Arc<dyn Fn(Dynamic, Option<Dynamic>) -> Dynamic + Send + Sync>;

fn drop_player_handler(owner: Weak<ScriptInstance>, ctx: Arc<ServerContext>) -> DropHandler {
    Arc::new(move |id: Dynamic, reason: Option<Dynamic>| {
        let Some(id) = as_number(&id) else {
            incorrect_call(&owner, "DropPlayer invalid argument [1] expected number");
            return Dynamic::UNIT;
        };
        let Some(client) = ctx.clients.get(id) else {
            return Dynamic::UNIT;
        };
        let mut banner = "C:Server:You have been Kicked from the server!".to_string();
        if let Some(reason) = reason.as_ref().and_then(as_str) {
            banner.push_str(&format!(" Reason : {reason}"));
        }
        ctx.transport.send_to(id, &banner);
        client.set_status(-2);
        log::info!("Closing socket due to kick");
        ctx.transport.disconnect(id);
        Dynamic::UNIT
    })
}

fn apply_setting(owner: &Weak<ScriptInstance>, key: &Dynamic, value: &Dynamic) {
    let Some(key) = as_number(key) else {
        incorrect_call(owner, "set invalid argument [1] expected number");
        return;
    };
    let name = caller_name(owner);
    match key {
        0 => match as_bool(value) {
            Some(on) => {
                SETTINGS.set_debug(on);
                log::info!("{name} | Debug -> {on}");
            }
            None => incorrect_call(owner, "set invalid argument [2] expected boolean for ID : 0"),
        },
        1 => match as_bool(value) {
            Some(on) => {
                SETTINGS.set_private(on);
                log::info!("{name} | Private -> {on}");
            }
            None => incorrect_call(owner, "set invalid argument [2] expected boolean for ID : 1"),
        },
        2 => match as_number(value) {
            Some(n) => {
                SETTINGS.set_max_cars(n);
                log::info!("{name} | MaxCars -> {n}");
            }
            None => incorrect_call(owner, "set invalid argument [2] expected number for ID : 2"),
        },
        3 => match as_number(value) {
            Some(n) => {
                SETTINGS.set_max_players(n);
                log::info!("{name} | MaxPlayers -> {n}");
            }
            None => incorrect_call(owner, "set invalid argument [2] expected number for ID : 3"),
        },
        4 => match as_str(value) {
            Some(map) => {
                SETTINGS.set_map_name(&map);
                log::info!("{name} | MapName -> {map}");
            }
            None => incorrect_call(owner, "set invalid argument [2] expected string for ID : 4"),
        },
        5 => match as_str(value) {
            Some(server_name) => {
                SETTINGS.set_server_name(&server_name);
                log::info!("{name} | ServerName -> {server_name}");
            }
            None => incorrect_call(owner, "set invalid argument [2] expected string for ID : 5"),
        },
        6 => match as_str(value) {
            Some(desc) => {
                SETTINGS.set_server_desc(&desc);
                log::info!("{name} | ServerDesc -> {desc}");
            }
            None => incorrect_call(owner, "set invalid argument [2] expected string for ID : 6"),
        },
        unknown => log::warn!("Invalid config ID : {unknown}"),
    }
}
