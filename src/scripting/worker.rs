//! Script-owned periodic background tasks.
//!
//! `CreateThread(fn, hz)` spawns one of these. The loop re-enters the owning
//! instance at the requested frequency until the owner's stop flag flips or
//! the owner is destroyed. Tasks carry no identity: a script cannot stop one
//! of several tasks it owns, only all of them via `StopThread`.

use std::sync::Weak;
use std::thread;
use std::time::Duration;

use crate::scripting::instance::ScriptInstance;

pub const MIN_HZ: i64 = 1;
pub const MAX_HZ: i64 = 500;

pub struct BackgroundTask {
    owner: Weak<ScriptInstance>,
    function: String,
    period: Duration,
}

impl BackgroundTask {
    /// Build a task, or `None` when the frequency is outside [1, 500] Hz.
    pub fn new(owner: Weak<ScriptInstance>, function: impl Into<String>, hz: i64) -> Option<Self> {
        if !(MIN_HZ..=MAX_HZ).contains(&hz) {
            return None;
        }
        Some(Self {
            owner,
            function: function.into(),
            period: Duration::from_millis((1000 / hz) as u64),
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Detach the task onto its own named thread.
    pub fn spawn(self) {
        // re-arm the cooperative stop flag so an earlier StopThread does not
        // cancel the new task before its first tick
        if let Some(owner) = self.owner.upgrade() {
            owner.set_stop_thread(false);
        }
        let name = format!("task-{}", self.function);
        let function = self.function.clone();
        if let Err(err) = thread::Builder::new().name(name).spawn(move || self.run()) {
            log::error!("failed to spawn background task {function}: {err}");
        }
    }

    fn run(self) {
        loop {
            let Some(owner) = self.owner.upgrade() else {
                break;
            };
            if owner.get_stop_thread() {
                break;
            }
            owner.call(&self.function, &[]);
            // release the owner across the sleep so destruction is not
            // delayed by an idle task
            drop(owner);
            thread::sleep(self.period);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ServerContext;
    use crate::transport::RecordingTransport;
    use std::io::Write;
    use std::sync::Arc;

    fn ticking_instance() -> (Arc<ServerContext>, Arc<ScriptInstance>, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ticker.rhai");
        let mut file = std::fs::File::create(&path).expect("create");
        file.write_all(b"fn tick() { print(\"tick\"); }")
            .expect("write");
        let ctx = ServerContext::new(Arc::new(RecordingTransport::new()));
        let instance = ScriptInstance::new("ticker", path, &ctx);
        (ctx, instance, dir)
    }

    #[test]
    fn frequency_outside_range_spawns_nothing() {
        let (_ctx, instance, _dir) = ticking_instance();
        assert!(BackgroundTask::new(Arc::downgrade(&instance), "tick", 0).is_none());
        assert!(BackgroundTask::new(Arc::downgrade(&instance), "tick", 501).is_none());
        assert!(BackgroundTask::new(Arc::downgrade(&instance), "tick", -5).is_none());
    }

    #[test]
    fn period_is_floor_of_1000_over_hz() {
        let (_ctx, instance, _dir) = ticking_instance();
        let task = BackgroundTask::new(Arc::downgrade(&instance), "tick", 3).expect("task");
        assert_eq!(task.period(), Duration::from_millis(333));
        let task = BackgroundTask::new(Arc::downgrade(&instance), "tick", 500).expect("task");
        assert_eq!(task.period(), Duration::from_millis(2));
    }

    #[test]
    fn task_ticks_until_stopped() {
        let (ctx, instance, _dir) = ticking_instance();
        BackgroundTask::new(Arc::downgrade(&instance), "tick", 100)
            .expect("task")
            .spawn();
        thread::sleep(Duration::from_millis(120));
        instance.set_stop_thread(true);
        // let the loop observe the flag, then confirm no further ticks land
        thread::sleep(Duration::from_millis(50));
        let ticks = ctx.console.drain().len();
        assert!(ticks >= 5, "expected several ticks, got {ticks}");
        thread::sleep(Duration::from_millis(100));
        assert!(ctx.console.drain().is_empty());
    }

    #[test]
    fn task_exits_when_owner_is_dropped() {
        let (_ctx, instance, _dir) = ticking_instance();
        let task = BackgroundTask::new(Arc::downgrade(&instance), "tick", 200).expect("task");
        drop(instance);
        // run() must observe the dead owner and return immediately
        task.run();
    }
}
