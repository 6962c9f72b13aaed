//! Owns the daemon's single `ProcessManager` and drives it forward.
//!
//! One background `tokio::spawn`ed loop per daemon instance steps every
//! runnable process a chunk at a time and yields between chunks, so the
//! cooperative "yield via zero-delay defer" scheduling model survives the
//! move into an async host without `optimus-core` itself becoming async.

use crate::config::RunConfig;
use crate::events::{EventBus, EventBusSubscriber};
use optimus_core::{compile, CompileError, Instruction, ProcessManager, ProcessSnapshot};
use std::sync::{Arc, Mutex};

/// Shared daemon state handed to every handler and the scheduler task.
#[derive(Clone)]
pub struct Supervisor {
    manager: Arc<Mutex<ProcessManager>>,
    pub events: EventBus,
    pub config: RunConfig,
}

impl Supervisor {
    pub fn new(config: RunConfig) -> Self {
        let mut manager = ProcessManager::new();
        let events = EventBus::new();
        manager.subscribe(Box::new(EventBusSubscriber { bus: events.clone() }));
        Self { manager: Arc::new(Mutex::new(manager)), events, config }
    }

    pub fn compile_source(&self, source: &str) -> Result<(Vec<Instruction>, Vec<u8>, Vec<optimus_core::Warning>), CompileError> {
        let out = compile(source)?;
        Ok((out.instructions, out.data, out.warnings))
    }

    pub fn spawn(&self, name: String, instructions: Vec<Instruction>, data: Vec<u8>) -> u32 {
        self.manager.lock().unwrap().create_process(name, instructions, data)
    }

    pub fn list(&self) -> Vec<ProcessSnapshot> {
        self.manager.lock().unwrap().list()
    }

    pub fn exists(&self, pid: u32) -> bool {
        self.manager.lock().unwrap().get(pid).is_some()
    }

    pub fn kill(&self, pid: u32) {
        self.manager.lock().unwrap().kill(pid);
    }

    pub fn resolve_input(&self, pid: u32, line: &str) {
        self.manager.lock().unwrap().resolve_input(pid, line);
    }

    /// Background scheduling loop: every process currently `Running` gets
    /// one `chunk_size`-instruction slice per tick, then the task yields
    /// back to the runtime before the next tick.
    pub async fn run_scheduler(self: Arc<Self>) {
        let chunk_size = self.config.chunk_size;
        loop {
            self.manager.lock().unwrap().step_all(chunk_size);
            // No process is ever blocked on real I/O here, so an explicit
            // sleep stands in for "yield via zero-delay defer" between
            // chunks.
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
    }
}
