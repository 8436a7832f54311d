//! Bounded registry of running tasks.
//!
//! The registry is the only state shared between the selection loop and the
//! executing tasks. Admission and release both go through one mutex. A slot
//! is held by a [`RunningTask`] guard and released when the guard drops, so
//! a task that fails or panics still frees its slot.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::task::Task;

/// Why a task was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitRefusal {
    /// Every slot is taken.
    Full,
    /// Another task for the same volume is still running.
    VolumeBusy,
}

type Running = HashMap<String, Task>;

/// Tracks executing tasks, at most one per volume and at most `capacity`
/// overall.
#[derive(Clone)]
pub struct TaskRegistry {
    capacity: usize,
    running: Arc<Mutex<Running>>,
}

impl TaskRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            running: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Running> {
        // Guards never panic while holding the lock, so a poisoned map is
        // still consistent.
        self.running.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of tasks currently executing.
    pub fn running_count(&self) -> usize {
        self.lock().len()
    }

    /// Number of free slots.
    pub fn available(&self) -> usize {
        self.capacity.saturating_sub(self.running_count())
    }

    pub fn is_running(&self, vol: &str) -> bool {
        self.lock().contains_key(vol)
    }

    /// Returns the tasks currently executing, in no particular order.
    pub fn running_tasks(&self) -> Vec<Task> {
        self.lock().values().cloned().collect()
    }

    /// Takes a slot for `task`.
    ///
    /// The slot is released when the returned guard is dropped.
    pub fn try_admit(&self, task: &Task) -> Result<RunningTask, AdmitRefusal> {
        let mut running = self.lock();
        if running.contains_key(task.vol()) {
            return Err(AdmitRefusal::VolumeBusy);
        }
        if running.len() >= self.capacity {
            return Err(AdmitRefusal::Full);
        }
        running.insert(task.vol().to_string(), task.clone());

        Ok(RunningTask {
            vol: task.vol().to_string(),
            running: Arc::clone(&self.running),
        })
    }
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("capacity", &self.capacity)
            .field("running", &self.running_count())
            .finish()
    }
}

/// RAII slot in a [`TaskRegistry`].
#[derive(Debug)]
pub struct RunningTask {
    vol: String,
    running: Arc<Mutex<Running>>,
}

impl RunningTask {
    pub fn vol(&self) -> &str {
        &self.vol
    }
}

impl Drop for RunningTask {
    fn drop(&mut self) {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        running.remove(&self.vol);
    }
}
