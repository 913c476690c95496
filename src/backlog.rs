//! Backlog of planned tasks, kept in insertion order.

use anyhow::{bail, Result};
use uuid::Uuid;

use crate::models::BacklogTask;

pub const MIN_TASK_MINUTES: u32 = 1;
pub const MAX_TASK_MINUTES: u32 = 60;

#[derive(Debug, Clone, Default)]
pub struct BacklogQueue {
    tasks: Vec<BacklogTask>,
}

impl BacklogQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tasks(tasks: Vec<BacklogTask>) -> Self {
        Self { tasks }
    }

    pub fn tasks(&self) -> &[BacklogTask] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Appends a task. Names are trimmed and must not be blank; minutes are
    /// clamped to the dial's range.
    pub fn add(&mut self, name: &str, minutes: u32) -> Result<BacklogTask> {
        let name = name.trim();
        if name.is_empty() {
            bail!("backlog task name must not be empty");
        }

        let task = BacklogTask {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            minutes: minutes.clamp(MIN_TASK_MINUTES, MAX_TASK_MINUTES),
        };
        self.tasks.push(task.clone());
        Ok(task)
    }

    pub fn get(&self, id: &str) -> Option<&BacklogTask> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn remove(&mut self, id: &str) -> Option<BacklogTask> {
        self.take(id).map(|(_, task)| task)
    }

    /// Removes a task and reports the slot it occupied.
    pub fn take(&mut self, id: &str) -> Option<(usize, BacklogTask)> {
        let index = self.tasks.iter().position(|task| task.id == id)?;
        Some((index, self.tasks.remove(index)))
    }

    /// Puts a taken task back at its old slot. Returns false if a task with
    /// the same id is already queued.
    pub fn reinsert(&mut self, index: usize, task: BacklogTask) -> bool {
        if self.get(&task.id).is_some() {
            return false;
        }
        let index = index.min(self.tasks.len());
        self.tasks.insert(index, task);
        true
    }
}
