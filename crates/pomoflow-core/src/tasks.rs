//! Named tasks and their accumulated focus statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskItem {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub completed_sessions: u32,
    pub total_focus_time_seconds: u64,
    #[serde(default)]
    pub last_worked_on: Option<DateTime<Utc>>,
}

/// Per-task counters returned by [`TaskList::task_stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub sessions: u32,
    pub total_time_seconds: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskList {
    #[serde(default)]
    tasks: Vec<TaskItem>,
    #[serde(default)]
    active_task_id: Option<String>,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> &[TaskItem] {
        &self.tasks
    }

    pub fn active_task_id(&self) -> Option<&str> {
        self.active_task_id.as_deref()
    }

    pub fn active_task(&self) -> Option<&TaskItem> {
        self.active_task_id.as_deref().and_then(|id| self.task_by_id(id))
    }

    pub fn add_task(&mut self, name: &str) -> &TaskItem {
        self.tasks.push(TaskItem {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            created_at: Utc::now(),
            completed_sessions: 0,
            total_focus_time_seconds: 0,
            last_worked_on: None,
        });
        let last = self.tasks.len() - 1;
        &self.tasks[last]
    }

    /// Select the active task, or clear the selection with `None`.
    ///
    /// # Errors
    /// Returns an error if `task_id` does not name a known task.
    pub fn select_task(&mut self, task_id: Option<&str>) -> Result<(), ValidationError> {
        match task_id {
            Some(id) if self.task_by_id(id).is_none() => {
                Err(ValidationError::UnknownTask(id.to_string()))
            }
            Some(id) => {
                self.active_task_id = Some(id.to_string());
                Ok(())
            }
            None => {
                self.active_task_id = None;
                Ok(())
            }
        }
    }

    /// Remove a task. Returns whether anything was removed.
    pub fn delete_task(&mut self, task_id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != task_id);
        if self.active_task_id.as_deref() == Some(task_id) {
            self.active_task_id = None;
        }
        self.tasks.len() != before
    }

    /// Credit one finished work session to a task.
    ///
    /// # Errors
    /// Returns an error if `task_id` does not name a known task.
    pub fn update_task_stats(
        &mut self,
        task_id: &str,
        session_seconds: u64,
    ) -> Result<(), ValidationError> {
        let task = self
            .tasks
            .iter_mut()
            .find(|task| task.id == task_id)
            .ok_or_else(|| ValidationError::UnknownTask(task_id.to_string()))?;
        task.completed_sessions += 1;
        task.total_focus_time_seconds += session_seconds;
        task.last_worked_on = Some(Utc::now());
        Ok(())
    }

    pub fn task_by_id(&self, task_id: &str) -> Option<&TaskItem> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    pub fn task_stats(&self, task_id: &str) -> Option<TaskStats> {
        self.task_by_id(task_id).map(|task| TaskStats {
            sessions: task.completed_sessions,
            total_time_seconds: task.total_focus_time_seconds,
        })
    }
}
