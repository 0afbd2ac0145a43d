//! Ordered todo store used as the coordinator's execution plan.
//!
//! Items carry a monotonically increasing id assigned at insertion; ids are
//! never reused. Execution order is creation order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TodoError {
    #[error("Todo title cannot be empty")]
    EmptyTitle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

impl TodoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TodoStatus::Pending => "pending",
            TodoStatus::InProgress => "in_progress",
            TodoStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub status: TodoStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TodoItem {
    /// The free text fed to routing and planning: title, or "title - description".
    pub fn prompt_text(&self) -> String {
        if self.description.is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.title, self.description)
        }
    }
}

/// Partial update applied by [`TodoStore::update`]. `None` fields are left alone.
#[derive(Debug, Default, Clone)]
pub struct TodoUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TodoStatus>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TodoStore {
    items: Vec<TodoItem>,
    next_id: u64,
}

impl TodoStore {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            next_id: 1,
        }
    }

    pub fn add(&mut self, title: &str, description: &str) -> Result<u64, TodoError> {
        if title.is_empty() {
            return Err(TodoError::EmptyTitle);
        }

        let now = Utc::now();
        let id = self.next_id;
        self.next_id += 1;

        self.items.push(TodoItem {
            id,
            title: title.to_string(),
            description: description.to_string(),
            status: TodoStatus::Pending,
            created_at: now,
            updated_at: now,
        });

        Ok(id)
    }

    pub fn list(&self, include_completed: bool) -> Vec<TodoItem> {
        self.items
            .iter()
            .filter(|item| include_completed || item.status != TodoStatus::Completed)
            .cloned()
            .collect()
    }

    pub fn update(&mut self, id: u64, update: TodoUpdate) -> bool {
        let Some(item) = self.items.iter_mut().find(|item| item.id == id) else {
            return false;
        };

        let mut changed = false;
        if let Some(title) = update.title {
            if !title.is_empty() && item.title != title {
                item.title = title;
                changed = true;
            }
        }
        if let Some(description) = update.description {
            if item.description != description {
                item.description = description;
                changed = true;
            }
        }
        if let Some(status) = update.status {
            if item.status != status {
                item.status = status;
                changed = true;
            }
        }

        if changed {
            item.updated_at = Utc::now();
        }
        changed
    }

    pub fn delete(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn get(&self, id: u64) -> Option<&TodoItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn mark_in_progress(&mut self, id: u64) -> bool {
        self.update(
            id,
            TodoUpdate {
                status: Some(TodoStatus::InProgress),
                ..Default::default()
            },
        )
    }

    pub fn mark_completed(&mut self, id: u64) -> bool {
        self.update(
            id,
            TodoUpdate {
                status: Some(TodoStatus::Completed),
                ..Default::default()
            },
        )
    }

    pub fn mark_pending(&mut self, id: u64) -> bool {
        self.update(
            id,
            TodoUpdate {
                status: Some(TodoStatus::Pending),
                ..Default::default()
            },
        )
    }

    pub fn next_pending(&self) -> Option<&TodoItem> {
        self.items
            .iter()
            .find(|item| item.status == TodoStatus::Pending)
    }

    /// Pending items in creation (FIFO) order.
    pub fn execution_queue(&self) -> Vec<TodoItem> {
        self.items
            .iter()
            .filter(|item| item.status == TodoStatus::Pending)
            .cloned()
            .collect()
    }

    /// The queue slice strictly preceding `stop_id`. When `stop_id` is not in
    /// the queue the whole pending queue is returned.
    pub fn until(&self, stop_id: u64) -> Vec<TodoItem> {
        self.execution_queue()
            .into_iter()
            .take_while(|item| item.id != stop_id)
            .collect()
    }

    /// Queue items from `start_id` through `end_id` inclusive. Empty when
    /// `start_id` never appears in the pending queue or the bounds are
    /// reversed.
    pub fn range(&self, start_id: u64, end_id: u64) -> Vec<TodoItem> {
        if start_id > end_id {
            return Vec::new();
        }

        let mut result = Vec::new();
        let mut found_start = false;

        for item in self.execution_queue() {
            if item.id == start_id {
                found_start = true;
            }
            if found_start {
                let is_end = item.id == end_id;
                result.push(item);
                if is_end {
                    break;
                }
            }
        }

        result
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn count_pending(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.status == TodoStatus::Pending)
            .count()
    }
}
