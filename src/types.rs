use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};

pub(crate) type TaskId = i64;
pub(crate) type SubtaskId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text that names none of the priorities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsePriorityError(pub(crate) String);

impl Display for ParsePriorityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid priority {:?}, expected low, medium or high",
            self.0
        )
    }
}

impl std::error::Error for ParsePriorityError {}

impl FromStr for Priority {
    type Err = ParsePriorityError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            _ => return Err(ParsePriorityError(value.to_string())),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Task {
    pub(crate) id: TaskId,
    pub(crate) category: String,
    pub(crate) name: String,
    pub(crate) detail: Option<String>,
    pub(crate) priority: Option<Priority>,
    pub(crate) assignee: Option<String>,
    pub(crate) created: DateTime<Utc>,
    pub(crate) updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Subtask {
    pub(crate) id: SubtaskId,
    pub(crate) task_id: TaskId,
    pub(crate) name: String,
    pub(crate) detail: Option<String>,
    pub(crate) completed: bool,
    pub(crate) initiated: bool,
    pub(crate) created: DateTime<Utc>,
    pub(crate) updated: DateTime<Utc>,
}

impl Display for Subtask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let c = match (self.completed, self.initiated) {
            (true, _) => 'x',
            (false, true) => '/',
            (false, false) => ' ',
        };
        write!(f, "[{c}] SUB-{} {}", self.id, self.name)
    }
}

/// Fields for a task that does not exist yet. The store assigns the id and
/// timestamps.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct NewTask {
    pub(crate) category: String,
    pub(crate) name: String,
    pub(crate) detail: Option<String>,
    pub(crate) priority: Option<Priority>,
    pub(crate) assignee: Option<String>,
}

impl NewTask {
    pub(crate) fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        NewTask {
            category: category.into(),
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct NewSubtask {
    pub(crate) task_id: TaskId,
    pub(crate) name: String,
    pub(crate) detail: Option<String>,
    pub(crate) completed: bool,
    pub(crate) initiated: bool,
}

impl NewSubtask {
    pub(crate) fn new(task_id: TaskId, name: impl Into<String>) -> Self {
        NewSubtask {
            task_id,
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A partial update of a task. `None` leaves a field alone; for the nullable
/// fields `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct TaskUpdate {
    pub(crate) category: Option<String>,
    pub(crate) name: Option<String>,
    pub(crate) detail: Option<Option<String>>,
    pub(crate) priority: Option<Option<Priority>>,
    pub(crate) assignee: Option<Option<String>>,
}

impl TaskUpdate {
    pub(crate) fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.name.is_none()
            && self.detail.is_none()
            && self.priority.is_none()
            && self.assignee.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SubtaskUpdate {
    pub(crate) name: Option<String>,
    pub(crate) detail: Option<Option<String>>,
    pub(crate) completed: Option<bool>,
    pub(crate) initiated: Option<bool>,
}

impl SubtaskUpdate {
    pub(crate) fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.detail.is_none()
            && self.completed.is_none()
            && self.initiated.is_none()
    }
}

/// Which tasks the home view shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TaskFilter {
    All,
    Category(String),
}

impl Display for TaskFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskFilter::All => f.write_str("All"),
            TaskFilter::Category(c) => f.write_str(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_parses_any_case() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(" medium ".parse::<Priority>().unwrap(), Priority::Medium);
        assert_eq!("low".parse::<Priority>().unwrap(), Priority::Low);
        assert_eq!(
            "urgent".parse::<Priority>(),
            Err(ParsePriorityError("urgent".to_string()))
        );
    }

    #[test]
    fn empty_updates() {
        assert!(TaskUpdate::default().is_empty());
        assert!(SubtaskUpdate::default().is_empty());
        let clear_detail = TaskUpdate {
            detail: Some(None),
            ..Default::default()
        };
        assert!(!clear_detail.is_empty());
        let uncomplete = SubtaskUpdate {
            completed: Some(false),
            ..Default::default()
        };
        assert!(!uncomplete.is_empty());
    }
}
