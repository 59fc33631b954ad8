// File: ./src/model/item.rs
use chrono::NaiveDate;
use std::fmt;
use strum::EnumIter;
use uuid::Uuid;

/// Stable identity of a task, generated when the task enters the index.
///
/// Titles are display text only; two tasks may share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// --- PRIORITY ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash, EnumIter)]
pub enum Priority {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl Priority {
    /// Numeric weight: 0 = none, 1..3 = low/medium/high.
    pub fn weight(self) -> u8 {
        match self {
            Priority::None => 0,
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }

    pub fn from_weight(weight: u8) -> Self {
        match weight {
            1 => Priority::Low,
            2 => Priority::Medium,
            3 => Priority::High,
            _ => Priority::None,
        }
    }

    /// `A` is the highest priority. Any other letter means no priority.
    pub fn from_letter(letter: char) -> Self {
        match letter {
            'A' => Priority::High,
            'B' => Priority::Medium,
            'C' => Priority::Low,
            _ => Priority::None,
        }
    }

    pub fn letter(self) -> Option<char> {
        match self {
            Priority::None => None,
            Priority::Low => Some('C'),
            Priority::Medium => Some('B'),
            Priority::High => Some('A'),
        }
    }
}

// --- TASK ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub completed: bool,
    pub priority: Priority,
    pub created: Option<NaiveDate>,
    pub due: Option<NaiveDate>,
    /// Display name of the owning list.
    pub list: String,
    /// Linked parent task (same list).
    pub parent: Option<TaskId>,
    /// Parent title still waiting for a matching task in the same list.
    pub pending_parent: Option<String>,
}

impl Task {
    pub fn new(title: &str, list: &str) -> Self {
        Self {
            id: TaskId::new(),
            title: title.trim().to_string(),
            completed: false,
            priority: Priority::None,
            created: None,
            due: None,
            list: list.to_string(),
            parent: None,
            pending_parent: None,
        }
    }

    pub fn is_subtask(&self) -> bool {
        self.parent.is_some() || self.pending_parent.is_some()
    }
}

/// A request to create a task through the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub list: String,
    pub completed: bool,
    pub priority: Priority,
    pub created: Option<NaiveDate>,
    pub due: Option<NaiveDate>,
    pub parent: Option<TaskId>,
    /// Link to the task with this title once one exists in the same list.
    pub parent_title: Option<String>,
}

impl NewTask {
    pub fn new(title: &str, list: &str) -> Self {
        Self {
            title: title.to_string(),
            list: list.to_string(),
            ..Default::default()
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due(mut self, due: NaiveDate) -> Self {
        self.due = Some(due);
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    pub fn under(mut self, parent: TaskId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn under_title(mut self, parent_title: &str) -> Self {
        self.parent_title = Some(parent_title.to_string());
        self
    }
}

// --- TASK LIST ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskList {
    pub name: String,
    /// Always true for Todo.txt lists.
    pub removable: bool,
    /// Member tasks in insertion order.
    pub tasks: Vec<TaskId>,
}

impl TaskList {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            removable: true,
            tasks: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_priority_letters_match_weights() {
        assert_eq!(Priority::from_letter('A').weight(), 3);
        assert_eq!(Priority::from_letter('B').weight(), 2);
        assert_eq!(Priority::from_letter('C').weight(), 1);
        assert_eq!(Priority::from_letter('D'), Priority::None);
        assert_eq!(Priority::from_letter('a'), Priority::None);

        for p in Priority::iter() {
            assert_eq!(Priority::from_weight(p.weight()), p);
        }
        assert_eq!(Priority::from_weight(9), Priority::None);
    }

    #[test]
    fn test_task_ids_are_unique() {
        let a = Task::new("Same", "Inbox");
        let b = Task::new("Same", "Inbox");
        assert_ne!(a.id, b.id);
        assert_eq!(a.title, b.title);
    }
}
