// File: src/model/adapter.rs
// Conversion from in-memory records back to Todo.txt text.
use crate::model::Task;
use crate::model::parser::TaskRecord;
use crate::store::TaskStore;

impl TaskRecord {
    /// Snapshot of a task's persisted fields. `parent_title` is the parent's
    /// current title, or the unresolved one for pending subtasks.
    pub fn from_task(task: &Task, parent_title: Option<&str>) -> Self {
        Self {
            title: task.title.clone(),
            completed: task.completed,
            priority: task.priority,
            created: task.created,
            due: task.due,
            list: task.list.clone(),
            parent_title: parent_title.map(str::to_string),
        }
    }

    /// Canonical line, newline-terminated:
    /// `[x ][(A) ][YYYY-MM-DD ]<title> @<list>[ +<parent>][ due:YYYY-MM-DD]`
    pub fn to_line(&self) -> String {
        let mut tokens: Vec<String> = Vec::with_capacity(6);

        if self.completed {
            tokens.push("x".to_string());
        }
        if let Some(letter) = self.priority.letter() {
            tokens.push(format!("({})", letter));
        }
        if let Some(created) = self.created {
            tokens.push(created.format("%F").to_string());
        }
        tokens.push(self.title.clone());
        tokens.push(format!("@{}", self.list));
        if let Some(parent) = &self.parent_title {
            tokens.push(format!("+{}", parent));
        }
        if let Some(due) = self.due {
            tokens.push(format!("due:{}", due.format("%F")));
        }

        let mut line = tokens.join(" ");
        line.push('\n');
        line
    }
}

/// List declaration line for `name`.
pub fn list_line(name: &str) -> String {
    format!("@{}\n", name)
}

pub fn task_line(store: &TaskStore, task: &Task) -> String {
    TaskRecord::from_task(task, store.parent_title(task)).to_line()
}

/// Serializes the whole index: each list as a declaration line followed by
/// its tasks in insertion order.
pub fn to_todo_txt(store: &TaskStore) -> String {
    let mut output = String::new();
    for list in store.lists() {
        output.push_str(&list_line(&list.name));
        for task in store.tasks_in(&list.name) {
            output.push_str(&task_line(store, task));
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Priority;
    use crate::model::parser::{ParsedLine, parse_line};
    use chrono::NaiveDate;

    fn reparse(line: &str) -> TaskRecord {
        match parse_line(line) {
            Ok(Some(ParsedLine::Task(record))) => record,
            other => panic!("'{}' did not parse as a task: {:?}", line.trim_end(), other),
        }
    }

    #[test]
    fn test_canonical_field_order() {
        let record = TaskRecord {
            title: "Buy milk".to_string(),
            completed: true,
            priority: Priority::High,
            created: None,
            due: NaiveDate::from_ymd_opt(2020, 1, 5),
            list: "Errands".to_string(),
            parent_title: Some("Groceries".to_string()),
        };
        assert_eq!(
            record.to_line(),
            "x (A) Buy milk @Errands +Groceries due:2020-01-05\n"
        );
    }

    #[test]
    fn test_minimal_line() {
        let task = Task::new("Call mom", "Personal");
        assert_eq!(
            TaskRecord::from_task(&task, None).to_line(),
            "Call mom @Personal\n"
        );
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let records = [
            TaskRecord {
                title: "Buy milk".to_string(),
                completed: true,
                priority: Priority::Medium,
                created: NaiveDate::from_ymd_opt(2019, 12, 31),
                due: NaiveDate::from_ymd_opt(2020, 1, 5),
                list: "Weekly Errands".to_string(),
                parent_title: Some("Shopping Trip".to_string()),
            },
            TaskRecord {
                title: "Read".to_string(),
                priority: Priority::Low,
                list: "Home".to_string(),
                ..Default::default()
            },
        ];

        for record in records {
            assert_eq!(reparse(&record.to_line()), record);
        }
    }

    #[test]
    fn test_store_serialization_keeps_empty_lists() {
        let mut store = TaskStore::new();
        store.ensure_list("Shopping");
        let parent = store.insert_task(Task::new("Family", "Personal"));
        let mut child = Task::new("Call mom", "Personal");
        child.parent = Some(parent);
        store.insert_task(child);

        assert_eq!(
            to_todo_txt(&store),
            "@Personal\nFamily @Personal\nCall mom @Personal +Family\n@Shopping\n"
        );
    }
}
