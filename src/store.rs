// File: src/store.rs
//! In-memory index of lists and tasks.
//!
//! Lists are keyed by name, tasks by their generated [`TaskId`]. The index is
//! rebuilt from scratch on every load; it is never merged with a previous
//! snapshot.
use crate::model::parser::ParsedLine;
use crate::model::{Task, TaskId, TaskList};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    lists: BTreeMap<String, TaskList>,
    tasks: HashMap<TaskId, Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from parsed lines in two passes: first every list and
    /// task is created, then subtasks are linked to their parents.
    pub fn from_lines<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = ParsedLine>,
    {
        let mut store = Self::new();

        for line in lines {
            match line {
                ParsedLine::ListDeclaration(name) => {
                    store.ensure_list(&name);
                }
                ParsedLine::Task(record) => {
                    let mut task = Task::new(&record.title, &record.list);
                    task.completed = record.completed;
                    task.priority = record.priority;
                    task.created = record.created;
                    task.due = record.due;
                    task.pending_parent = record.parent_title;
                    store.push_task(task);
                }
            }
        }

        store.resolve_pending();
        store
    }

    pub fn clear(&mut self) {
        self.lists.clear();
        self.tasks.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    // --- Lookups ---

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn list(&self, name: &str) -> Option<&TaskList> {
        self.lists.get(name)
    }

    pub fn has_list(&self, name: &str) -> bool {
        self.lists.contains_key(name)
    }

    /// Lists in name order.
    pub fn lists(&self) -> impl Iterator<Item = &TaskList> {
        self.lists.values()
    }

    pub fn list_names(&self) -> Vec<String> {
        self.lists.keys().cloned().collect()
    }

    /// Tasks of a list in insertion order.
    pub fn tasks_in(&self, list: &str) -> Vec<&Task> {
        self.lists
            .get(list)
            .map(|l| l.tasks.iter().filter_map(|id| self.tasks.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn subtasks_of(&self, parent: TaskId) -> Vec<&Task> {
        let Some(list) = self.tasks.get(&parent).map(|t| t.list.as_str()) else {
            return Vec::new();
        };
        self.tasks_in(list)
            .into_iter()
            .filter(|t| t.parent == Some(parent))
            .collect()
    }

    /// First task of `list` titled `title`.
    pub fn find_by_title(&self, list: &str, title: &str) -> Option<&Task> {
        self.tasks_in(list).into_iter().find(|t| t.title == title)
    }

    pub fn has_subtasks(&self, id: TaskId) -> bool {
        self.tasks.values().any(|t| t.parent == Some(id))
    }

    /// Subtasks nest one level deep: a parent is never a subtask itself.
    pub fn can_be_parent(&self, id: TaskId) -> bool {
        self.tasks.get(&id).is_some_and(|t| !t.is_subtask())
    }

    /// Title written after `+` for this task, if it is a subtask.
    pub fn parent_title<'a>(&'a self, task: &'a Task) -> Option<&'a str> {
        match task.parent.and_then(|id| self.tasks.get(&id)) {
            Some(parent) => Some(parent.title.as_str()),
            None => task.pending_parent.as_deref(),
        }
    }

    // --- Lists ---

    /// Returns true when the list did not exist before.
    pub fn ensure_list(&mut self, name: &str) -> bool {
        if self.lists.contains_key(name) {
            return false;
        }
        self.lists.insert(name.to_string(), TaskList::new(name));
        true
    }

    pub fn rename_list(&mut self, old: &str, new: &str) -> Option<&TaskList> {
        if old != new && self.lists.contains_key(new) {
            return None;
        }
        let mut list = self.lists.remove(old)?;
        list.name = new.to_string();
        for id in &list.tasks {
            if let Some(task) = self.tasks.get_mut(id) {
                task.list = new.to_string();
            }
        }
        self.lists.insert(new.to_string(), list);
        self.lists.get(new)
    }

    /// Removes a list together with every task it holds.
    pub fn remove_list(&mut self, name: &str) -> Option<(TaskList, Vec<Task>)> {
        let list = self.lists.remove(name)?;
        let tasks = list
            .tasks
            .iter()
            .filter_map(|id| self.tasks.remove(id))
            .collect();
        Some((list, tasks))
    }

    // --- Tasks ---

    fn push_task(&mut self, task: Task) -> TaskId {
        let id = task.id;
        self.ensure_list(&task.list);
        if let Some(list) = self.lists.get_mut(&task.list) {
            list.tasks.push(id);
        }
        self.tasks.insert(id, task);
        id
    }

    /// Inserts a task, creating its list if needed, and links it with any
    /// subtask waiting for its title.
    pub fn insert_task(&mut self, task: Task) -> TaskId {
        let id = self.push_task(task);
        self.resolve_pending_for(id);
        self.adopt_waiting_children(id);
        id
    }

    /// Replaces the stored task with the same id. Returns the previous value.
    pub fn update_task(&mut self, task: Task) -> Option<Task> {
        let id = task.id;
        let old = self.tasks.get(&id)?.clone();

        if old.list != task.list {
            if let Some(list) = self.lists.get_mut(&old.list) {
                list.tasks.retain(|t| *t != id);
            }
            self.ensure_list(&task.list);
            if let Some(list) = self.lists.get_mut(&task.list) {
                list.tasks.push(id);
            }
            // Children left behind lose their parent.
            for child in self.tasks.values_mut() {
                if child.parent == Some(id) && child.list == old.list {
                    child.parent = None;
                }
            }
        }

        let mut task = task;
        if let Some(parent) = task.parent
            && (parent == id
                || !self.can_be_parent(parent)
                || self.has_subtasks(id)
                || self.tasks.get(&parent).is_none_or(|p| p.list != task.list))
        {
            task.parent = None;
        }
        self.tasks.insert(id, task);

        self.resolve_pending_for(id);
        self.adopt_waiting_children(id);
        Some(old)
    }

    /// Removes a task. Its subtasks stay, detached from it.
    pub fn remove_task(&mut self, id: TaskId) -> Option<Task> {
        let task = self.tasks.remove(&id)?;
        if let Some(list) = self.lists.get_mut(&task.list) {
            list.tasks.retain(|t| *t != id);
        }
        for child in self.tasks.values_mut() {
            if child.parent == Some(id) {
                child.parent = None;
            }
        }
        Some(task)
    }

    // --- Parent linking ---

    /// First task titled `title` in `list` that may take `child` under it.
    /// `None` when the link would create a second level or a cycle.
    fn parent_candidate(&self, list: &str, title: &str, child: TaskId) -> Option<TaskId> {
        if self.has_subtasks(child) {
            return None;
        }
        self.tasks_in(list)
            .into_iter()
            .find(|t| t.title == title && t.id != child && !t.is_subtask())
            .map(|t| t.id)
    }

    /// Links every pending subtask whose parent title now has a match.
    pub fn resolve_pending(&mut self) {
        let ids: Vec<TaskId> = self
            .lists
            .values()
            .flat_map(|l| l.tasks.iter().copied())
            .collect();
        for id in ids {
            self.resolve_pending_for(id);
        }
    }

    fn resolve_pending_for(&mut self, id: TaskId) {
        let Some((list, title)) = self
            .tasks
            .get(&id)
            .and_then(|t| Some((t.list.clone(), t.pending_parent.clone()?)))
        else {
            return;
        };
        if let Some(parent) = self.parent_candidate(&list, &title, id)
            && let Some(task) = self.tasks.get_mut(&id)
        {
            log::debug!("Linked '{}' under '{}' in list '{}'", task.title, title, list);
            task.parent = Some(parent);
            task.pending_parent = None;
        }
    }

    fn adopt_waiting_children(&mut self, parent: TaskId) {
        let Some((list, title)) = self
            .tasks
            .get(&parent)
            .filter(|t| !t.is_subtask())
            .map(|t| (t.list.clone(), t.title.clone()))
        else {
            return;
        };
        let waiting: Vec<TaskId> = self
            .tasks
            .values()
            .filter(|c| {
                c.id != parent
                    && c.list == list
                    && c.pending_parent.as_deref() == Some(title.as_str())
            })
            .map(|c| c.id)
            .collect();
        for id in waiting {
            if self.has_subtasks(id) {
                continue;
            }
            if let Some(child) = self.tasks.get_mut(&id) {
                child.parent = Some(parent);
                child.pending_parent = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::parser::parse_line;

    fn load(text: &str) -> TaskStore {
        TaskStore::from_lines(text.lines().filter_map(|l| parse_line(l).ok().flatten()))
    }

    #[test]
    fn test_two_pass_links_parent_declared_later() {
        let store = load("Call mom @Personal +Family\nFamily @Personal\n");
        let child = store.find_by_title("Personal", "Call mom").unwrap();
        let parent = store.find_by_title("Personal", "Family").unwrap();
        assert_eq!(child.parent, Some(parent.id));
        assert_eq!(child.pending_parent, None);
        assert_eq!(store.subtasks_of(parent.id).len(), 1);
    }

    #[test]
    fn test_parent_must_share_the_list() {
        let store = load("Family @Home\nCall mom @Personal +Family\n");
        let child = store.find_by_title("Personal", "Call mom").unwrap();
        assert_eq!(child.parent, None);
        assert_eq!(child.pending_parent.as_deref(), Some("Family"));
        assert_eq!(store.parent_title(child), Some("Family"));
    }

    #[test]
    fn test_pending_child_adopted_on_insert() {
        let mut store = load("Call mom @Personal +Family\n");
        let child_id = store.find_by_title("Personal", "Call mom").unwrap().id;

        let parent_id = store.insert_task(Task::new("Family", "Personal"));
        assert_eq!(store.task(child_id).unwrap().parent, Some(parent_id));
    }

    #[test]
    fn test_same_title_in_two_lists_stays_distinct() {
        let store = load("Groceries @Home\nGroceries @Work\n");
        assert_eq!(store.task_count(), 2);
        let home = store.find_by_title("Home", "Groceries").unwrap();
        let work = store.find_by_title("Work", "Groceries").unwrap();
        assert_ne!(home.id, work.id);
    }

    #[test]
    fn test_remove_list_drops_its_tasks() {
        let mut store = load("@Empty\nA @Home\nB @Home\nC @Work\n");
        let (list, tasks) = store.remove_list("Home").unwrap();
        assert_eq!(list.name, "Home");
        assert_eq!(tasks.len(), 2);
        assert_eq!(store.task_count(), 1);
        assert!(store.has_list("Empty"));
        assert!(!store.has_list("Home"));
    }

    #[test]
    fn test_remove_parent_detaches_children() {
        let mut store = load("Family @Personal\nCall mom @Personal +Family\n");
        let parent = store.find_by_title("Personal", "Family").unwrap().id;
        store.remove_task(parent).unwrap();
        let child = store.find_by_title("Personal", "Call mom").unwrap();
        assert!(!child.is_subtask());
    }

    #[test]
    fn test_rename_list_moves_tasks() {
        let mut store = load("A @Home\n");
        assert!(store.rename_list("Home", "House").is_some());
        assert_eq!(store.tasks_in("House")[0].list, "House");
        assert!(store.tasks_in("Home").is_empty());

        store.ensure_list("Work");
        assert!(store.rename_list("House", "Work").is_none());
    }

    #[test]
    fn test_moving_task_detaches_children_left_behind() {
        let mut store = load("Family @Personal\nCall mom @Personal +Family\n");
        let mut parent = store.find_by_title("Personal", "Family").unwrap().clone();
        parent.list = "Archive".to_string();
        store.update_task(parent.clone()).unwrap();

        assert!(store.has_list("Archive"));
        assert_eq!(store.tasks_in("Personal").len(), 1);
        assert_eq!(store.tasks_in("Personal")[0].parent, None);
        assert_eq!(store.task(parent.id).unwrap().list, "Archive");
    }

    #[test]
    fn test_mutual_parents_do_not_form_a_cycle() {
        let store = load("A @L +B\nB @L +A\n");
        let a = store.find_by_title("L", "A").unwrap();
        let b = store.find_by_title("L", "B").unwrap();
        assert_eq!(a.parent, None);
        assert_eq!(b.parent, None);
        // Both keep their parent title for the next write.
        assert_eq!(store.parent_title(a), Some("B"));
        assert_eq!(store.parent_title(b), Some("A"));
    }

    #[test]
    fn test_subtasks_nest_one_level() {
        let store = load("A @L\nB @L +A\nC @L +B\n");
        let a = store.find_by_title("L", "A").unwrap().id;
        let b = store.find_by_title("L", "B").unwrap();
        let c = store.find_by_title("L", "C").unwrap();
        assert_eq!(b.parent, Some(a));
        assert_eq!(c.parent, None);
        assert_eq!(c.pending_parent.as_deref(), Some("B"));
        assert!(store.subtasks_of(b.id).is_empty());
    }

    #[test]
    fn test_update_cannot_point_parent_at_its_child() {
        let mut store = load("Family @Personal\nCall mom @Personal +Family\n");
        let child = store.find_by_title("Personal", "Call mom").unwrap().id;
        let mut parent = store.find_by_title("Personal", "Family").unwrap().clone();
        parent.parent = Some(child);
        store.update_task(parent.clone()).unwrap();

        assert_eq!(store.task(parent.id).unwrap().parent, None);
        assert_eq!(store.task(child).unwrap().parent, Some(parent.id));
    }

    #[test]
    fn test_rename_adopts_waiting_children() {
        let mut store = load("Fam @Personal\nCall mom @Personal +Family\n");
        let mut parent = store.find_by_title("Personal", "Fam").unwrap().clone();
        parent.title = "Family".to_string();
        store.update_task(parent.clone()).unwrap();

        let child = store.find_by_title("Personal", "Call mom").unwrap();
        assert_eq!(child.parent, Some(parent.id));
    }
}
