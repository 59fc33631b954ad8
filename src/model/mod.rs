// File: ./src/model/mod.rs
pub mod adapter;
pub mod item;
pub mod parser;

pub use item::{NewTask, Priority, Task, TaskId, TaskList};
pub use parser::{ParsedLine, TaskRecord, TokenKind};
