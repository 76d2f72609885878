/*
[INPUT]:  Task table schema and change feed payloads
[OUTPUT]: Typed Rust structs/enums with serialization support
[POS]:    Data layer - type definitions for backend communication
[UPDATE]: When table schema changes or new types added
*/

pub mod change;
pub mod task;

pub use change::{ChangeEvent, ChangeKind};
pub use task::{NewTask, Task, TaskId, TaskPatch, tasks_from_rows};
