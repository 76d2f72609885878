/*
[INPUT]:  Task rows, change events, form input and attachments
[OUTPUT]: Task list controller and its building blocks
[POS]:    Application layer - authenticated view logic
[UPDATE]: When task list behavior changes
*/

pub mod attachment;
pub mod cache;
pub mod controller;
pub mod form;

pub use attachment::Attachment;
pub use cache::{Reconciled, reconcile};
pub use controller::{TaskError, TaskListController, TaskListSnapshot, TaskSettings};
pub use form::TaskForm;
