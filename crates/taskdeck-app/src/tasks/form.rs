/*
[INPUT]:  Title, description and attachment path typed by the user
[OUTPUT]: Form state plus the validation used by insert and update
[POS]:    Application layer - task input form
[UPDATE]: When task form fields change
*/

use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskForm {
    pub title: String,
    pub description: String,
    /// File to upload with the next submit
    pub attachment: Option<PathBuf>,
}

impl TaskForm {
    /// Both text fields are non-empty after trimming
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty() && !self.description.trim().is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
