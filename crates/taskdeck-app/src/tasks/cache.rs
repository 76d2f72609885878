/*
[INPUT]:  Cached task list and one change event
[OUTPUT]: Updated cache plus what the event did to it
[POS]:    Application layer - single reconciliation point for the task cache
[UPDATE]: When change event semantics change
*/

use taskdeck_adapter::{ChangeEvent, Task};

/// What [`reconcile`] did with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    Prepended,
    Replaced,
    Removed,
    Ignored,
}

/// Apply one change to the cache.
///
/// Inserts go to the front; an insert for an id already cached replaces it,
/// so a row is never listed twice. Updates and deletes for unknown ids are
/// no-ops.
pub fn reconcile(tasks: &mut Vec<Task>, event: &ChangeEvent) -> Reconciled {
    let position = tasks.iter().position(|task| task.id == event.id());
    match (event, position) {
        (ChangeEvent::Insert(task) | ChangeEvent::Update(task), Some(index)) => {
            tasks[index] = task.clone();
            Reconciled::Replaced
        }
        (ChangeEvent::Insert(task), None) => {
            tasks.insert(0, task.clone());
            Reconciled::Prepended
        }
        (ChangeEvent::Delete { .. }, Some(index)) => {
            tasks.remove(index);
            Reconciled::Removed
        }
        (ChangeEvent::Update(_) | ChangeEvent::Delete { .. }, None) => Reconciled::Ignored,
    }
}
