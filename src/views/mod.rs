pub(crate) mod details;
pub(crate) mod home;

use crate::{
    db::Db,
    error::Result,
    types::{Subtask, SubtaskId, SubtaskUpdate, TaskId},
};

pub(crate) enum AppState {
    Home,
    Details(TaskId),
    Exit,
}

/// Flips the completed flag of a subtask. `None` if it no longer exists.
pub(crate) fn toggle_subtask(db: &Db, subtask_id: SubtaskId) -> Result<Option<Subtask>> {
    let Some(subtask) = db.get_subtask(subtask_id)? else {
        return Ok(None);
    };
    let update = SubtaskUpdate {
        completed: Some(!subtask.completed),
        ..Default::default()
    };
    db.update_subtask(subtask_id, &update)
}
