use uuid::Uuid;

use crate::editing::selection::Selection;

/// Result of a committed operation: which blocks changed, the reconciled
/// selection, and the new document version.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub changed: Vec<Uuid>,
    pub new_selection: Selection,
    pub version: u64,
}
