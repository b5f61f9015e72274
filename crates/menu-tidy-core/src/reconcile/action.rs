use crate::model::{FolderPath, ItemMetadata};
use std::fmt;

/// One filesystem change planned by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Move {
        item: String,
        from: FolderPath,
        to: FolderPath,
    },
    Recreate {
        item: String,
        folder: FolderPath,
        metadata: ItemMetadata,
    },
    /// Move an unknown item into the quarantine folder, renamed when its
    /// name is already taken there.
    Quarantine {
        item: String,
        from: FolderPath,
        to: FolderPath,
        rename_to: Option<String>,
    },
    DeleteDuplicate {
        item: String,
        folder: FolderPath,
    },
    DeleteEmptyFolder {
        folder: FolderPath,
    },
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Move { .. } => "Move",
            Action::Recreate { .. } => "Recreate",
            Action::Quarantine { .. } => "Quarantine",
            Action::DeleteDuplicate { .. } => "DeleteDuplicate",
            Action::DeleteEmptyFolder { .. } => "DeleteEmptyFolder",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Move { item, from, to } => write!(f, "move '{}' from {} to {}", item, from, to),
            Action::Recreate { item, folder, .. } => write!(f, "recreate '{}' in {}", item, folder),
            Action::Quarantine {
                item,
                from,
                to,
                rename_to,
            } => match rename_to {
                Some(new_name) => write!(f, "quarantine '{}' from {} to {} as '{}'", item, from, to, new_name),
                None => write!(f, "quarantine '{}' from {} to {}", item, from, to),
            },
            Action::DeleteDuplicate { item, folder } => {
                write!(f, "delete duplicate '{}' in {}", item, folder)
            }
            Action::DeleteEmptyFolder { folder } => write!(f, "delete empty folder {}", folder),
        }
    }
}

/// Informational findings that do not produce actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanNote {
    /// The same item name is configured in several folders; the first wins.
    AmbiguousConfig {
        key: String,
        kept: FolderPath,
        ignored: FolderPath,
    },
    /// Several observed items matched one configured entry.
    DuplicateResolved {
        key: String,
        kept: FolderPath,
        copies: usize,
    },
    /// A configured item is absent and has no target to recreate it from.
    MissingWithoutMetadata { item: String, folder: FolderPath },
}

impl fmt::Display for PlanNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanNote::AmbiguousConfig { key, kept, ignored } => write!(
                f,
                "'{}' is configured in both {} and {}; using {}",
                key, kept, ignored, kept
            ),
            PlanNote::DuplicateResolved { key, kept, copies } => {
                write!(f, "{} copies of '{}' found; keeping the one in {}", copies, key, kept)
            }
            PlanNote::MissingWithoutMetadata { item, folder } => {
                write!(f, "'{}' is missing from {} and cannot be recreated", item, folder)
            }
        }
    }
}

/// Reconciler output, grouped in execution phase order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub moves: Vec<Action>,
    pub recreations: Vec<Action>,
    pub quarantines: Vec<Action>,
    pub duplicate_deletes: Vec<Action>,
    pub empty_folder_deletes: Vec<Action>,
    pub notes: Vec<PlanNote>,
}

impl Plan {
    /// Actions in the order the executor applies them.
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.moves
            .iter()
            .chain(&self.recreations)
            .chain(&self.quarantines)
            .chain(&self.duplicate_deletes)
            .chain(&self.empty_folder_deletes)
    }

    pub fn len(&self) -> usize {
        self.moves.len()
            + self.recreations.len()
            + self.quarantines.len()
            + self.duplicate_deletes.len()
            + self.empty_folder_deletes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
