//! The write-side action vocabulary a [`crate::WritableSource`] accepts.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value::Row;

/// A single mutation requested against a writable source.
///
/// `data` carries action-specific fields as a JSON object so that the
/// same enum serves every writable adapter (sqlite rows, markdown
/// section items) without per-adapter action types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum WriteAction {
    /// Append a new row/item. `data` holds its field values.
    Add { data: Row },
    /// Flip a task item's `done` state. Requires `data.id`.
    Toggle { data: Row },
    /// Remove a row/item. Requires `data.id`.
    Delete { data: Row },
    /// Replace a row/item's fields. Requires `data.id` plus the new
    /// values to apply.
    Update { data: Row },
}

impl WriteAction {
    /// The `data` payload common to every variant.
    pub fn data(&self) -> &Row {
        match self {
            WriteAction::Add { data }
            | WriteAction::Toggle { data }
            | WriteAction::Delete { data }
            | WriteAction::Update { data } => data,
        }
    }

    /// The `id` field of `data`, required by every variant except `add`.
    pub fn id(&self) -> Option<&str> {
        self.data().get("id").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::row_from_pairs;
    use serde_json::json;

    #[test]
    fn toggle_requires_id_field() {
        let action = WriteAction::Toggle { data: row_from_pairs([("id", json!("ab12cd34"))]) };
        assert_eq!(action.id(), Some("ab12cd34"));
    }

    #[test]
    fn add_has_no_id_by_default() {
        let action = WriteAction::Add { data: row_from_pairs([("text", json!("Buy milk"))]) };
        assert_eq!(action.id(), None);
    }
}
