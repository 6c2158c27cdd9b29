use serde::{Deserialize, Serialize};

use crate::model::Id;

/// A car manufacturer. Deleting a brand cascades to its models and,
/// transitively, to their cars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brand {
    pub id: Id,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct NewBrand {
    pub name: String,
}
