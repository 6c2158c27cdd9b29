use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::Id;

/// A model category (Sedan, SUV, ...). `models` is the back-reference side
/// of the model↔category association and must stay symmetric with
/// `Model::categories` after every committed operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Id,
    pub name: String,
    pub models: BTreeSet<Id>,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
}
