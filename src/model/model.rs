use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::{Brand, Id};

/// A car model. Records returned by the store embed the resolved owning
/// brand so ordering and DTO conversion never chase a dangling id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: Id,
    pub name: String,
    pub brand: Brand,
    pub production_year: i32,
    pub categories: BTreeSet<Id>,
}

/// Insert input; references already resolved to ids.
#[derive(Debug, Clone)]
pub struct NewModel {
    pub name: String,
    pub brand_id: Id,
    pub production_year: i32,
    pub categories: BTreeSet<Id>,
}

/// Composite natural key of a model. Lookups are case-sensitive exact
/// matches on all three parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelKey {
    pub brand: String,
    pub name: String,
    pub production_year: i32,
}
