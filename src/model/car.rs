use serde::{Deserialize, Serialize};

use crate::model::{Id, Model};

/// An individual registered car, identified by its unique number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Car {
    pub id: Id,
    pub number: String,
    pub model: Model,
}

#[derive(Debug, Clone)]
pub struct NewCar {
    pub number: String,
    pub model_id: Id,
}
