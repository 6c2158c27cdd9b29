/// Surrogate key assigned by the store on insert.
pub type Id = i64;
