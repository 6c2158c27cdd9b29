pub mod brand;
pub mod car;
pub mod category;
pub mod common;
pub mod model;

pub use brand::*;
pub use car::*;
pub use category::*;
pub use common::*;
pub use model::*;
