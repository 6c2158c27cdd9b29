pub mod catalog;
pub mod conflict;
pub mod links;
pub mod paging;
pub mod sort;
pub mod validate;

pub use catalog::*;
pub use links::*;
pub use paging::*;
pub use sort::*;
