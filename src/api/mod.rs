pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::*;
pub use routes::*;
