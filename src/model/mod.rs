pub mod repository;
pub mod rules;
pub mod schema;
pub mod task;

pub use repository::*;
pub use rules::*;
pub use schema::*;
pub use task::*;
