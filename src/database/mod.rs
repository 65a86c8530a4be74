pub mod manager;
pub mod memory;
pub mod models;
pub mod query;
pub mod schema;
pub mod statement;

pub use manager::{DatabaseError, PgSessionFactory};
pub use memory::MemoryStore;
pub use query::{QueryError, QueryResults, QueryService, Session, SessionFactory};
pub use statement::{SqlResult, Statement};
