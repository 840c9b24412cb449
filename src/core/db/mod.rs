/// Database Module
///
/// The database layer is split into three concerns:
/// - **Connection Management** (`connection.rs`): owns the handle, applies pragmas, scopes transactions
/// - **Schema Introspection** (`schema.rs`): tables, columns and indexes of the live database
/// - **Query Building and Execution** (`query.rs`): parameterized SQL and result shaping
///
/// All database operations return the standardized `VaultError` type.
pub mod connection;
pub mod query;
pub mod schema;

pub use connection::Connection;
pub use query::{Fetch, NamedParams, Outcome, SqlQuery};
pub use schema::{Column, Index};
