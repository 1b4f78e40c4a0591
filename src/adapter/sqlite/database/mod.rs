//! Database plumbing: connection pool, migrations, rows, and schema.

pub mod connection;
pub mod model;
pub mod schema;
