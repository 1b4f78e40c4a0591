//! Production adapters behind the outbound ports.

pub mod chain;
pub mod http;
pub mod sqlite;
