//! Catalog Module
//!
//! The relational schema mapped onto the document store: databases, their
//! tables, the backend collection behind each table and the declared columns
//! with their document field paths.

pub mod column;
pub mod schema;
pub mod table;

pub use self::column::Column;
pub use self::schema::{Database, Schema, SqlType};
pub use self::table::Table;
