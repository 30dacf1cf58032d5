//! Database utilities for the writer directory.
//!
//! - [`connection::connect_sqlite`] applies WAL, foreign_keys=ON, and a 5000ms busy_timeout.
//! - [`migrate::run_sqlite`] applies the embedded Diesel migrations.
//!
//! Example:
//! ```no_run
//! use daily_views::db::{connection, migrate};
//!
//! let db_path = std::env::temp_dir().join("writers_example.db");
//! migrate::run_sqlite(db_path.to_str().unwrap()).expect("migrations");
//! let _conn = connection::connect_sqlite(db_path.to_str().unwrap()).expect("connect");
//! ```

pub mod connection;
pub mod migrate;
