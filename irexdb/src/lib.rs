//! # irexdb - Embedded Document Store
//!
//! irexdb keeps named collections of JSON-like documents in memory, answers
//! MongoDB-style queries over them and persists every collection to its own
//! newline-delimited JSON datafile.
//!
//! ## Key Features
//!
//! - **Embedded**: runs inside the host process, no server
//! - **Queries**: partial-document queries with `$gt`, `$in`, `$regex`,
//!   `$elemMatch` and the logical keys, or filters built in code
//! - **Persistence**: snapshot or append-log datafiles, flushed immediately,
//!   on an interval or on demand
//! - **Async**: every mutation has a future form and a callback form that
//!   apply in call order
//! - **Value cache**: [cache::ValueCache] memoizes an expensive async value
//!   for a time-to-live with single-flight refresh
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use irexdb::database::Database;
//! use irexdb::doc;
//!
//! let db = Database::builder().path("/var/lib/irex").open()?;
//! let pkgs = db.collection("pkgs")?;
//!
//! pkgs.insert(doc! { "_id": "a", x: 1 })?;
//! pkgs.insert(doc! { "_id": "b", x: 2 })?;
//! let found = pkgs.find(doc! { x: { "$gte": 2 } })?;
//!
//! db.close()?;
//! ```
//!
//! ## Module Organization
//!
//! - [`cache`] - TTL value cache with single-flight refresh
//! - [`collection`] - Documents, collections and their events
//! - [`common`] - Values, constants and shared utilities
//! - [`database`] - The database handle and collection registry
//! - [`database_builder`] - Fluent construction of a database
//! - [`database_config`] - Persistence mode, flush policy and tuning knobs
//! - [`errors`] - Error kinds and the crate result type
//! - [`filter`] - Query parsing and filter providers
//! - [`store`] - Datafile codecs and store providers

pub mod cache;
pub mod collection;
pub mod common;
pub mod database;
pub mod database_builder;
pub mod database_config;
pub mod errors;
pub mod filter;
pub mod store;
