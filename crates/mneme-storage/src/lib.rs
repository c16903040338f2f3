// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Mneme memory pipeline.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and [`SqliteVectorStore`], a
//! brute-force cosine implementation of the core `VectorStore` trait.

pub mod database;
pub mod migrations;
pub mod vector_store;

pub use database::{Database, map_tr_err};
pub use vector_store::{SqliteVectorStore, blob_to_vec, vec_to_blob};
