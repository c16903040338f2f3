// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory retrieval and recording for the Mneme pipeline.
//!
//! ## Architecture
//!
//! - **RetrievalScorer**: persona + episodic query, composite scoring, merged context
//! - **TurnRecorder**: user/assistant turn persistence with dedup and artifact filtering
//! - **PoolCommitter**: consolidates a session's buffered turns into pooled records
//! - **KeywordClassifier**: default tone/tag classifier used for pooled records
//! - **PersonaSeeder**: stable-id persona upserts with merge or replace semantics
//! - **Types**: MemoryRecord, MemoryKind, MemorySource, ScoredCandidate, RecordOutcome

pub mod classifier;
pub mod persona;
pub mod pooling;
pub mod recorder;
pub mod retriever;
pub mod types;

pub use classifier::KeywordClassifier;
pub use persona::{
    PersonaEntry, PersonaSeeder, SeedMode, SeedReport, delete_topic, purge_expired_records,
};
pub use pooling::{ConversationSession, PoolCommitter, PoolOutcome, PoolingBuffer};
pub use recorder::TurnRecorder;
pub use retriever::RetrievalScorer;
pub use types::*;
