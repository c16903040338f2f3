// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mneme: long-term memory for a conversational agent.
//!
//! [`MemoryPipeline`] wires the retrieval scorer, turn recorder, pooling
//! committer, persona seeder and admission guard over one SQLite database.
//! Every operation degrades instead of failing: a broken store yields empty
//! context and a failed write is logged and reported in the outcome.

pub mod pipeline;
pub mod telemetry;

pub use pipeline::{MemoryPipeline, PurgeReport, TurnContext, TurnSummary};
pub use telemetry::init_tracing;

pub use mneme_admission::{
    AdmissionDecision, ApprovalHook, ApprovalRequest, IngestSource, RejectReason, SourceKind,
    Verdict,
};
pub use mneme_config::{MnemeConfig, load_and_validate};
pub use mneme_core::types::Collection;
pub use mneme_core::{Classifier, Clock, EmbeddingProvider, MnemeError, VectorStore};
pub use mneme_memory::{
    ConversationSession, PersonaEntry, PoolOutcome, RecordOutcome, RetrievalStats, SeedMode,
    SeedReport, TurnPair,
};
