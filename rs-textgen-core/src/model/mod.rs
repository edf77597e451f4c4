//! Top-level module for the text continuation engine.
//!
//! This module provides:
//! - The symbol alphabet (`SymbolVocabulary`)
//! - The scoring input (`ContextWindow`)
//! - Next symbol selection (`SamplingPolicy`)
//! - Goal tracking (`StopConditionEvaluator`)
//! - Request and result types (`GenerationRequest`, `GenerationResult`)
//! - The session driving the loop (`Generator`)
//! - Character n-gram tables used by the bundled scoring oracle

/// Generation session: request queue, oracle acquisition, generation loop and
/// continuity buffer, plus the host-facing operations.
pub mod generator;

/// Request, goal, result and outcome types.
pub mod prediction_input;

/// Fixed alphabet with encode/decode and one-hot helpers.
pub mod vocabulary;

/// Fixed-width sliding window of encoded symbols.
pub mod window;

/// Temperature transform and weighted random choice.
pub mod sampling;

/// Word/sentence/character goal tracking and trailing character rules.
pub mod stop_condition;

/// Multi-order n-gram tables with back-off.
///
/// Supports loading from disk, parallel construction, merging and ranked
/// next-character candidates.
pub mod multigram_model;

/// Fixed-order n-gram table.
pub mod ngram_model;

/// Internal representation of a single n-gram state (prefix).
///
/// Tracks outgoing transitions and ranks them.
/// This module is not exposed publicly.
mod state;
