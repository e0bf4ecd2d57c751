// ============================================================================
//  CLEAN MODULE BOUNDARIES
// ============================================================================

//! Core domain layer for Stencil.
//!
//! This module contains pure business logic with ZERO I/O.
//! All filesystem, vault, and event concerns are handled via ports (traits)
//! defined in the application layer.
//!
//! ## Hexagonal Architecture Compliance
//!
//! - **No async**: Domain logic is synchronous
//! - **No I/O**: No filesystem, network, or external calls
//! - **Lexical paths only**: `path_guard` never resolves symlinks
//! - **Immutable entities**: Recorded operations are never mutated
//! - **Rich domain model**: Invariants live in entities, not services
//!
// Public API - what the world sees
pub mod entities;
pub mod error;
pub mod path_guard;
pub mod value_objects;

// Re-exports for convenience
pub use entities::{
    operation::{BackupRecord, Operation},
    plan::{BatchPlan, DirToCreate, FileToWrite, PlanEntry},
};

pub use error::{DomainError, ErrorCategory};

pub use value_objects::{BackupKind, BatchId, Digest, OperationKind};
