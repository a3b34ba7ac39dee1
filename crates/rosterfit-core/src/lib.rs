//! # rosterfit-core
//!
//! The deterministic staffing engine for rosterfit - THE LOGIC.
//!
//! Given a roster of people with weekly booked hours, this crate answers:
//! how much capacity does each person have over a project's weeks, who best
//! fits each role the project needs, and how do commitments made for one
//! project change the picture for the next.
//!
//! ## Components
//!
//! - `ingestor` → Roster Loader (workbook sheets to a typed `Roster`)
//! - `capacity` → Capacity Calculator
//! - `ranker` → Fit Ranker
//! - `ledger` → Allocation Ledger
//! - `session` → per-project lifecycle over one loaded roster
//! - `export` → Result Exporter (CSV)
//!
//! ## Architectural Constraints
//!
//! - The loaded roster is read-only; ledger adjustments go to working copies
//! - Deterministic: BTreeMap ordering, stable sorts, no randomness
//! - Has NO async, NO network dependencies (pure Rust)
//! - Nothing is persisted; a `Session` lives as long as its caller keeps it

// =============================================================================
// MODULES
// =============================================================================

pub mod calendar;
pub mod capacity;
pub mod export;
pub mod ingestor;
pub mod ledger;
pub mod primitives;
pub mod ranker;
pub mod roster;
pub mod session;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{Person, RosterFitError};

// =============================================================================
// RE-EXPORTS: Staffing Engine
// =============================================================================

pub use calendar::WeekRange;
pub use capacity::{CapacityCalculator, CapacityRow, CapacitySnapshot};
pub use export::{ExportRecord, Pool, collect_records, export_csv, export_filename};
pub use ingestor::{LoadedRoster, LoaderConfig, RosterFingerprint, RosterLoader, Sheet, Workbook};
pub use ledger::{AllocationLedger, ProjectAllocation};
pub use ranker::{Candidate, FitRanker, RoleRanking, Shortlist};
pub use roster::Roster;
pub use session::{
    Comparison, ProjectParams, ProjectRanking, ProjectSlot, ResizePreview, RoleProjection,
    Selection, Session, SessionConfig, SlotState,
};
