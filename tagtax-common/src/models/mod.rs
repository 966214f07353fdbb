//! Ledger record types
//!
//! One module per pipeline area. Every record that lives in a keyed ledger
//! implements [`crate::ledger::LedgerRecord`].

pub mod blacklist;
pub mod styles;
pub mod tags;
pub mod taxonomy;

pub use blacklist::BlacklistFile;
pub use styles::{CanonicalStyleEntry, RawStyleEntry, StyleAction, StyleHierarchyEntry};
pub use tags::{
    BlacklistCandidate, Bucket, CompoundTagEntry, NormalizedTagEntry, PostprocessedTagEntry,
    RawTagRecord, RemovedTagRecord, SegmentKind, TagSegment,
};
pub use taxonomy::{
    FinalMapping, GenreSummaryEntry, StyleTaxonomyEntry, SubgenreRecord, TagStyleMapEntry,
    TaxonomyKind,
};
