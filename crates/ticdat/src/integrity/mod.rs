//! Integrity checks: data types, row predicates, foreign keys and duplicates.

mod checker;
mod report;

pub use checker::IntegrityChecker;
pub use report::{
    DataTypeFailure, DataTypeFailures, DuplicateReport, Finding, FindingKind, ForeignKeyFailure,
    ForeignKeyFailures, IntegrityReport, RowPredicateFailures, Severity,
};
