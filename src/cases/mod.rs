// src/cases/mod.rs

//! Where test cases come from.
//!
//! The orchestrator only sees the [`CaseStore`] trait. The binary uses
//! [`FsCaseStore`], which reads one JSON file per source from a local
//! directory; tests plug in an in-memory store.

pub mod key;
pub mod store;

use std::path::Path;

use crate::errors::RunFailure;
use crate::types::TestCase;

pub use key::{CaseKey, CaseKeyPattern};
pub use store::FsCaseStore;

pub trait CaseStore: Send + Sync {
    /// Cases for `source`: examples first (in order), the main case last.
    ///
    /// Fails with [`RunFailure::InputUnavailable`] when no main case can be
    /// produced.
    fn load(&self, source: &Path) -> Result<Vec<TestCase>, RunFailure>;

    /// Grouping key used by directory summaries (e.g. the year).
    fn group_of(&self, _source: &Path) -> Option<String> {
        None
    }
}
