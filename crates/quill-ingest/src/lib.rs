#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod allocate;
mod extract;
mod types;

pub use allocate::allocate;
pub use extract::{ExtractError, ExtractorSet, PlainTextExtractor, TextExtractor};
pub use types::{BudgetAllocation, FileInput, FileStat, PartialFile};
