//! Taxonomy tree and category matching

mod matcher;
mod tree;

pub use matcher::{DEFAULT_CUTOFF, TaxonomyMatcher, UNCATEGORIZED, is_valid_candidate};
pub use tree::{PATH_SEPARATOR, TaxonomyTree};
