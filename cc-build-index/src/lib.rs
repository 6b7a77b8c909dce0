//! cc-build-index
//! ==============
//!
//! The dependency index: a mapping from header include path to the build
//! label(s) that resolve it, with explicit support for ambiguous mappings
//! either within one module or spanning repos.

#![forbid(unsafe_code)]

mod index;
mod label;

pub use index::{
    encode, parse_full, parse_unique, AmbiguousDependencyIndex, AmbiguousTargets,
    FullDependencyIndex, IndexError, UniqueDependencyIndex,
};
pub use label::Label;
