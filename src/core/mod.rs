//! Flattening and parameterization engine

pub mod assembler;
pub mod flattener;
pub mod parameters;
pub mod substitution;

pub use assembler::ReportAssembler;
pub use flattener::{Flattener, SharedStepLookup, Traversal};
pub use substitution::substitute;
