//! SQL statement building.
//!
//! Turns override tokens into clause groups and splices them into a query
//! template. Values are interpolated verbatim: nothing here escapes quotes or
//! otherwise guards against SQL injection, so inputs must come from a trusted
//! operator.

mod assembler;
mod composer;
mod tokenizer;

pub use assembler::{assemble, strip_unresolved};
pub use composer::{ClauseGroup, MergeMode, StatementComposer};
pub use tokenizer::{parse_condition, Condition, Operator};
