//! RowSeq: a positional persistent collection. A table in an embedded
//! relational store behaves like an in-memory ordered sequence — addressable
//! by zero-based position, sliceable, appendable, deletable — while the
//! store itself only sees an unordered table keyed by a surrogate key.
//!
//! The load-bearing invariant is `key == position + 1` with keys forming
//! the contiguous sequence `1..n`. Every cardinality-changing mutation
//! re-establishes it before returning, via a renumbering pass that runs in
//! the same commit unit as the mutation itself.
//!
//! One mutating agent per bound table at a time; see `LengthMode` for the
//! two consistency modes offered to cooperating processes.
#![warn(unreachable_pub)]

pub mod error;
pub mod index;
pub mod length;
pub mod obs;
pub mod row;
pub mod schema;
pub mod session;
pub mod value;

// re-exports
pub use error::Error;
pub use index::Slice;
pub use length::LengthMode;
pub use row::{Row, RowInput};
pub use schema::{Column, ColumnSpec, DataType, DefaultValue, TableSchema};
pub use session::Session;
pub use value::Value;

///
/// Prelude
///
/// Domain vocabulary only; no internals are re-exported here.
///

pub mod prelude {
    pub use crate::{
        error::Error,
        index::Slice,
        length::LengthMode,
        row::{Row, RowInput},
        schema::{Column, ColumnSpec, DataType, DefaultValue},
        session::Session,
        value::Value,
    };
}
