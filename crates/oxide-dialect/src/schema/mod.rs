//! Declared schema model: tables, columns, indices and sequences.
//!
//! Objects are built once and then treated as immutable; changing a column
//! means swapping a new value into its table.

mod column;
mod index;
mod sequence;
mod table;

pub use column::{Column, ColumnDefault, Reference, ReferenceAction};
pub use index::Index;
pub use sequence::Sequence;
pub use table::{CheckConstraint, ForeignKey, PrimaryKey, Table};
