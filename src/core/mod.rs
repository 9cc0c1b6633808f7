pub mod error;
pub mod record;
pub mod shape;

pub use error::{BindError, Result};
pub use record::{KeyKind, RecordKey, RecordValue, Table};
pub use shape::{ShapeViolation, find_mixed_table, is_well_formed};
