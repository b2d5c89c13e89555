//! Entity to model mappers
//!
//! - `TryFrom<Model>`: convert database rows to domain values
//! - `*Columns` structs: split domain values into parallel arrays for `UNNEST`

mod like;

pub use like::{DeltaColumns, LikeColumns};
