//! Local lists kept in step with backend tables.

use crate::prelude::*;

mod list;
mod table;

pub use list::{ListSetter, ListUpdate, SharedList};
pub use table::{TableHandle, TableSync};

/// Caller-side choice to ignore a failed operation. The failure is logged
/// at debug level and the value becomes `None`.
pub trait SwallowFailure<T> {
    fn swallow(self, what: &str) -> Option<T>;
}

impl<T, E: std::fmt::Display> SwallowFailure<T> for std::result::Result<T, E> {
    fn swallow(self, what: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(operation = what, error = %err, "failure ignored");
                None
            }
        }
    }
}
