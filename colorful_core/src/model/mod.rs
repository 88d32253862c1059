//! Category model: prototypes keyed by name plus their parameter invariants.

pub mod category;
pub mod table;

pub use category::{border_change, Borders, Category, LINEAR_MAX, MAX_HUE_RADIUS, MIN_RADIUS};
pub use table::CategoryModel;
