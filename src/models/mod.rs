//! Database-backed domain models.

pub mod list_item;
pub mod price;
pub mod product;
