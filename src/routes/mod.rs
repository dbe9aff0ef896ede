//! Route definitions for the PriceCart API.

pub mod catalog;
pub mod health;
pub mod lists;
pub mod matching;
pub mod prices;
pub mod products;
