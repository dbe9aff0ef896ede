//! Business logic services.

pub mod aggregator;
pub mod enrichment;
pub mod matcher;
pub mod trends;
