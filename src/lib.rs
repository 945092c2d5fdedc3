//! Hospital Compare - joins CMS hospital quality and Medicare spending tables
//! into chart-ready views.
//!
//! Every stage is a pure function from dataset(s) to a new dataset; see
//! [`pipeline`] for how they compose into one run.

pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
