//! Per-product attribute tables.

pub mod mg100;
