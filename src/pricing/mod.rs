//! Pure price computation over route segment pricing rules

pub mod calculator;

pub use calculator::{deal_probability, quote_total, segment_total};
