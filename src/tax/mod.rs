//! Tax rate model and calculation

pub mod rate;

pub use rate::*;
