pub mod check;
pub mod config;
pub mod last;
pub mod start;
