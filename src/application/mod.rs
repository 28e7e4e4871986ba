//! Application layer: calendar grid, filtering, and the create/edit workflow.

pub mod board;
pub mod calendar;
pub mod error;
pub mod filter;
pub mod modal;
pub mod ports;
