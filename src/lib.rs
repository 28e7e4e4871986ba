//! postboard: scheduling and calendar engine for a LinkedIn content dashboard.
//!
//! The crate is layered the usual way: `domain` holds the post lifecycle rules,
//! `application` the calendar grid, filtering and the create/edit workflow,
//! `infra` the HTTP collaborators, session and telemetry, and `config` the
//! layered settings used by the `postboard` binary.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod util;

pub use postboard_api_types as api_types;
