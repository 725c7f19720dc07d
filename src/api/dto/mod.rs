//! Data Transfer Objects for REST request/response serialization.
//!
//! Field names are camelCase on the wire, matching the domain types.

pub mod task_dto;
pub mod user_dto;

pub use task_dto::*;
pub use user_dto::*;
