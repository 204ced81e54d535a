//! # API Shared
//!
//! Shared wire types for the referrals API.
//!
//! Contains:
//! - Problem bodies returned for every failed request ([`ProblemDetails`])
//! - Shared services like [`HealthService`]
//!
//! Kept free of any HTTP framework so that other transports can reuse the same bodies.

pub mod health;
pub mod problem;

pub use health::{HealthRes, HealthService};
pub use problem::{ProblemDetails, ValidationErrorRes};
