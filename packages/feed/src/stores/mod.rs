//! [`crate::IncidentStore`] implementations.

pub mod memory;
pub mod postgres;
