//! Core domain types for methods, headers and fixtures.

pub mod fixture;
pub mod headers;
pub mod method;
