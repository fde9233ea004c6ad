//! Integration test suite for the object-model codec.
//!
//! Tests are organized by concern:
//! - codec properties (round-trip, idempotence, elision, references)
//! - collapsing and persisting write plans
//! - schema and configuration loading from files

pub mod codec_properties;
pub mod collapse_tests;
pub mod helpers;
pub mod loading_tests;
