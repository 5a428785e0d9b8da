// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Melody generation round trip.
//!
//! A recording is converted to the service's column payload, posted, and
//! the response is decoded into a fresh log.

pub mod client;
pub mod payload;

pub use client::{GenerationClient, GenerationError};
pub use payload::{from_payload, to_payload, ColumnPayload, PayloadError};
