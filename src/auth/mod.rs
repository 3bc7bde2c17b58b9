//! Challenge parsing, signature verification, token generation, and
//! request extractors.

pub mod challenge;
pub mod extract;
pub mod token;
