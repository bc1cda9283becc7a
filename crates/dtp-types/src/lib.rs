//! Value types shared by the block-read client and its tools.
//!
//! A [`BlockDescriptor`] is what the naming service hands out for one block:
//! identity, length, access token and the [`Location`]s of its replicas.

#[macro_use]
pub mod strong_type;

pub mod block;
pub mod ids;
pub mod location;

pub use block::{BlockDescriptor, BlockToken};
pub use ids::{BlockId, GenerationStamp};
pub use location::{Location, LocationParseError};
