//! Support collections for the allocator core.
//!
//! - `bit_set`: fixed-width bit set with run queries, the primitive every
//!   page's occupancy tracking is built on.

pub mod bit_set;

pub use bit_set::FixedBitSet;
