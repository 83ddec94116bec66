//! Key hashing for segment assignment.
//!
//! Key hashers turn the canonical byte form of a key into a 64-bit hash;
//! [`SegmentHasher`] normalizes that hash and maps it onto a fixed number of
//! segments.

pub mod segment;
pub mod sip;
pub mod traits;
pub mod xxh3;

pub use segment::SegmentHasher;
pub use sip::SipKeyHasher;
pub use traits::{HashFunction, KeyHasher};
pub use xxh3::Xxh3KeyHasher;
