pub mod tracking;
pub mod vast;

pub use vast::{CreativeAssembler, EMPTY_VAST};
