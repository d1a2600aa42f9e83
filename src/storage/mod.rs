pub mod scratch;

pub use scratch::{ScratchProvider, ScratchSpace};
