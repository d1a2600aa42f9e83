pub mod classify;
pub mod materialize;
pub mod split;

pub use classify::ArchiveClassifier;
pub use materialize::ArchiveMaterializer;
pub use split::{split, split_at_existing};
