#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod archive;
pub mod config;
pub mod core;
pub mod crawl;
pub mod query;
pub mod stats;
pub mod storage;
pub mod vfs;
