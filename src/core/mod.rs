pub mod error;
pub mod node;
pub mod path;
pub mod relpath;

pub use error::*;
pub use node::*;
pub use relpath::{relative_path, relative_path_of, resolve, RelativePathRecord};
