pub mod error;
pub mod record;
pub mod footer;
pub mod io_stream;
pub mod merge;
pub mod split;
mod fsutil;

pub use error::{GlueError, MergeError, SplitError, Result};
pub use record::{FileRecord, RECORD_SIZE};
pub use footer::{Entry, Footer};
pub use io_stream::{ContainerReader, ContainerWriter};
pub use merge::{merge, merge_with_options, MergeOptions};
pub use split::{list, split, split_with_options, SplitOptions};
