//! Data sources and batch delivery
//!
//! Recorded driving sessions arrive as frame sources (one per session file),
//! each carrying named datasets, steering targets, and a fixed train/test
//! split. `BatchFlow` stitches the valid sources into shuffled batches.

mod flow;
mod memory;
mod source;

pub use flow::{BatchFlow, SourceSet};
pub use memory::MemorySource;
pub use source::{
    filter_valid_pairs, filter_valid_sources, ChannelPolicy, FrameSource, Split,
};
