//! Library side of the `bulkedit` binary: logging, stage orchestration and
//! the summary types shared with the binary.

pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod types;
