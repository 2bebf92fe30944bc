//! Synchronous batch execution.

mod batch_results;
mod conn;
mod rows;
mod stream;
mod transport;
mod wire;

pub use batch_results::{BatchResults, PipelineBatchResults, SimpleBatchResults};
pub use conn::Conn;
pub use rows::{BatchRow, RowStream};
pub use stream::Stream;
pub use transport::{MultiResultReader, Pipeline, PipelineResult, ResultReader};
pub use wire::{WireMultiResultReader, WirePipeline};
