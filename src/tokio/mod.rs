//! Asynchronous batch execution using Tokio.

mod batch_results;
mod conn;
mod rows;
mod stream;
mod wire;

pub use batch_results::{BatchResults, PipelineBatchResults, SimpleBatchResults};
pub use conn::Conn;
pub use rows::{BatchRow, RowStream};
pub use stream::Stream;
