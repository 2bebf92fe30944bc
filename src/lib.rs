//! Order-preserving batch execution for PostgreSQL.
//!
//! A [`Batch`] queues statements and their arguments. Sending it writes every
//! statement before reading any response; the returned `BatchResults` hands
//! the results back in queue order.
//!
//! # Features
//!
//! - **Two strategies**: [`BatchMode::Pipeline`] sends one exchange per
//!   statement, so a failing statement leaves the others intact;
//!   [`BatchMode::Simple`] ends the batch with a single Sync and the server
//!   runs it as one implicit transaction
//! - **Sans-I/O state machines**: Protocol logic is separated from I/O
//! - **Sync and async APIs**: Choose between synchronous and tokio-based async
//! - **Tracing hooks**: a [`BatchTracer`] sees every queued statement exactly once
//!
//! Connections are created from an established, authenticated stream; startup
//! and authentication are out of scope.
//!
//! # Example
//!
//! ```no_run
//! use std::net::TcpStream;
//!
//! use pgbatch::sync::Conn;
//! use pgbatch::{Batch, Opts};
//!
//! fn run(stream: TcpStream) -> pgbatch::Result<()> {
//!     let mut conn = Conn::new_with_stream(stream, Opts::default());
//!
//!     let mut batch = Batch::new();
//!     batch.queue("INSERT INTO t (id) VALUES ($1)", (1i32,));
//!     batch.queue("SELECT id FROM t", ());
//!
//!     let mut results = conn.send_batch(batch)?;
//!     let inserted = results.exec()?;
//!     assert_eq!(inserted.rows_affected(), 1);
//!     let ids: Vec<(i32,)> = results.query()?.collect()?;
//!     println!("ids: {:?}", ids);
//!     results.close()
//! }
//! ```

pub mod batch;
pub mod buffer_set;
pub mod command_tag;
pub mod conversion;
pub mod error;
pub mod opts;
pub mod protocol;
pub mod row;
pub mod state;
pub mod statement;
pub mod trace;

#[cfg(feature = "sync")]
pub mod sync;

#[cfg(feature = "tokio")]
pub mod tokio;

pub use batch::{Batch, BatchItem};
pub use buffer_set::BufferSet;
pub use command_tag::CommandTag;
pub use conversion::{FromRow, FromWireValue, ToParams, Value};
pub use error::{Error, ErrorFields, Result};
pub use opts::{BatchMode, Opts};
pub use protocol::types::{FormatCode, Oid, TransactionStatus};
pub use row::{Column, Row};
pub use state::BatchState;
pub use statement::PreparedStatement;
pub use trace::{BatchTracer, LogBatchTracer, TraceBatchEndData, TraceBatchQueryData};
