//! Sans-I/O state machines for batch execution.
//!
//! These handle the protocol logic without performing any I/O. The blocking
//! and tokio drivers move bytes and feed messages in; the machines tell them
//! what to do next through [`Action`] values.

pub mod action;
pub mod batch_read;
pub mod cursor;
pub mod request;
pub mod response;

pub use action::{Action, Output, ResultKind};
pub use batch_read::{BatchReadStateMachine, Goal};
pub use cursor::{BatchCursor, BatchState, QueryTrace};
pub use request::write_batch;
pub use response::{Response, ResponseDecoder};
