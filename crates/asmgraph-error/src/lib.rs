//! # asmgraph-error
//!
//! Unified error handling for the asmgraph pipeline.
//!
//! - **ErrorKind**: what went wrong (e.g. `InvalidNodeId`, `UnexpectedClusterEdge`)
//! - **ErrorStatus**: whether retrying can help (`Permanent`, `Temporary`, `Persistent`)
//! - **Context**: the failing operation plus key/value pairs that locate the cause
//! - **Source**: the wrapped lower-level error, when there is one
//!
//! ```rust
//! use asmgraph_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::InvalidNodeId, "unknown tag")
//!         .with_operation("id::decode")
//!         .with_context("text", "widget|A"))
//! }
//! ```
//!
//! Fatal conditions are never coerced into something else: each stage returns
//! `Result<T, asmgraph_error::Error>` and callers only append context.

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using asmgraph Error
pub type Result<T> = std::result::Result<T, Error>;
