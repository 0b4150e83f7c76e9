//! Tracks approved 3GPP change requests that touch a chosen set of clauses
//! of one specification.

pub mod archive;
pub mod config;
pub mod discover;
pub mod error;
pub mod html;
pub mod manifest;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod scratch;
pub mod sink;
pub mod transport;

#[cfg(test)]
mod testutil;

pub use config::{ClauseSet, Settings};
pub use parser::clauses::MatchMode;
pub use pipeline::{Pipeline, ProbeOutcome, RunOutcome};
pub use report::MatchRecord;
pub use sink::{NullSink, PipelineSink, RecordingSink};
pub use transport::{HttpTransport, Transport};
