//! Lazy streaming pipelines built from threads connected by hand-off channels.
//!
//! A [`Stream`] is a single-producer, single-consumer channel of typed values with an
//! explicit end. [`producer`]s turn in-memory collections into Streams, [`stage`]
//! operators turn one Stream into another on a dedicated thread each, and a
//! [`Pipeline`] ties a chain of stages together and drains the result.
//!
//! Stage outputs are unbuffered by default, so a slow consumer stalls every stage
//! upstream of it.
//!
//! ```rust,no_run
//! use conflux_stream::{Pipeline, producer::from_sequence, stage::{filter, transform}};
//!
//! let words = vec!["hello", "everyone", "world", "goodness", "gracious"];
//! let mut pipeline = Pipeline::new(from_sequence(words), |s| {
//!     let long = filter(s, |w: &&str| w.len() > 5);
//!     transform(long, str::to_uppercase)
//! });
//! assert_eq!(pipeline.collect(), vec!["EVERYONE", "GOODNESS", "GRACIOUS"]);
//! ```

pub mod entry;
pub mod options;
pub mod pipeline;
pub mod producer;
pub mod stage;
pub mod stream;

pub use entry::Entry;
pub use options::StreamOptions;
pub use pipeline::Pipeline;
pub use stream::{Stream, StreamId, StreamWriter};
