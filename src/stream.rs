//! Streaming response dispatch.
//!
//! Adapts the chat model's fallible fragment stream into the framed event
//! sequence clients consume. Guarantees, in order:
//!
//! - one [`StreamEvent::Fragment`] per model fragment,
//! - at most one [`StreamEvent::Error`] (the stream stops being pulled
//!   after the first fault),
//! - exactly one trailing [`StreamEvent::Done`], whether the stream
//!   completed or faulted.
//!
//! `Done` is the sole authoritative end-of-stream marker. Dropping the
//! dispatched stream (client disconnect) drops the underlying model
//! stream with it; no further fragments are pulled.

use futures::future;
use futures::stream::{self, Stream, StreamExt};
use tracing::warn;

use anyhow::Result;

/// One framed event in a streamed answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// An incremental piece of the answer text.
    Fragment(String),
    /// A fault description; the answer is truncated at this point.
    Error(String),
    /// Terminal sentinel, always the last event.
    Done,
}

/// Frame a model fragment stream into the guaranteed event sequence.
pub fn dispatch<S>(fragments: S) -> impl Stream<Item = StreamEvent>
where
    S: Stream<Item = Result<String>>,
{
    fragments
        .scan(false, |faulted, item| {
            if *faulted {
                return future::ready(None);
            }
            let event = match item {
                Ok(text) => StreamEvent::Fragment(text),
                Err(e) => {
                    *faulted = true;
                    warn!(error = %e, "model stream faulted mid-answer");
                    StreamEvent::Error(e.to_string())
                }
            };
            future::ready(Some(event))
        })
        .chain(stream::once(future::ready(StreamEvent::Done)))
}
