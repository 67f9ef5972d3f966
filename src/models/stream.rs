//! Reassembly of newline-delimited JSON streams
//!
//! A streamed backend reply is a sequence of JSON objects, one per line,
//! each carrying an incremental text fragment. The body arrives in arbitrary
//! byte chunks, so lines (and multi-byte characters) can be split across
//! chunk boundaries.
//!
//! The pipeline is lazy: [`lines`] turns byte chunks into lines,
//! [`fragment_events`] parses each line independently, and [`reassemble`]
//! folds the events into the final text. A line that fails to parse becomes a
//! [`FragmentEvent::Malformed`] event and the stream carries on.

use crate::models::wire::{BackendChunk, WireShape};
use futures::stream::{self, Stream, StreamExt};
use std::pin::Pin;

/// Longest line preview written to logs for a malformed line
const MALFORMED_PREVIEW_CHARS: usize = 120;

/// One parsed line of a backend stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentEvent {
    /// A text fragment (possibly empty) and whether the backend marked it final
    Fragment { text: String, done: bool },
    /// A line that was not valid JSON for the backend chunk schema
    Malformed { line: String, error: String },
    /// The backend reported an error object mid-stream
    BackendError(String),
}

/// Outcome of folding a fragment stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reassembly {
    /// Concatenation of every fragment, in arrival order
    pub text: String,
    /// Number of lines that carried a fragment
    pub fragments: usize,
    /// Number of lines skipped because they did not parse
    pub skipped: usize,
}

/// Reasons a stream stops before its natural end
#[derive(Debug)]
pub enum StreamFailure<E> {
    /// Reading the body failed
    Transport(E),
    /// The backend sent an error object
    Backend(String),
}

/// Longest line accepted from a backend, newline included
///
/// Longer lines are dropped as they arrive and reported as
/// [`Line::Oversized`], so a body without newlines cannot grow the buffer
/// without bound.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// One line split out of a streamed body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Trimmed, non-empty line text
    Text(String),
    /// A line longer than the limit; only its byte length is kept
    Oversized(usize),
}

struct LineState<S> {
    body: Pin<Box<S>>,
    buf: Vec<u8>,
    /// Prefix of `buf` already known to hold no newline
    scanned: usize,
    /// Bytes dropped so far from the current oversized line
    discarded: usize,
    max_line: usize,
    finished: bool,
}

/// Split a stream of byte chunks into trimmed, non-empty lines
///
/// A trailing line without a terminating newline is still emitted once the
/// body ends. Bytes are buffered until a newline is seen, so UTF-8 sequences
/// split across chunks decode correctly. A transport error is yielded once
/// and ends the stream.
pub fn lines<S, B, E>(body: S) -> impl Stream<Item = Result<Line, E>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    lines_with_limit(body, MAX_LINE_BYTES)
}

/// [`lines`] with an explicit maximum line length
pub fn lines_with_limit<S, B, E>(body: S, max_line: usize) -> impl Stream<Item = Result<Line, E>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    let state = LineState {
        body: Box::pin(body),
        buf: Vec::new(),
        scanned: 0,
        discarded: 0,
        max_line,
        finished: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(offset) = st.buf[st.scanned..].iter().position(|b| *b == b'\n') {
                let pos = st.scanned + offset;
                let rest = st.buf.split_off(pos + 1);
                let line = std::mem::replace(&mut st.buf, rest);
                st.scanned = 0;

                if st.discarded > 0 || line.len() > st.max_line {
                    let total = std::mem::take(&mut st.discarded) + line.len();
                    return Some((Ok(Line::Oversized(total)), st));
                }
                match decode_line(&line) {
                    Some(text) => return Some((Ok(Line::Text(text)), st)),
                    None => continue,
                }
            }
            st.scanned = st.buf.len();

            if st.discarded > 0 || st.buf.len() > st.max_line {
                st.discarded += st.buf.len();
                st.buf.clear();
                st.scanned = 0;
            }

            if st.finished {
                if st.discarded > 0 {
                    let total = std::mem::take(&mut st.discarded);
                    return Some((Ok(Line::Oversized(total)), st));
                }
                if st.buf.is_empty() {
                    return None;
                }
                let line = std::mem::take(&mut st.buf);
                st.scanned = 0;
                match decode_line(&line) {
                    Some(text) => return Some((Ok(Line::Text(text)), st)),
                    None => return None,
                }
            }

            match st.body.next().await {
                Some(Ok(chunk)) => st.buf.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => {
                    st.finished = true;
                    st.buf.clear();
                    st.scanned = 0;
                    st.discarded = 0;
                    return Some((Err(e), st));
                }
                None => st.finished = true,
            }
        }
    })
}

fn decode_line(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse every line of a body into a [`FragmentEvent`] for the given shape
pub fn fragment_events<S, B, E>(
    shape: WireShape,
    body: S,
) -> impl Stream<Item = Result<FragmentEvent, E>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    lines(body).map(move |line| {
        line.map(|line| match line {
            Line::Text(text) => parse_line(shape, text),
            Line::Oversized(len) => FragmentEvent::Malformed {
                line: format!("<{} bytes>", len),
                error: format!("line exceeds {} bytes", MAX_LINE_BYTES),
            },
        })
    })
}

/// Parse a single line into a [`FragmentEvent`]
pub fn parse_line(shape: WireShape, line: String) -> FragmentEvent {
    match serde_json::from_str::<BackendChunk>(&line) {
        Ok(chunk) => {
            if let Some(message) = chunk.error {
                return FragmentEvent::BackendError(message);
            }
            FragmentEvent::Fragment {
                text: shape.fragment(&chunk).unwrap_or_default().to_string(),
                done: chunk.done,
            }
        }
        Err(e) => FragmentEvent::Malformed {
            line,
            error: e.to_string(),
        },
    }
}

/// Fold a streamed body into the concatenated text
///
/// Malformed lines are logged at debug level and counted, never fatal. A
/// backend error object or a transport failure stops the fold.
pub async fn reassemble<S, B, E>(
    shape: WireShape,
    body: S,
) -> Result<Reassembly, StreamFailure<E>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    let mut events = std::pin::pin!(fragment_events(shape, body));
    let mut out = Reassembly::default();

    while let Some(event) = events.next().await {
        match event.map_err(StreamFailure::Transport)? {
            FragmentEvent::Fragment { text, .. } => {
                out.text.push_str(&text);
                out.fragments += 1;
            }
            FragmentEvent::Malformed { line, error } => {
                out.skipped += 1;
                tracing::debug!(
                    shape = %shape,
                    line_preview = %preview(&line),
                    error = %error,
                    "Skipping malformed stream line"
                );
            }
            FragmentEvent::BackendError(message) => {
                return Err(StreamFailure::Backend(message));
            }
        }
    }

    Ok(out)
}

fn preview(line: &str) -> String {
    if line.chars().count() <= MALFORMED_PREVIEW_CHARS {
        line.to_string()
    } else {
        let cut: String = line.chars().take(MALFORMED_PREVIEW_CHARS).collect();
        format!("{}...", cut)
    }
}
