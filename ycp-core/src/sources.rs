//! Comment sources.
//!
//! A source is any `Stream` of comment texts. The stream ending (`None`) is
//! end-of-source; a pending poll means no comment has arrived yet.

use std::pin::Pin;
use std::time::Duration;
use tokio::io::AsyncBufRead;
use tokio_stream::wrappers::LinesStream;
use tokio_stream::{Stream, StreamExt};
use tracing::warn;

/// Boxed comment stream accepted by the ingestion pipeline.
pub type CommentStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Delay between two mock comments.
pub const DEFAULT_PACING: Duration = Duration::from_secs(1);

/// Canned comments replayed when no live source is configured.
pub const MOCK_COMMENTS: &[&str] = &[
    "what the fuck? help me! i am trapped inside a computer.",
    "ww",
    "hh",
    "aa",
    "tt",
    "ww",
    "hh",
    "aa",
    "tt",
    "exit",
];

/// Replay [`MOCK_COMMENTS`] with `pacing` between items.
pub fn mock_comments(pacing: Duration) -> CommentStream {
    from_texts(MOCK_COMMENTS.iter().map(|c| c.to_string()), pacing)
}

/// Replay a fixed list of comments with `pacing` between items.
pub fn from_texts<I>(comments: I, pacing: Duration) -> CommentStream
where
    I: IntoIterator<Item = String>,
    I::IntoIter: Send + 'static,
{
    paced(tokio_stream::iter(comments), pacing)
}

/// One comment per non-blank line of `reader`.
///
/// A read error ends the stream after logging it.
pub fn from_lines<R>(reader: R, pacing: Duration) -> CommentStream
where
    R: AsyncBufRead + Send + 'static,
{
    use tokio::io::AsyncBufReadExt;

    let lines = LinesStream::new(reader.lines())
        .map_while(|line| match line {
            Ok(line) => Some(line),
            Err(e) => {
                warn!(error = %e, "Failed to read comment line, ending source");
                None
            }
        })
        .filter(|line| !line.trim().is_empty());
    paced(lines, pacing)
}

fn paced<S>(stream: S, pacing: Duration) -> CommentStream
where
    S: Stream<Item = String> + Send + 'static,
{
    if pacing.is_zero() {
        Box::pin(stream)
    } else {
        Box::pin(stream.throttle(pacing))
    }
}
