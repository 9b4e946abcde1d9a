//! Comment channel factory and handles.

use super::types::Comment;
use tokio::sync::mpsc;

/// Default buffer size for the comment channel.
///
/// Comments arrive at human pace, so a small buffer is enough to absorb
/// bursts while keeping the producer's backpressure visible.
pub const DEFAULT_CHANNEL_BUFFER: usize = 64;

/// Sender handle for comments, owned by the producer.
pub type CommentSender = mpsc::Sender<Comment>;
/// Receiver handle for comments, owned by the consumer.
pub type CommentReceiver = mpsc::Receiver<Comment>;

/// Create a new comment channel.
///
/// A zero capacity is bumped to one since `mpsc::channel` rejects it.
pub fn comment_channel(buffer: usize) -> (CommentSender, CommentReceiver) {
    mpsc::channel(buffer.max(1))
}
