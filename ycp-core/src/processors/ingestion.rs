//! IngestionPipeline processor.
//!
//! The IngestionPipeline is responsible for:
//! - Running a producer task that forwards source comments into a bounded
//!   channel, in order
//! - Running a consumer task that logs, matches and counts each comment
//! - Racing the consumer against the deadline and the external interrupt
//! - Draining the channel and releasing the producer once the run stops
//!
//! All tasks share one [`StopSignal`]. Whoever triggers it first decides the
//! [`RunOutcome`]; every other task sees the signal and exits without
//! processing further comments.

use crate::comment_log::CommentLog;
use crate::config::RunConfig;
use crate::context::{RunContext, Stats};
use crate::events::{Comment, CommentReceiver, CommentSender, comment_channel};
use crate::processors::matcher::{EventMatcher, TerminalMarker, build_matcher};
use crate::processors::stop_signal::{RunOutcome, StopSignal};
use crate::processors::threshold_engine::{EventDisposition, ThresholdEngine};
use crate::sink::ActionSink;
use crate::store::CounterStore;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinError;
use tokio::time::Instant;
use tokio_stream::{Stream, StreamExt};
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

/// Event line written to the comment log when the terminal comment arrives.
pub const TERMINAL_EVENT: &str = "FINAL_COMMENT detected";

/// Errors that end a run abnormally.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The consumer or producer task panicked or was cancelled
    #[error("pipeline task failed: {0}")]
    Task(#[from] JoinError),
}

/// Final report of a run, handed to the renderer.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub outcome: RunOutcome,
    pub stats: Stats,
    /// Budget at the end of the run, including crossing extensions.
    pub total_limit: u64,
    /// Actions delivered to the sink.
    pub actions: u64,
    /// Buffered comments dropped unprocessed when the run stopped.
    pub abandoned: u64,
    pub elapsed_ms: u64,
}

/// Everything a run needs besides its source and interrupt.
pub struct IngestionPipeline {
    matcher: Arc<dyn EventMatcher>,
    engine: Arc<ThresholdEngine>,
    comment_log: Arc<dyn CommentLog>,
    sink: Arc<dyn ActionSink>,
    total_limit: u64,
    time_limit: Duration,
    channel_capacity: usize,
}

impl IngestionPipeline {
    /// Create a new IngestionPipeline.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated run configuration
    /// * `store` - Counter store shared with the threshold engine
    /// * `comment_log` - Best-effort comment log
    /// * `sink` - Receiver of threshold-crossing actions
    pub fn new(
        config: &RunConfig,
        store: Arc<dyn CounterStore>,
        comment_log: Arc<dyn CommentLog>,
        sink: Arc<dyn ActionSink>,
    ) -> Self {
        let marker = TerminalMarker::new(config.final_comment.clone());
        Self {
            matcher: Arc::from(build_matcher(&config.policy, marker)),
            engine: Arc::new(ThresholdEngine::new(
                store,
                config.threshold.clone(),
                config.store_op_timeout,
            )),
            comment_log,
            sink,
            total_limit: config.total_limit,
            time_limit: config.time_limit,
            channel_capacity: config.channel_capacity,
        }
    }

    /// Run the pipeline until one stop cause fires.
    ///
    /// `interrupt` resolves when an external stop request arrives. Pass
    /// `std::future::pending()` to run without one.
    pub async fn run<S, I>(self, source: S, interrupt: I) -> Result<RunReport, PipelineError>
    where
        S: Stream<Item = String> + Send + Unpin + 'static,
        I: Future<Output = ()> + Send,
    {
        let run_id = Uuid::now_v7();
        let span = info_span!("run", %run_id);
        self.run_inner(run_id, source, interrupt).instrument(span).await
    }

    async fn run_inner<S, I>(
        self,
        run_id: Uuid,
        source: S,
        interrupt: I,
    ) -> Result<RunReport, PipelineError>
    where
        S: Stream<Item = String> + Send + Unpin + 'static,
        I: Future<Output = ()> + Send,
    {
        let started = Instant::now();
        let stop = StopSignal::new();
        let (comment_tx, comment_rx) = comment_channel(self.channel_capacity);

        info!(
            total_limit = self.total_limit,
            time_limit_secs = self.time_limit.as_secs(),
            "Ingestion started"
        );

        let producer = Producer {
            source,
            comment_tx,
            stop: stop.clone(),
        };
        let consumer = Consumer {
            matcher: self.matcher,
            engine: self.engine,
            comment_log: self.comment_log,
            sink: self.sink,
            ctx: RunContext::new(self.total_limit),
            stop: stop.clone(),
            actions: 0,
        };

        let producer_handle = tokio::spawn(producer.run().in_current_span());
        let mut consumer_handle = tokio::spawn(consumer.run(comment_rx).in_current_span());

        let deadline = tokio::time::sleep(self.time_limit);
        tokio::pin!(deadline);
        tokio::pin!(interrupt);

        // Consumer-side causes are checked first so that a stop which is
        // already recorded is never overridden by a monitor.
        let (outcome, consumed) = tokio::select! {
            biased;

            outcome = stop.stopped() => (outcome, None),

            joined = &mut consumer_handle => match joined {
                // The consumer only returns after the stop is recorded.
                Ok(consumed) => (stop.stopped().await, Some(consumed)),
                Err(e) => {
                    warn!(error = %e, "Consumer task failed");
                    stop.trigger(RunOutcome::Interrupted);
                    producer_handle.abort();
                    return Err(e.into());
                }
            },

            _ = &mut interrupt => {
                info!("Received interrupt signal");
                (stop.trigger(RunOutcome::Interrupted), None)
            }

            _ = &mut deadline => {
                info!("Time limit reached");
                (stop.trigger(RunOutcome::DeadlineExpired), None)
            }
        };

        info!(%outcome, "Ingestion stopping");

        let consumed = match consumed {
            Some(consumed) => consumed,
            None => consumer_handle.await?,
        };
        producer_handle.await?;

        let report = RunReport {
            run_id,
            outcome,
            stats: consumed.ctx.stats,
            total_limit: consumed.ctx.budget.total_limit(),
            actions: consumed.actions,
            abandoned: consumed.abandoned,
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };

        info!(
            comments_read = report.stats.comments_read(),
            letters_typed = report.stats.letters_typed(),
            commands_sent = report.stats.commands_sent(),
            actions = report.actions,
            abandoned = report.abandoned,
            "Ingestion stopped"
        );

        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Producer
// ---------------------------------------------------------------------------

/// Forwards source comments into the channel until the source ends or the
/// run stops.
struct Producer<S> {
    source: S,
    comment_tx: CommentSender,
    stop: StopSignal,
}

impl<S> Producer<S>
where
    S: Stream<Item = String> + Send + Unpin + 'static,
{
    async fn run(mut self) {
        let mut sequence = 0u64;

        loop {
            let text = tokio::select! {
                biased;

                _ = self.stop.stopped() => break,

                next = self.source.next() => match next {
                    Some(text) => text,
                    None => {
                        debug!(produced = sequence, "Comment source exhausted");
                        break;
                    }
                },
            };

            let comment = Comment::new(sequence, text);

            // A full channel must not keep the producer alive past the stop.
            tokio::select! {
                biased;

                _ = self.stop.stopped() => break,

                sent = self.comment_tx.send(comment) => {
                    if sent.is_err() {
                        debug!("Comment channel closed");
                        break;
                    }
                }
            }

            sequence += 1;
        }

        // Dropping the sender lets the consumer see the end of the stream.
        debug!(produced = sequence, "Producer finished");
    }
}

// ---------------------------------------------------------------------------
// Consumer
// ---------------------------------------------------------------------------

struct ConsumerReport {
    ctx: RunContext,
    actions: u64,
    abandoned: u64,
}

/// Sole owner of the run's stats; decides terminal and budget stops.
struct Consumer {
    matcher: Arc<dyn EventMatcher>,
    engine: Arc<ThresholdEngine>,
    comment_log: Arc<dyn CommentLog>,
    sink: Arc<dyn ActionSink>,
    ctx: RunContext,
    stop: StopSignal,
    actions: u64,
}

impl Consumer {
    async fn run(mut self, mut comment_rx: CommentReceiver) -> ConsumerReport {
        loop {
            let comment = tokio::select! {
                biased;

                _ = self.stop.stopped() => break,

                next = comment_rx.recv() => match next {
                    Some(comment) => comment,
                    None => {
                        self.stop.trigger(RunOutcome::SourceExhausted);
                        break;
                    }
                },
            };

            if let Some(outcome) = self.handle(comment).await {
                let winner = self.stop.trigger(outcome);
                if winner != outcome {
                    debug!(%outcome, %winner, "Stop already recorded");
                }
                break;
            }
        }

        let abandoned = drain(&mut comment_rx);
        if abandoned > 0 {
            info!(abandoned, "Dropped buffered comments without processing");
        }

        ConsumerReport {
            ctx: self.ctx,
            actions: self.actions,
            abandoned,
        }
    }

    /// Process one comment. Returns the stop cause it produced, if any.
    async fn handle(&mut self, comment: Comment) -> Option<RunOutcome> {
        if self.stop.is_stopped() {
            return None;
        }

        if let Err(e) = self.comment_log.log_comment(&comment.text).await {
            warn!(sequence = comment.sequence, error = %e, "Error logging comment");
        }

        let matches = self.matcher.match_comment(&comment.text);

        if matches.is_terminal {
            if let Err(e) = self.comment_log.log_event(TERMINAL_EVENT).await {
                warn!(sequence = comment.sequence, error = %e, "Error logging event");
            }
            if self.stop.is_stopped() {
                return None;
            }
            self.ctx.stats.record_comment();
            info!(sequence = comment.sequence, "Terminal comment received");
            return Some(RunOutcome::TerminalEventSeen);
        }

        let disposition = self
            .engine
            .process_matches(
                &comment,
                &matches.keys,
                &mut self.ctx,
                self.sink.as_ref(),
                &self.stop,
            )
            .await;

        match disposition {
            EventDisposition::Abandoned => None,
            EventDisposition::Completed { counted, crossings } => {
                self.actions += crossings as u64;
                debug!(
                    sequence = comment.sequence,
                    matched = matches.keys.len(),
                    counted,
                    crossings,
                    "Comment processed"
                );
                if self.ctx.budget.is_exhausted_by(&self.ctx.stats) {
                    info!(
                        commands_sent = self.ctx.stats.commands_sent(),
                        total_limit = self.ctx.budget.total_limit(),
                        "Command budget exhausted"
                    );
                    Some(RunOutcome::BudgetExhausted)
                } else {
                    None
                }
            }
        }
    }
}

/// Close the channel and discard whatever is still buffered.
///
/// Closing first makes any pending `send` fail, which releases a producer
/// blocked on a full channel.
fn drain(comment_rx: &mut CommentReceiver) -> u64 {
    comment_rx.close();
    let mut abandoned = 0;
    while comment_rx.try_recv().is_ok() {
        abandoned += 1;
    }
    abandoned
}
