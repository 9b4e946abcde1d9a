use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use ycp_core::comment_log::{CommentLog, LogError, NullCommentLog};
use ycp_core::config::{MatchPolicy, Pattern, RunConfig, ThresholdConfig};
use ycp_core::events::{Action, PatternKey};
use ycp_core::processors::{IngestionPipeline, PipelineError, RunOutcome, RunReport};
use ycp_core::sink::RecordingSink;
use ycp_core::sources::{CommentStream, from_texts};
use ycp_core::store::{CounterStore, MemoryCounterStore, StoreError};

/// Keeps every log line in memory, event lines prefixed like the file log.
#[derive(Default)]
struct MemoryCommentLog {
    lines: Mutex<Vec<String>>,
}

impl MemoryCommentLog {
    fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommentLog for MemoryCommentLog {
    async fn log_comment(&self, comment: &str) -> Result<(), LogError> {
        self.lines.lock().unwrap().push(comment.to_string());
        Ok(())
    }

    async fn log_event(&self, event: &str) -> Result<(), LogError> {
        self.lines.lock().unwrap().push(format!("[EVENT] {event}"));
        Ok(())
    }
}

/// Always fails to write.
struct BrokenCommentLog;

#[async_trait]
impl CommentLog for BrokenCommentLog {
    async fn log_comment(&self, _comment: &str) -> Result<(), LogError> {
        Err(LogError::Io(std::io::Error::other("disk full")))
    }

    async fn log_event(&self, _event: &str) -> Result<(), LogError> {
        Err(LogError::Io(std::io::Error::other("disk full")))
    }
}

/// Memory store that refuses every operation on one key.
struct PartiallyBrokenStore {
    inner: MemoryCounterStore,
    broken: PatternKey,
}

impl PartiallyBrokenStore {
    fn check(&self, key: &PatternKey) -> Result<(), StoreError> {
        if *key == self.broken {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CounterStore for PartiallyBrokenStore {
    async fn increment(&self, key: &PatternKey) -> Result<i64, StoreError> {
        self.check(key)?;
        self.inner.increment(key).await
    }

    async fn get(&self, key: &PatternKey) -> Result<i64, StoreError> {
        self.check(key)?;
        self.inner.get(key).await
    }

    async fn reset(&self, key: &PatternKey) -> Result<(), StoreError> {
        self.check(key)?;
        self.inner.reset(key).await
    }

    async fn close(&self) {}
}

fn texts(items: &[&str]) -> CommentStream {
    from_texts(
        items.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        Duration::ZERO,
    )
}

async fn run(
    config: &RunConfig,
    store: Arc<dyn CounterStore>,
    log: Arc<dyn CommentLog>,
    sink: Arc<RecordingSink>,
    source: CommentStream,
) -> RunReport {
    IngestionPipeline::new(config, store, log, sink)
        .run(source, std::future::pending())
        .await
        .unwrap()
}

#[tokio::test]
async fn repeated_character_crossing_resets_and_extends_budget() {
    let config = RunConfig::new("wow").with_threshold(ThresholdConfig::new(1));
    let store = Arc::new(MemoryCounterStore::new());
    let sink = Arc::new(RecordingSink::new());

    let report = run(
        &config,
        store.clone(),
        Arc::new(NullCommentLog),
        sink.clone(),
        texts(&["ww", "ww", "ww"]),
    )
    .await;

    assert_eq!(report.outcome, RunOutcome::SourceExhausted);
    assert_eq!(
        sink.actions(),
        vec![Action {
            key: PatternKey::new("w"),
            sequence: 1
        }]
    );
    assert_eq!(report.total_limit, 101);
    assert_eq!(report.actions, 1);
    assert_eq!(store.get(&PatternKey::new("w")).await.unwrap(), 1);
    assert_eq!(report.stats.comments_read(), 3);
    assert_eq!(report.stats.letters_typed(), 3);
}

#[tokio::test]
async fn terminal_comment_stops_run_and_is_counted() {
    let config = RunConfig::new("exit");
    let sink = Arc::new(RecordingSink::new());
    let log = Arc::new(MemoryCommentLog::default());

    let report = run(
        &config,
        Arc::new(MemoryCounterStore::new()),
        log.clone(),
        sink.clone(),
        texts(&["hello", "exit", "tt"]),
    )
    .await;

    assert_eq!(report.outcome, RunOutcome::TerminalEventSeen);
    assert_eq!(report.stats.comments_read(), 2);
    assert!(sink.actions().is_empty());
    assert!(!log.lines().contains(&"tt".to_string()));
}

#[tokio::test]
async fn zero_budget_stops_after_first_comment() {
    let config = RunConfig::new("exit").with_total_limit(0);

    let report = run(
        &config,
        Arc::new(MemoryCounterStore::new()),
        Arc::new(NullCommentLog),
        Arc::new(RecordingSink::new()),
        texts(&["tt", "tt", "tt"]),
    )
    .await;

    assert_eq!(report.outcome, RunOutcome::BudgetExhausted);
    assert_eq!(report.stats.comments_read(), 1);
    assert!(report.stats.commands_sent() >= report.total_limit);
}

#[tokio::test]
async fn store_failure_on_one_pattern_does_not_stop_ingestion() {
    let config = RunConfig::new("exit").with_policy(MatchPolicy::Substring(vec![
        Pattern::new("a", "alpha"),
        Pattern::new("b", "beta"),
    ]));
    let store = Arc::new(PartiallyBrokenStore {
        inner: MemoryCounterStore::new(),
        broken: PatternKey::new("a"),
    });

    let report = run(
        &config,
        store.clone(),
        Arc::new(NullCommentLog),
        Arc::new(RecordingSink::new()),
        texts(&["alpha beta", "beta"]),
    )
    .await;

    assert_eq!(report.outcome, RunOutcome::SourceExhausted);
    assert_eq!(store.inner.get(&PatternKey::new("b")).await.unwrap(), 2);
    assert_eq!(report.stats.comments_read(), 2);
    assert_eq!(report.stats.commands_sent(), 2);
}

#[tokio::test]
async fn duplicate_terminal_comment_is_handled_once() {
    let config = RunConfig::new("exit");
    let log = Arc::new(MemoryCommentLog::default());

    let report = run(
        &config,
        Arc::new(MemoryCounterStore::new()),
        log.clone(),
        Arc::new(RecordingSink::new()),
        texts(&["exit", "exit"]),
    )
    .await;

    assert_eq!(report.outcome, RunOutcome::TerminalEventSeen);
    assert_eq!(report.stats.comments_read(), 1);
    let events = log
        .lines()
        .iter()
        .filter(|line| line.starts_with("[EVENT] "))
        .count();
    assert_eq!(events, 1);
}

#[tokio::test]
async fn logging_failure_does_not_change_outcome() {
    let config = RunConfig::new("exit");

    let report = run(
        &config,
        Arc::new(MemoryCounterStore::new()),
        Arc::new(BrokenCommentLog),
        Arc::new(RecordingSink::new()),
        texts(&["tt", "exit"]),
    )
    .await;

    assert_eq!(report.outcome, RunOutcome::TerminalEventSeen);
    assert_eq!(report.stats.comments_read(), 2);
    assert_eq!(report.stats.commands_sent(), 1);
}

#[tokio::test]
async fn every_dequeued_comment_is_counted_once() {
    let config = RunConfig::new("exit");
    let comments = ["a", "bb", "hello", "tt", "xx", "ee", "it"];

    let report = run(
        &config,
        Arc::new(MemoryCounterStore::new()),
        Arc::new(NullCommentLog),
        Arc::new(RecordingSink::new()),
        texts(&comments),
    )
    .await;

    assert_eq!(report.outcome, RunOutcome::SourceExhausted);
    assert_eq!(report.stats.comments_read(), comments.len() as u64);
    assert_eq!(report.abandoned, 0);
}

#[tokio::test(start_paused = true)]
async fn zero_deadline_without_interrupt_expires() {
    let config = RunConfig::new("exit").with_time_limit(Duration::ZERO);

    let report = run(
        &config,
        Arc::new(MemoryCounterStore::new()),
        Arc::new(NullCommentLog),
        Arc::new(RecordingSink::new()),
        Box::pin(tokio_stream::pending::<String>()),
    )
    .await;

    assert_eq!(report.outcome, RunOutcome::DeadlineExpired);
    assert_eq!(report.stats.comments_read(), 0);
}

#[tokio::test(start_paused = true)]
async fn deadline_stops_paced_source() {
    let config = RunConfig::new("exit").with_time_limit(Duration::from_millis(2500));
    let comments: Vec<String> = (0..10).map(|i| format!("comment {i}")).collect();

    let report = run(
        &config,
        Arc::new(MemoryCounterStore::new()),
        Arc::new(NullCommentLog),
        Arc::new(RecordingSink::new()),
        from_texts(comments, Duration::from_secs(1)),
    )
    .await;

    assert_eq!(report.outcome, RunOutcome::DeadlineExpired);
    assert_eq!(report.stats.comments_read(), 3);
}

#[tokio::test(start_paused = true)]
async fn interrupt_wins_before_deadline() {
    let config = RunConfig::new("exit").with_time_limit(Duration::from_secs(60));
    let sink = Arc::new(RecordingSink::new());

    let report = IngestionPipeline::new(
        &config,
        Arc::new(MemoryCounterStore::new()),
        Arc::new(NullCommentLog),
        sink,
    )
    .run(
        Box::pin(tokio_stream::pending::<String>()),
        tokio::time::sleep(Duration::from_secs(5)),
    )
    .await
    .unwrap();

    assert_eq!(report.outcome, RunOutcome::Interrupted);
}

#[tokio::test]
async fn producer_blocked_on_full_channel_is_released() {
    let config = RunConfig::new("exit").with_channel_capacity(1);
    let mut comments = vec!["exit".to_string()];
    comments.extend((0..100).map(|i| format!("comment {i}")));

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        run(
            &config,
            Arc::new(MemoryCounterStore::new()),
            Arc::new(NullCommentLog),
            Arc::new(RecordingSink::new()),
            from_texts(comments, Duration::ZERO),
        ),
    )
    .await
    .expect("pipeline must not deadlock on a full channel");

    assert_eq!(report.outcome, RunOutcome::TerminalEventSeen);
    assert_eq!(report.stats.comments_read(), 1);
    assert!(report.abandoned <= 1);
}

#[tokio::test]
async fn crossings_can_keep_budget_ahead() {
    // Every comment crosses the zero threshold, so the budget grows as fast
    // as commands are sent and the run only ends with the source.
    let config = RunConfig::new("tu")
        .with_total_limit(1)
        .with_threshold(ThresholdConfig::new(0));

    let report = run(
        &config,
        Arc::new(MemoryCounterStore::new()),
        Arc::new(NullCommentLog),
        Arc::new(RecordingSink::new()),
        texts(&["tt x", "tt y", "tt z"]),
    )
    .await;

    assert_eq!(report.outcome, RunOutcome::SourceExhausted);
    assert_eq!(report.actions, 3);
    assert_eq!(report.total_limit, 4);
    assert_eq!(report.stats.commands_sent(), 3);
}

#[tokio::test]
async fn consumer_failure_is_reported_without_waiting_for_deadline() {
    let config = RunConfig::new("tu").with_threshold(ThresholdConfig::new(0));
    let failing_sink = |_: &Action| panic!("sink failed");

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        IngestionPipeline::new(
            &config,
            Arc::new(MemoryCounterStore::new()),
            Arc::new(NullCommentLog),
            Arc::new(failing_sink),
        )
        .run(texts(&["tt"]), std::future::pending()),
    )
    .await
    .expect("consumer failure must end the run before the time limit");

    assert!(matches!(result, Err(PipelineError::Task(_))));
}
