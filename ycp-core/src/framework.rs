use sqlx::PgPool;

/// Executes database commands through the `Processor` trait.
///
/// Each query lives in its own command struct next to the code that owns
/// the table, with an `impl Processor<Command> for DatabaseProcessor`.
#[derive(Debug, Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}
