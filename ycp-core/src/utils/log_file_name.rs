use time::macros::format_description;

/// Returns the comment log file name for a run started at `started_at`,
/// e.g. `comments_2026-10-16_14-03-09.log`.
pub fn comment_log_file_name(started_at: time::OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    let stamp = started_at
        .format(&format)
        .unwrap_or_else(|_| started_at.unix_timestamp().to_string());
    format!("comments_{stamp}.log")
}
