//! Terminal screens shown before and after a run.

use crate::config::LoadedConfig;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use ycp_core::config::MatchPolicy;
use ycp_core::events::Action;
use ycp_core::processors::RunReport;

/// Print the run parameters and the prompt to start.
pub fn display_home_screen(config: &LoadedConfig, prompt: bool) {
    let run = &config.run;
    println!("=== Stream Comments Processor ===");
    match &run.policy {
        MatchPolicy::RepeatedCharacter => {
            println!("Buttons: repeated letters of {:?}", run.final_comment);
        }
        MatchPolicy::Substring(patterns) => {
            println!("Buttons and Parameters:");
            for pattern in patterns {
                println!(
                    "  {}: {} (limit {})",
                    pattern.key,
                    pattern.word,
                    run.threshold.limit_for(&pattern.key)
                );
            }
        }
    }
    println!("Total Limit: {}", run.total_limit);
    println!("Time Limit: {} seconds", run.time_limit.as_secs());
    println!("Final Comment: {}", run.final_comment);
    match &config.source.api_connection {
        Some(url) => println!("API Connection: {url}"),
        None => println!("API Connection: none"),
    }
    println!("Counter Limit: {}", run.threshold.limit);
    if prompt {
        println!("Press Enter to clear the console and start reading comments...");
    }
}

/// Print the final statistics.
pub fn display_final_screen(report: &RunReport) {
    println!("=== Final Statistics ===");
    println!("Stopped By: {}", report.outcome);
    println!("Comments Read: {}", report.stats.comments_read());
    println!("Letters Typed: {}", report.stats.letters_typed());
    println!("Commands Sent: {}", report.stats.commands_sent());
}

/// "Type" the letter of a crossed counter.
pub fn print_letter(action: &Action) {
    println!("Letter: {}", action.key);
}

pub fn clear_console() {
    print!("\x1b[H\x1b[2J");
    // Nothing useful to do if stdout is gone.
    let _ = std::io::stdout().flush();
}

/// Wait until the user presses Enter (or stdin closes).
pub async fn wait_for_enter() -> std::io::Result<()> {
    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(())
}
