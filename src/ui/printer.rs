use crate::engine::ControlPlane;
use crate::fingerprint::{self, format_technologies, Technologies};
use crate::scan::events::{EventReceiver, EventSender, ScanEvent};
use crate::scan::models::{ScanResult, Stats};
use crate::table::TableBuilder;
use anyhow::{Context, Result};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Headless mode: start right away, stream results, stop on completion or Ctrl-C.
pub async fn run(
    plane: &ControlPlane,
    mut events: EventReceiver,
    sender: EventSender,
    silent: bool,
) -> Result<Option<Technologies>> {
    if !silent {
        print_banner(plane);
    }

    plane.start().context("Failed to start scan")?;

    let bar = if silent {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    };

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut technologies = None;
    let mut awaiting_tech = false;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    ScanEvent::Result(result) => {
                        if silent {
                            println!("{}", result.path);
                        } else {
                            bar.println(colorize(&result));
                        }
                    }
                    ScanEvent::Stats(stats) => bar.set_message(progress_message(&stats)),
                    ScanEvent::Completed => {
                        if plane.config().tech_detect {
                            awaiting_tech = true;
                            bar.set_message("Detecting technologies...");
                            fingerprint::spawn_detection(plane.transport(), plane.config().base_url(), sender.clone());
                        } else {
                            break;
                        }
                    }
                    ScanEvent::Technologies(found) => {
                        technologies = Some(found);
                        if awaiting_tech {
                            break;
                        }
                    }
                    ScanEvent::StateChanged(_) => {}
                }
            }
            _ = &mut ctrl_c => {
                bar.println("Interrupted, stopping scan".yellow().to_string());
                plane.quit();
                break;
            }
        }
    }

    bar.finish_and_clear();
    Ok(technologies)
}

fn print_banner(plane: &ControlPlane) {
    let config = plane.config();
    println!("{}", "dircrawler".cyan().bold());
    println!("  {:<12} : {}", "Target".bold(), config.target);
    println!("  {:<12} : {}", "Wordlist".bold(), config.wordlist.display());
    println!("  {:<12} : {}", "Threads".bold(), config.threads);
    println!("  {:<12} : {}", "Method".bold(), config.method);
    println!("  {:<12} : {}", "Status Codes".bold(), config.status_codes_display());
    if config.recursive {
        println!("  {:<12} : {}", "Max Depth".bold(), config.max_depth);
    }
    println!();
}

fn progress_message(stats: &Stats) -> String {
    format!(
        "{} processed | {} found | {:.1} req/s | {} | {}",
        stats.processed_count, stats.found_count, stats.requests_per_second, stats.elapsed, stats.current_path
    )
}

fn colorize(result: &ScanResult) -> String {
    let line = result.to_string();
    match result.status {
        200..=299 => line.green().to_string(),
        300..=399 => line.yellow().to_string(),
        400..=499 => line.magenta().to_string(),
        500.. => line.red().to_string(),
        _ => line,
    }
}

/// End-of-run summary for either front end.
pub fn print_summary(plane: &ControlPlane, technologies: Option<&Technologies>) {
    let stats = plane.stats();
    let results = plane.results();

    println!("\n{}", "═══════════════════════════════════════".green().bold());
    println!("{}", format!("dircrawler scan {}", plane.state()).green().bold());
    println!("{}", "═══════════════════════════════════════".green().bold());

    println!("\n{}: {}", "Target".cyan().bold(), plane.config().target);
    println!(
        "{}: {} processed, {} found, {} in {}",
        "Requests".cyan().bold(),
        stats.processed_count,
        stats.found_count.to_string().green().bold(),
        format!("{:.1} req/s", stats.requests_per_second),
        if stats.elapsed.is_empty() { "00:00:00" } else { &stats.elapsed }
    );
    if stats.recursion_active {
        println!("{}: {} directories", "Recursion".cyan().bold(), stats.recursion_count);
    }
    if let Some(found) = technologies.filter(|t| !t.is_empty()) {
        println!("{}: {}", "Technologies".cyan().bold(), format_technologies(found));
    }

    if !results.is_empty() {
        println!("\n{}", TableBuilder::status_summary(&results));
    }
}
