//! Progress bar and summary reporting for the terminal front end.

use std::io::{self, Write};

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::worker::{CacheStatus, InstallProgress};
use crate::{CacheStats, GameEnd, format_average, format_bytes};

const SEPARATOR: &str = "────────────────────────────────────────────────────────────";

/// Creates a progress bar counting installed manifest entries.
pub fn make_install_bar(entries: u64) -> ProgressBar {
    let bar = ProgressBar::new(entries);
    if let Ok(template) =
        ProgressStyle::with_template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} - {msg}")
    {
        bar.set_style(template.progress_chars("━━╌"));
    }
    bar
}

/// Feeds worker install callbacks into a progress bar.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub const fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl InstallProgress for BarProgress {
    fn on_entry_start(&self, url: &str) {
        self.bar.set_message(url.to_string());
    }

    fn on_entry_complete(&self, _url: &str, _bytes: usize) {
        self.bar.inc(1);
    }

    fn on_entry_error(&self, url: &str, error: &str) {
        self.bar
            .println(format!("{} {url}: {error}", style("✗").red()));
    }
}

/// Prints the end-of-game statistics.
pub fn print_game_summary(out: &mut impl Write, end: &GameEnd) -> io::Result<()> {
    let summary = &end.summary;

    writeln!(out, "\n{SEPARATOR}")?;
    writeln!(out, "Game Summary")?;
    writeln!(out, "{SEPARATOR}")?;
    for r in &summary.rounds {
        writeln!(
            out,
            "  Round {}: guessed {:>3}, number {:>3}, {:>3} points",
            r.round, r.guess, r.secret, r.points
        )?;
    }
    writeln!(out, "{SEPARATOR}")?;
    writeln!(out, "  Final score:       {}", end.total_score)?;
    writeln!(
        out,
        "  Average points:    {}",
        format_average(summary.average_points())
    )?;
    if summary.perfect_rounds > 0 {
        writeln!(out, "  Perfect rounds:    {}", summary.perfect_rounds)?;
    }
    if let Some(closest) = summary.closest_diff {
        writeln!(out, "  Closest guess:     {closest} away")?;
    }
    match (end.new_best, end.previous_best) {
        (true, Some(previous)) => writeln!(
            out,
            "  {} (was {previous})",
            style("New best score!").green().bold()
        )?,
        (true, None) => writeln!(out, "  {}", style("New best score!").green().bold())?,
        (false, Some(previous)) => writeln!(out, "  Best score:        {previous}")?,
        (false, None) => {}
    }
    writeln!(out, "{SEPARATOR}")?;
    Ok(())
}

/// Prints caches, entries and gaps in the current cache.
pub fn print_cache_status(status: &CacheStatus) {
    println!("\n{SEPARATOR}");
    println!("Cache {}", status.cache_name);
    println!("{SEPARATOR}");

    if status.entries.is_empty() {
        println!("  (empty)");
    }
    for entry in &status.entries {
        println!(
            "  {} {} ({})",
            entry.status,
            entry.key,
            format_bytes(entry.size as u64)
        );
    }
    for url in &status.missing {
        println!("  {} {url}", style("missing").yellow());
    }

    println!("{SEPARATOR}");
    println!(
        "  {} entries, {} total",
        status.entries.len(),
        format_bytes(status.total_bytes())
    );
    let stale: Vec<_> = status
        .caches
        .iter()
        .filter(|name| **name != status.cache_name)
        .collect();
    if !stale.is_empty() {
        println!(
            "  {} stale cache(s): {}",
            stale.len(),
            stale.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
        );
    }
    println!("{SEPARATOR}");
}

/// Prints worker counters after a fetch.
pub fn print_cache_stats(stats: &CacheStats) {
    println!(
        "  hits {}, misses {}, stored {}, passed through {}",
        stats.hits, stats.misses, stats.stored, stats.passthrough
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{GameSummaryBuilder, RoundRecord};

    fn end(new_best: bool, previous_best: Option<u32>) -> GameEnd {
        let mut builder = GameSummaryBuilder::new();
        builder.add_round(RoundRecord {
            round: 1,
            guess: 40,
            secret: 40,
            diff: 0,
            points: 100,
        });
        builder.add_round(RoundRecord {
            round: 2,
            guess: 10,
            secret: 20,
            diff: 10,
            points: 90,
        });
        let summary = builder.build();
        GameEnd {
            total_score: summary.total_score,
            previous_best,
            new_best,
            summary,
        }
    }

    fn render(end: &GameEnd) -> String {
        console::set_colors_enabled(false);
        let mut out = Vec::new();
        print_game_summary(&mut out, end).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn summary_lists_rounds_and_totals() {
        let text = render(&end(false, Some(500)));
        assert!(text.contains("Round 1: guessed  40, number  40, 100 points"));
        assert!(text.contains("Final score:       190"));
        assert!(text.contains("Average points:    95.0"));
        assert!(text.contains("Perfect rounds:    1"));
        assert!(text.contains("Closest guess:     0 away"));
        assert!(text.contains("Best score:        500"));
        assert!(!text.contains("New best"));
    }

    #[test]
    fn summary_announces_new_best() {
        assert!(render(&end(true, Some(150))).contains("New best score! (was 150)"));
        assert!(render(&end(true, None)).contains("New best score!"));
    }

    #[test]
    fn bar_counts_completed_entries() {
        let progress = BarProgress::new(make_install_bar(3));
        progress.on_entry_start("http://localhost:8080/mobile.html");
        progress.on_entry_complete("http://localhost:8080/mobile.html", 10);
        assert_eq!(progress.bar.position(), 1);
        progress.finish();
    }
}
