/// Logging helpers
///
/// Subscriber setup plus the banner-style progress lines of the run loop
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber
///
/// `RUST_LOG` wins over `default_level`. Safe to call more than once.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Startup banner
pub fn log_startup(workers: usize, countries: &[String], dry_run: bool) {
    info!("{}", "=".repeat(60));
    info!("🚀 Lead engine starting");
    info!("📊 Workers: {}", workers);
    info!("🌍 Countries: {}", countries.join(", "));
    if dry_run {
        info!("🧪 Dry run: in-memory store, leads are logged instead of sent");
    }
    info!("{}", "=".repeat(60));
}

pub fn log_cycle_start(cycle: u64, queries: usize, workers: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 Cycle #{} started", cycle);
    info!("📄 {} queries across {} workers", queries, workers);
    info!("{}", "=".repeat(60));
}

/// Final per-cycle statistics
#[allow(clippy::too_many_arguments)]
pub fn print_cycle_stats(
    cycle: u64,
    queries: usize,
    aborted: usize,
    candidates: usize,
    admitted: usize,
    dispatched: usize,
    dispatch_failed: usize,
    timed_out: bool,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 Cycle #{} statistics", cycle);
    info!(
        "Finished at: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("🔍 Queries: {} ({} aborted)", queries, aborted);
    info!("🏢 Candidates: {}", candidates);
    info!("✅ New leads: {} ({} dispatched)", admitted, dispatched);
    if dispatch_failed > 0 {
        info!("❌ Dispatch failures: {} (retried next cycle)", dispatch_failed);
    }
    if timed_out {
        info!("⏱️ Cycle deadline reached, remaining queries abandoned");
    }
    info!("{}", "=".repeat(60));
}

/// Truncate long text for log display
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("Sandton", 10), "Sandton");
        assert_eq!(truncate_text("Borrowdale Harare", 10), "Borrowdale...");
    }
}
