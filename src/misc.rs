use std::sync::atomic::{AtomicUsize, Ordering};

use owo_colors::AnsiColors;
use tracing_subscriber::EnvFilter;

/// Sets up a `tracing_subscriber::fmt` subscriber filtered by `RUST_LOG`,
/// defaulting to the `info` level. Logs go to stderr so that the standard
/// output of any process launched afterwards is left alone. Does nothing if a
/// global subscriber is already set.
pub fn std_init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

static TERMINAL_COLOR_INDEX: AtomicUsize = AtomicUsize::new(0);

const TERMINAL_COLORS: [AnsiColors; 6] = [
    AnsiColors::Green,
    AnsiColors::Cyan,
    AnsiColors::Magenta,
    AnsiColors::Yellow,
    AnsiColors::Blue,
    AnsiColors::BrightGreen,
];

/// Cycles through a fixed set of terminal colors, used so that the forwarded
/// output of different commands can be told apart
pub fn next_terminal_color() -> AnsiColors {
    let i = TERMINAL_COLOR_INDEX.fetch_add(1, Ordering::Relaxed);
    TERMINAL_COLORS[i % TERMINAL_COLORS.len()]
}
