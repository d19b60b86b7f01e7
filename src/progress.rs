//! Progress indicators for k3node.
//!
//! k3sup runs block for as long as the SSH session takes, so every run is
//! wrapped in a spinner. Spinners draw to stderr and are hidden when it is
//! not a terminal, or when the caller asked for quiet or JSON output.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Start a spinner with `msg`, or a hidden bar when `visible` is false.
pub fn spinner(msg: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Run `f` while a spinner is shown, clearing it afterwards.
pub fn with_spinner<T>(msg: &str, visible: bool, f: impl FnOnce() -> T) -> T {
    let pb = spinner(msg, visible);
    let result = f();
    pb.finish_and_clear();
    result
}
