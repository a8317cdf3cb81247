//! Progress indicators for gluestack CLI.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Bar over a known number of items
///
/// Hidden when `quiet`, and by indicatif itself when stderr is not a terminal.
pub fn bar(len: u64, prefix: &str, quiet: bool) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if quiet {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{prefix:>10.cyan.bold} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb.set_prefix(prefix.to_string());
    pb
}

/// Clear the bar and leave a one-line summary
pub fn finish(pb: &ProgressBar, msg: &str) {
    pb.finish_and_clear();
    if !pb.is_hidden() {
        crate::ui::success(msg);
    }
}
