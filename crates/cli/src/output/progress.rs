//! Progress display for tree downloads
//!
//! The total grows as listing pages arrive, so the bar length is updated
//! from every snapshot instead of being fixed up front.

use std::sync::Arc;

use bm_core::{ProgressFn, ProgressSnapshot};

use super::OutputConfig;

const TEMPLATE: &str = "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files {msg}";

/// Progress bar wrapper
///
/// In quiet or JSON mode, progress is suppressed.
#[derive(Debug, Clone)]
pub struct ProgressBar {
    bar: Option<indicatif::ProgressBar>,
}

impl ProgressBar {
    /// Create a bar counting finished files out of the files seen so far
    pub fn new(config: &OutputConfig) -> Self {
        let bar = if config.quiet || config.json || config.no_progress {
            None
        } else {
            let bar = indicatif::ProgressBar::new(0);
            let style = indicatif::ProgressStyle::default_bar()
                .template(TEMPLATE)
                .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
                .progress_chars("#>-");
            bar.set_style(style);
            bar.enable_steady_tick(std::time::Duration::from_millis(100));
            Some(bar)
        };

        Self { bar }
    }

    /// Apply a snapshot from the downloader
    pub fn update(&self, snapshot: ProgressSnapshot) {
        if let Some(bar) = &self.bar {
            bar.set_length(snapshot.total_seen as u64);
            bar.set_position(snapshot.finished() as u64);
            if snapshot.failed > 0 {
                bar.set_message(format!("({} failed)", snapshot.failed));
            }
        }
    }

    /// Callback feeding this bar, for `Session::with_progress`
    pub fn callback(&self) -> ProgressFn {
        let bar = self.clone();
        Arc::new(move |snapshot| bar.update(snapshot))
    }

    /// Finish and clear the progress bar
    pub fn finish_and_clear(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }

    /// Check if progress bar is visible
    pub fn is_visible(&self) -> bool {
        self.bar.is_some()
    }

    #[cfg(test)]
    fn position(&self) -> Option<(u64, Option<u64>)> {
        self.bar.as_ref().map(|b| (b.position(), b.length()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar_quiet_mode() {
        let config = OutputConfig {
            quiet: true,
            ..Default::default()
        };
        assert!(!ProgressBar::new(&config).is_visible());
    }

    #[test]
    fn test_progress_bar_json_mode() {
        let config = OutputConfig {
            json: true,
            ..Default::default()
        };
        assert!(!ProgressBar::new(&config).is_visible());
    }

    #[test]
    fn test_progress_bar_no_progress() {
        let config = OutputConfig {
            no_progress: true,
            ..Default::default()
        };
        let bar = ProgressBar::new(&config);
        assert!(!bar.is_visible());
        // updates on a hidden bar are no-ops
        bar.update(ProgressSnapshot::default());
    }

    #[test]
    fn test_progress_bar_follows_snapshots() {
        let bar = ProgressBar::new(&OutputConfig::default());
        assert!(bar.is_visible());

        let callback = bar.callback();
        callback(ProgressSnapshot {
            total_seen: 10,
            downloaded: 3,
            failed: 1,
            folders_created: 2,
        });
        assert_eq!(bar.position(), Some((4, Some(10))));

        bar.finish_and_clear();
    }
}
