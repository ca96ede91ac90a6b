use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use stardex::FetchProgress;

/// Interactive progress reporter using indicatif.
///
/// The bar is created on `FetchStarted`, once the page count is known, and
/// counts items-equivalent (pages times page size).
pub struct InteractiveReporter {
    bar: Mutex<Option<ProgressBar>>,
    hidden: bool,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
            hidden: false,
        }
    }

    /// A reporter that tracks state without drawing anything.
    #[cfg(test)]
    fn hidden() -> Self {
        Self {
            bar: Mutex::new(None),
            hidden: true,
        }
    }

    pub fn handle(&self, event: FetchProgress) {
        let mut slot = self.bar.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            FetchProgress::FetchStarted {
                subject,
                total_pages,
            } => {
                let pb = ProgressBar::new(u64::from(total_pages) * u64::from(stardex::PAGE_SIZE));
                if self.hidden {
                    pb.set_draw_target(ProgressDrawTarget::hidden());
                }
                pb.set_style(Self::bar_style());
                pb.set_prefix(format!("{:12}", subject));
                pb.set_message(format!("{} page(s)", total_pages));
                *slot = Some(pb);
            }

            FetchProgress::PageFetched {
                page,
                current,
                total,
                ..
            } => {
                if let Some(pb) = slot.as_ref() {
                    if pb.length() != Some(total) {
                        pb.set_length(total);
                    }
                    pb.set_position(current.max(pb.position()));
                    pb.set_message(format!("page {}", page));
                }
            }

            FetchProgress::FetchComplete { total_items } => {
                if let Some(pb) = slot.take() {
                    pb.finish_with_message(format!("✓ {} repositories", total_items));
                }
            }

            _ => {}
        }
    }

    pub fn abandon(&self) {
        let mut slot = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(pb) = slot.take() {
            pb.abandon_with_message("✗ interrupted");
        }
    }

    #[cfg(test)]
    fn position(&self) -> Option<(u64, Option<u64>)> {
        let slot = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        slot.as_ref().map(|pb| (pb.position(), pb.length()))
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>5}/{len:5} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░")
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_follows_fetch_events() {
        let reporter = InteractiveReporter::hidden();
        assert_eq!(reporter.position(), None);

        reporter.handle(FetchProgress::FetchStarted {
            subject: "octocat".to_string(),
            total_pages: 3,
        });
        assert_eq!(reporter.position(), Some((0, Some(300))));

        for (page, current) in [(1, 100), (3, 200), (2, 300)] {
            reporter.handle(FetchProgress::PageFetched {
                page,
                count: 100,
                current,
                total: 300,
            });
        }
        assert_eq!(reporter.position(), Some((300, Some(300))));

        reporter.handle(FetchProgress::FetchComplete { total_items: 250 });
        assert_eq!(reporter.position(), None);
    }

    #[test]
    fn test_abandon_clears_bar() {
        let reporter = InteractiveReporter::hidden();
        reporter.handle(FetchProgress::FetchStarted {
            subject: "octocat".to_string(),
            total_pages: 1,
        });
        reporter.abandon();
        assert_eq!(reporter.position(), None);
    }

    #[test]
    fn test_page_events_before_start_are_ignored() {
        let reporter = InteractiveReporter::hidden();
        reporter.handle(FetchProgress::PageFetched {
            page: 1,
            count: 10,
            current: 10,
            total: 100,
        });
        assert_eq!(reporter.position(), None);
    }
}
