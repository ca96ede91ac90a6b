use stardex::FetchProgress;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: FetchProgress) {
        match event {
            FetchProgress::FetchStarted {
                subject,
                total_pages,
            } => {
                tracing::info!(subject = %subject, total_pages, "Fetching starred repositories");
            }

            FetchProgress::PageFetched {
                page,
                count,
                current,
                total,
            } => {
                tracing::debug!(page, count, current, total, "Fetched page");
            }

            FetchProgress::FetchComplete { total_items } => {
                tracing::info!(total_items, "Fetch complete");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
