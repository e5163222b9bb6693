//! Server configuration.

/// Configuration for the reference remote store.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum number of change-log entries returned per page.
    pub page_size: usize,
    /// Capacity of the push notification channel.
    pub notify_capacity: usize,
}

impl ServerConfig {
    /// Creates a configuration with the given page size.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            notify_capacity: 64,
        }
    }

    /// Sets the page size. Zero is raised to one.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Sets the push notification channel capacity.
    pub fn with_notify_capacity(mut self, capacity: usize) -> Self {
        self.notify_capacity = capacity.max(1);
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(100)
    }
}
