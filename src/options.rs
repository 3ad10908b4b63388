//! Transport configuration shared by all services.

use std::collections::HashMap;
use std::time::Duration;

/// Default number of decoded events buffered between the stream reader task
/// and the consumer of an [`EventStream`](crate::stream::EventStream).
pub const DEFAULT_STREAM_CAPACITY: usize = 32;

/// HTTP transport options.
///
/// # Example
/// ```rust
/// use pollen::options::TransportOptions;
/// use std::time::Duration;
///
/// let options = TransportOptions::default()
///     .with_timeout(Duration::from_secs(30))
///     .with_header("Referer".to_string(), "my-app".to_string());
/// assert_eq!(options.timeout, Some(Duration::from_secs(30)));
/// ```
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Request timeout. Applies to the whole request, so leave it unset for
    /// long-lived feed subscriptions.
    pub timeout: Option<Duration>,

    /// Overrides the service's default base URL
    pub base_url: Option<String>,

    /// HTTP proxy URL
    pub proxy: Option<String>,

    /// Additional HTTP headers to include in requests
    pub extra_headers: Option<HashMap<String, String>>,

    /// Bound of the channel behind each chat-completion event stream
    pub stream_capacity: usize,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            base_url: None,
            proxy: None,
            extra_headers: None,
            stream_capacity: DEFAULT_STREAM_CAPACITY,
        }
    }
}

impl TransportOptions {
    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Set the proxy URL.
    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Set extra headers.
    pub fn with_extra_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.extra_headers = Some(headers);
        self
    }

    /// Add a single extra header.
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key, value);
        self
    }

    /// Set the event stream channel bound. Zero is raised to one.
    pub fn with_stream_capacity(mut self, capacity: usize) -> Self {
        self.stream_capacity = capacity.max(1);
        self
    }
}
