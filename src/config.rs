use std::net::SocketAddr;
use std::time::Duration;

/// Settings for the dashboard side: where the authoritative API and the
/// push feed live, and how the confirmation loop paces itself.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Base URL of the request/response API (no trailing slash).
    pub api_url: String,
    /// Websocket URL of the vehicle position feed.
    pub feed_url: String,
    /// Delay before forcing a driver fetch after the patch map changes.
    pub confirm_debounce_ms: u64,
    /// Fixed delay between feed reconnect attempts.
    pub reconnect_delay_ms: u64,
    /// Per-request timeout for API calls.
    pub request_timeout_ms: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3002".to_string(),
            feed_url: "ws://localhost:3001".to_string(),
            confirm_debounce_ms: 1000,
            reconnect_delay_ms: 2000,
            request_timeout_ms: 10_000,
        }
    }
}

impl DashboardConfig {
    pub fn new(api_url: impl Into<String>, feed_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            feed_url: feed_url.into(),
            ..Default::default()
        }
    }

    pub fn with_confirm_debounce_ms(mut self, ms: u64) -> Self {
        self.confirm_debounce_ms = ms;
        self
    }

    pub fn with_reconnect_delay_ms(mut self, ms: u64) -> Self {
        self.reconnect_delay_ms = ms;
        self
    }

    pub fn confirm_debounce(&self) -> Duration {
        Duration::from_millis(self.confirm_debounce_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Settings for the reference backend (REST API plus position feed).
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub rest_addr: SocketAddr,
    pub feed_addr: SocketAddr,
    /// Interval between position broadcasts.
    pub feed_interval_ms: u64,
    /// Maximum lat/lng step applied per broadcast.
    pub jitter: f64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            // SAFETY: hardcoded addresses that always parse
            rest_addr: "127.0.0.1:3002"
                .parse()
                .expect("default REST address is valid"),
            feed_addr: "127.0.0.1:3001"
                .parse()
                .expect("default feed address is valid"),
            feed_interval_ms: 2000,
            jitter: 0.001,
        }
    }
}

impl BackendConfig {
    pub fn new(rest_addr: SocketAddr, feed_addr: SocketAddr) -> Self {
        Self {
            rest_addr,
            feed_addr,
            ..Default::default()
        }
    }

    pub fn with_feed_interval_ms(mut self, ms: u64) -> Self {
        self.feed_interval_ms = ms;
        self
    }

    pub fn feed_interval(&self) -> Duration {
        Duration::from_millis(self.feed_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_config_default() {
        let cfg = DashboardConfig::default();
        assert_eq!(cfg.api_url, "http://localhost:3002");
        assert_eq!(cfg.feed_url, "ws://localhost:3001");
        assert_eq!(cfg.confirm_debounce_ms, 1000);
        assert_eq!(cfg.reconnect_delay_ms, 2000);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn dashboard_config_new_strips_trailing_slash() {
        let cfg = DashboardConfig::new("http://10.0.0.1:8080/", "ws://10.0.0.1:8081");
        assert_eq!(cfg.api_url, "http://10.0.0.1:8080");
        assert_eq!(cfg.feed_url, "ws://10.0.0.1:8081");
        assert_eq!(cfg.confirm_debounce_ms, 1000);
    }

    #[test]
    fn dashboard_config_builders() {
        let cfg = DashboardConfig::default()
            .with_confirm_debounce_ms(50)
            .with_reconnect_delay_ms(10);
        assert_eq!(cfg.confirm_debounce(), Duration::from_millis(50));
        assert_eq!(cfg.reconnect_delay(), Duration::from_millis(10));
    }

    #[test]
    fn backend_config_default() {
        let cfg = BackendConfig::default();
        assert_eq!(cfg.rest_addr.to_string(), "127.0.0.1:3002");
        assert_eq!(cfg.feed_addr.to_string(), "127.0.0.1:3001");
        assert_eq!(cfg.feed_interval(), Duration::from_secs(2));
        assert!((cfg.jitter - 0.001).abs() < f64::EPSILON);
    }

    #[test]
    fn backend_config_new() {
        let rest: SocketAddr = "0.0.0.0:9002".parse().unwrap();
        let feed: SocketAddr = "0.0.0.0:9001".parse().unwrap();
        let cfg = BackendConfig::new(rest, feed).with_feed_interval_ms(100);
        assert_eq!(cfg.rest_addr, rest);
        assert_eq!(cfg.feed_addr, feed);
        assert_eq!(cfg.feed_interval_ms, 100);
    }
}
