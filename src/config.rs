use std::time::Duration;

use commonsfish_core::{default_zones, Board};
use url::Url;

use crate::error::{ClientError, Result};

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(1_500);
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;
pub const CHANNEL_PATH: &str = "/ws";

/// Settings for one client connection.
///
/// ```
/// use commonsfish::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::from_origin("https://pond.example.org")
///     .unwrap()
///     .with_reconnect_delay(Duration::from_secs(3));
/// assert_eq!(config.ws_url.as_str(), "wss://pond.example.org/ws");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub ws_url: Url,
    /// Fixed wait between a channel close and the next connect attempt.
    pub reconnect_delay: Duration,
    /// `None` retries forever. The count resets once a handshake is acknowledged.
    pub max_reconnect_attempts: Option<u32>,
    pub event_channel_capacity: usize,
    /// Seed for token drift; random when unset.
    pub board_seed: Option<u64>,
}

impl ClientConfig {
    pub fn new(ws_url: Url) -> Self {
        Self {
            ws_url,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_reconnect_attempts: None,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            board_seed: None,
        }
    }

    /// Builds the channel url from the hosting page origin.
    pub fn from_origin(origin: &str) -> Result<Self> {
        Ok(Self::new(channel_url_for_origin(origin)?))
    }

    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: Option<u32>) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub fn with_board_seed(mut self, seed: u64) -> Self {
        self.board_seed = Some(seed);
        self
    }

    /// Fresh board with the standard nets, seeded when a seed is set.
    pub fn board(&self) -> Board {
        match self.board_seed {
            Some(seed) => Board::with_seed(default_zones(), seed),
            None => Board::new(default_zones()),
        }
    }
}

/// Secure pages get a secure channel; plain pages get a plain one.
pub fn channel_url_for_origin(origin: &str) -> Result<Url> {
    let mut url = Url::parse(origin.trim())?;
    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => return Err(ClientError::UnsupportedScheme(other.to_string())),
    };
    url.set_scheme(scheme)
        .map_err(|_| ClientError::UnsupportedScheme(scheme.to_string()))?;
    let path = url.path().trim_end_matches('/');
    if path.is_empty() {
        url.set_path(CHANNEL_PATH);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_origins_map_to_channel_urls() {
        let secure = channel_url_for_origin("https://pond.example.org").expect("https origin");
        assert_eq!(secure.as_str(), "wss://pond.example.org/ws");
        let plain = channel_url_for_origin("http://localhost:8000/").expect("http origin");
        assert_eq!(plain.as_str(), "ws://localhost:8000/ws");
    }

    #[test]
    fn explicit_channel_paths_are_kept() {
        let url = channel_url_for_origin("ws://127.0.0.1:9000/rooms/ws").expect("ws url");
        assert_eq!(url.as_str(), "ws://127.0.0.1:9000/rooms/ws");
    }

    #[test]
    fn other_schemes_are_rejected() {
        assert!(matches!(
            channel_url_for_origin("ftp://pond.example.org"),
            Err(ClientError::UnsupportedScheme(scheme)) if scheme == "ftp"
        ));
    }

    #[test]
    fn event_capacity_is_at_least_one() {
        let config = ClientConfig::from_origin("http://localhost")
            .expect("origin")
            .with_event_channel_capacity(0);
        assert_eq!(config.event_channel_capacity, 1);
    }
}
