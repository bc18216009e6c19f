//! Transport tuning for source open

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 10 MB read buffer for HTTP(S) sources
const HTTP_BUFFER_SIZE: usize = 10 * 1024 * 1024;
/// 5 MB read buffer for RTSP and RTMP sources
const RT_BUFFER_SIZE: usize = 5 * 1024 * 1024;
/// 1 MB read buffer for UDP sources
const UDP_BUFFER_SIZE: usize = 1024 * 1024;

/// Transport class of a source URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transport {
    /// Local file path or `file://`
    File,
    /// `http://` or `https://`
    Http,
    /// `rtsp://` or `rtsps://`
    Rtsp,
    /// `rtmp://` or `rtmps://`
    Rtmp,
    /// `udp://`
    Udp,
    /// Any other remote scheme
    OtherNetwork,
}

impl Transport {
    /// Classifies a URL by its scheme; scheme-less strings are local files
    pub fn from_url(url: &str) -> Transport {
        let scheme = match url.split_once("://") {
            Some((scheme, _)) => scheme.to_ascii_lowercase(),
            None => return Transport::File,
        };
        match scheme.as_str() {
            "file" => Transport::File,
            "http" | "https" => Transport::Http,
            "rtsp" | "rtsps" => Transport::Rtsp,
            "rtmp" | "rtmps" => Transport::Rtmp,
            "udp" => Transport::Udp,
            _ => Transport::OtherNetwork,
        }
    }

    /// Returns whether the transport crosses the network
    pub fn is_network(&self) -> bool {
        !matches!(self, Transport::File)
    }
}

/// Open options handed to the codec service as string pairs
///
/// The values are compile-time defaults per transport; embedders do not
/// configure them at runtime.
///
/// # Examples
///
/// ```
/// use lumenplay_demux::{InputOptions, Transport};
///
/// let options = InputOptions::for_url("rtsp://camera.local/stream");
/// assert_eq!(options.transport, Transport::Rtsp);
/// assert!(options.force_tcp);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputOptions {
    /// Transport class the options were derived for
    pub transport: Transport,
    /// Read buffer size in bytes, when tuned
    pub buffer_size: Option<usize>,
    /// Socket timeout, when tuned
    pub socket_timeout: Option<Duration>,
    /// Maximum demuxer-side delay, when tuned
    pub max_delay: Option<Duration>,
    /// Whether dropped connections are re-established automatically
    pub reconnect: bool,
    /// Cap on the reconnect backoff, starting from zero
    pub reconnect_max_backoff: Duration,
    /// Whether RTSP is forced onto TCP transport
    pub force_tcp: bool,
}

impl InputOptions {
    /// Derives the tuning for a URL
    pub fn for_url(url: &str) -> Self {
        let transport = Transport::from_url(url);
        match transport {
            Transport::File => Self {
                transport,
                buffer_size: None,
                socket_timeout: None,
                max_delay: None,
                reconnect: false,
                reconnect_max_backoff: Duration::ZERO,
                force_tcp: false,
            },
            Transport::Http => Self {
                transport,
                buffer_size: Some(HTTP_BUFFER_SIZE),
                socket_timeout: None,
                max_delay: Some(Duration::from_secs(5)),
                reconnect: true,
                reconnect_max_backoff: Duration::from_secs(5),
                force_tcp: false,
            },
            Transport::Rtsp => Self {
                transport,
                buffer_size: Some(RT_BUFFER_SIZE),
                socket_timeout: Some(Duration::from_secs(2)),
                max_delay: None,
                reconnect: true,
                reconnect_max_backoff: Duration::from_secs(5),
                force_tcp: true,
            },
            Transport::Rtmp => Self {
                transport,
                buffer_size: Some(RT_BUFFER_SIZE),
                socket_timeout: None,
                max_delay: None,
                reconnect: true,
                reconnect_max_backoff: Duration::from_secs(5),
                force_tcp: false,
            },
            Transport::Udp => Self {
                transport,
                buffer_size: Some(UDP_BUFFER_SIZE),
                socket_timeout: Some(Duration::from_secs(1)),
                max_delay: None,
                reconnect: false,
                reconnect_max_backoff: Duration::ZERO,
                force_tcp: false,
            },
            Transport::OtherNetwork => Self {
                transport,
                buffer_size: None,
                socket_timeout: None,
                max_delay: None,
                reconnect: true,
                reconnect_max_backoff: Duration::from_secs(5),
                force_tcp: false,
            },
        }
    }

    /// Renders the options as the string pairs the codec service consumes
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(size) = self.buffer_size {
            pairs.push(("buffer_size".to_string(), size.to_string()));
        }
        if let Some(timeout) = self.socket_timeout {
            pairs.push(("stimeout".to_string(), timeout.as_micros().to_string()));
        }
        if let Some(delay) = self.max_delay {
            pairs.push(("max_delay".to_string(), delay.as_micros().to_string()));
        }
        if self.reconnect {
            pairs.push(("reconnect".to_string(), "1".to_string()));
            pairs.push((
                "reconnect_delay_max".to_string(),
                self.reconnect_max_backoff.as_secs().to_string(),
            ));
        }
        if self.force_tcp {
            pairs.push(("rtsp_transport".to_string(), "tcp".to_string()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert_eq!(Transport::from_url("/tmp/movie.mp4"), Transport::File);
        assert_eq!(Transport::from_url("file:///tmp/movie.mp4"), Transport::File);
        assert_eq!(Transport::from_url("http://host/a.mp4"), Transport::Http);
        assert_eq!(Transport::from_url("HTTPS://host/a.mp4"), Transport::Http);
        assert_eq!(Transport::from_url("rtsp://cam/live"), Transport::Rtsp);
        assert_eq!(Transport::from_url("rtmps://cdn/app"), Transport::Rtmp);
        assert_eq!(Transport::from_url("udp://0.0.0.0:5000"), Transport::Udp);
        assert_eq!(Transport::from_url("srt://host:9000"), Transport::OtherNetwork);
    }

    #[test]
    fn test_http_tuning() {
        let options = InputOptions::for_url("https://host/movie.mp4");
        assert_eq!(options.buffer_size, Some(10 * 1024 * 1024));
        assert_eq!(options.max_delay, Some(Duration::from_secs(5)));
        assert!(options.reconnect);

        let pairs = options.to_pairs();
        assert!(pairs.contains(&("reconnect".to_string(), "1".to_string())));
        assert!(pairs.contains(&("reconnect_delay_max".to_string(), "5".to_string())));
    }

    #[test]
    fn test_rtsp_forces_tcp() {
        let options = InputOptions::for_url("rtsp://cam/live");
        assert!(options.force_tcp);
        assert_eq!(options.socket_timeout, Some(Duration::from_secs(2)));
        assert!(options
            .to_pairs()
            .contains(&("rtsp_transport".to_string(), "tcp".to_string())));
    }

    #[test]
    fn test_local_file_needs_no_tuning() {
        let options = InputOptions::for_url("movie.mkv");
        assert!(options.to_pairs().is_empty());
    }

    #[test]
    fn test_udp_tuning() {
        let options = InputOptions::for_url("udp://239.0.0.1:1234");
        assert_eq!(options.buffer_size, Some(1024 * 1024));
        assert_eq!(options.socket_timeout, Some(Duration::from_secs(1)));
        assert!(!options.reconnect);
    }
}
