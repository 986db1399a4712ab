use serde::Deserialize;
use stagelink_core::{IceServerConfig, RoomId};

use crate::media::MediaConstraints;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:stun1.l.google.com:19302";

pub const BACKEND_URL_VAR: &str = "STAGELINK_BACKEND_URL";
pub const DEBUG_VAR: &str = "STAGELINK_DEBUG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct VideoConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            ideal_width: 1280,
            ideal_height: 720,
        }
    }
}

/// Client-side settings for a [`Session`](crate::Session).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// REST base url of the backend; the signaling socket lives on the same host.
    pub backend_url: String,
    pub ice_servers: Vec<IceServerConfig>,
    pub video: VideoConstraints,
    pub audio: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_owned(),
            ice_servers: vec![IceServerConfig {
                urls: vec![DEFAULT_STUN_ADDR.to_owned(), DEFAULT_STUN_ADDR_2.to_owned()],
                username: None,
                credential: None,
            }],
            video: VideoConstraints::default(),
            audio: true,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Debug mode pins the backend to localhost, otherwise the backend url
    /// variable wins over the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let debug = lookup(DEBUG_VAR).is_some_and(|v| v.eq_ignore_ascii_case("true"));

        if !debug {
            if let Some(url) = lookup(BACKEND_URL_VAR).filter(|u| !u.trim().is_empty()) {
                config.backend_url = url;
            }
        }

        config
    }

    pub fn media_constraints(&self) -> MediaConstraints {
        MediaConstraints {
            audio: self.audio,
            video: Some(self.video),
        }
    }

    /// `{ws|wss}://{host}/ws/webrtc/{room}/?token={token}`
    pub fn signaling_url(&self, room: &RoomId, token: &str) -> String {
        let base = self.backend_url.trim().trim_end_matches('/');
        let base = base.strip_suffix("/api/v1").unwrap_or(base);

        let (scheme, host) = if let Some(host) = base.strip_prefix("https://") {
            ("wss", host)
        } else if let Some(host) = base.strip_prefix("http://") {
            ("ws", host)
        } else {
            ("ws", base)
        };

        format!("{scheme}://{host}/ws/webrtc/{room}/?token={token}")
    }
}
