use crate::media::MediaConstraints;
use meshcall_core::IceServerConfig;
use meshcall_core::utils::{DEFAULT_SIGNALING_URL, default_stun_urls};
use std::env;

pub const SIGNALING_URL_ENV: &str = "MESHCALL_SIGNALING_URL";
pub const ICE_SERVERS_ENV: &str = "MESHCALL_ICE_SERVERS";
pub const ICE_USERNAME_ENV: &str = "MESHCALL_ICE_USERNAME";
pub const ICE_CREDENTIAL_ENV: &str = "MESHCALL_ICE_CREDENTIAL";

/// Settings for one call session.
#[derive(Debug, Clone)]
pub struct CallConfig {
    pub signaling_url: String,
    /// Handed to every peer connection at construction. Empty means host
    /// candidates only.
    pub ice_servers: Vec<IceServerConfig>,
    pub media: MediaConstraints,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            signaling_url: DEFAULT_SIGNALING_URL.to_owned(),
            ice_servers: vec![IceServerConfig::new(default_stun_urls())],
            media: MediaConstraints::default(),
        }
    }
}

impl CallConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup(SIGNALING_URL_ENV).filter(|v| !v.trim().is_empty()) {
            config.signaling_url = url.trim().to_owned();
        }

        if let Some(raw) = lookup(ICE_SERVERS_ENV) {
            let urls: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect();
            if !urls.is_empty() {
                config.ice_servers = vec![IceServerConfig::new(urls)];
            }
        }

        let username = lookup(ICE_USERNAME_ENV);
        let credential = lookup(ICE_CREDENTIAL_ENV);
        if username.is_some() || credential.is_some() {
            for server in &mut config.ice_servers {
                server.username = username.clone();
                server.credential = credential.clone();
            }
        }

        config
    }
}
