// Inventory module for deployment targets

mod filter;

pub use filter::FilterCriteria;

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// A single deployment target
#[derive(Debug, Clone)]
pub struct Host {
    /// Unique key identifying the host within a run
    pub hostname: String,
    pub address: String,
    pub group: String,
    pub tags: HashSet<String>,
    /// Per-host connection override; falls back to the run-level default
    pub connection: Option<ConnectionConfig>,
}

impl Host {
    pub fn new(hostname: impl Into<String>) -> Self {
        let hostname = hostname.into();
        Host {
            address: hostname.clone(),
            hostname,
            group: "default".to_string(),
            tags: HashSet::new(),
            connection: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_connection(mut self, connection: ConnectionConfig) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Connection settings for reaching a host.
///
/// Credential material itself (key files, agents) is the host application's
/// concern; this only carries the knobs a runner needs to address the target.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub user: Option<String>,
    pub port: u16,
    pub private_key: Option<PathBuf>,
    pub ssh_config_file: Option<PathBuf>,
    pub connect_timeout: Duration,
    pub sudo: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            user: None,
            port: 22,
            private_key: None,
            ssh_config_file: None,
            connect_timeout: Duration::from_secs(30),
            sudo: false,
        }
    }
}

impl ConnectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_private_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.private_key = Some(path.into());
        self
    }

    pub fn with_ssh_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ssh_config_file = Some(path.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }
}
