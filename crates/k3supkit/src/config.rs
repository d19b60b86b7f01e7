//! Raw configuration input and its normalization.
//!
//! [`RawConfig`] mirrors the flat parameter record an automation host hands
//! over: every field optional, values possibly still strings. It can be
//! deserialized (e.g. from a TOML file), filled from `key=value` pairs, and
//! layered. [`RawConfig::normalize`] validates it and applies defaults,
//! producing an immutable [`Configuration`].

use crate::error::{Error, Result};
use crate::types::{Action, Configuration, JoinOptions};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default path of the k3sup binary.
pub const DEFAULT_INSTALLER: &str = "/usr/local/bin/k3sup";
/// Default target address.
pub const DEFAULT_IP: &str = "127.0.0.1";
/// Default SSH user.
pub const DEFAULT_USER: &str = "root";
/// Default SSH port.
pub const DEFAULT_SSH_PORT: u16 = 22;
/// Default SSH key.
pub const DEFAULT_SSH_KEY: &str = "~/.ssh/id_rsa";
/// Default kubeconfig destination.
pub const DEFAULT_LOCAL_PATH: &str = "./kubeconfig";
/// Default kubeconfig context name.
pub const DEFAULT_CONTEXT: &str = "default";

/// Every key accepted by [`RawConfig::set`].
pub const KEYS: &[&str] = &[
    "action",
    "installer",
    "ip",
    "user",
    "ssh_key",
    "ssh_port",
    "local_path",
    "local",
    "merge",
    "context",
    "sudo",
    "skip_install",
    "no_extras",
    "server",
    "server_ip",
    "server_ssh_port",
    "server_user",
    "cluster",
    "datastore",
    "k3s_extra_args",
    "k3s_version",
    "ipsec",
];

/// Unvalidated configuration record. `None` means "use the default".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    /// `server` or `agent`; required
    pub action: Option<String>,
    /// Path to the k3sup binary
    #[serde(alias = "k3sup_bin")]
    pub installer: Option<String>,
    /// Public IP of the node
    pub ip: Option<String>,
    /// SSH user
    pub user: Option<String>,
    /// SSH key path
    pub ssh_key: Option<String>,
    /// SSH port
    pub ssh_port: Option<i64>,
    /// Kubeconfig destination
    pub local_path: Option<String>,
    /// Local install without SSH
    pub local: Option<bool>,
    /// Merge into an existing kubeconfig
    pub merge: Option<bool>,
    /// Kubeconfig context name
    pub context: Option<String>,
    /// Use sudo on the target
    pub sudo: Option<bool>,
    /// Only fetch the kubeconfig
    pub skip_install: Option<bool>,
    /// Disable servicelb and traefik
    pub no_extras: Option<bool>,
    /// Join as a server
    pub server: Option<bool>,
    /// Existing server IP
    pub server_ip: Option<String>,
    /// Existing server SSH port
    pub server_ssh_port: Option<i64>,
    /// Existing server SSH user
    pub server_user: Option<String>,
    /// Clustering mode
    pub cluster: Option<bool>,
    /// Datastore connection string
    pub datastore: Option<String>,
    /// Extra k3s installer arguments
    pub k3s_extra_args: Option<String>,
    /// Pinned k3s version
    pub k3s_version: Option<String>,
    /// ipsec flannel backend
    pub ipsec: Option<bool>,
}

impl RawConfig {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from `key=value` style pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut raw = Self::new();
        for (key, value) in pairs {
            raw.set(key.as_ref(), value.as_ref())?;
        }
        Ok(raw)
    }

    /// Set one field from its string form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let text = || Some(value.to_string());
        match key {
            "action" => self.action = text(),
            "installer" | "k3sup_bin" => self.installer = text(),
            "ip" => self.ip = text(),
            "user" => self.user = text(),
            "ssh_key" => self.ssh_key = text(),
            "ssh_port" => self.ssh_port = Some(parse_int(key, value)?),
            "local_path" => self.local_path = text(),
            "local" => self.local = Some(parse_bool(key, value)?),
            "merge" => self.merge = Some(parse_bool(key, value)?),
            "context" => self.context = text(),
            "sudo" => self.sudo = Some(parse_bool(key, value)?),
            "skip_install" => self.skip_install = Some(parse_bool(key, value)?),
            "no_extras" => self.no_extras = Some(parse_bool(key, value)?),
            "server" => self.server = Some(parse_bool(key, value)?),
            "server_ip" => self.server_ip = text(),
            "server_ssh_port" => self.server_ssh_port = Some(parse_int(key, value)?),
            "server_user" => self.server_user = text(),
            "cluster" => self.cluster = Some(parse_bool(key, value)?),
            "datastore" => self.datastore = text(),
            "k3s_extra_args" => self.k3s_extra_args = text(),
            "k3s_version" => self.k3s_version = text(),
            "ipsec" => self.ipsec = Some(parse_bool(key, value)?),
            other => {
                return Err(Error::validation(format!(
                    "unknown key '{other}' (expected one of: {})",
                    KEYS.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Parse and set a `key=value` assignment.
    pub fn set_assignment(&mut self, assignment: &str) -> Result<()> {
        let (key, value) = assignment.split_once('=').ok_or_else(|| {
            Error::validation(format!("expected key=value, got '{assignment}'"))
        })?;
        self.set(key.trim(), value.trim())
    }

    /// Layer `other` on top of `self`; fields set in `other` win.
    #[must_use]
    pub fn overlay(self, other: RawConfig) -> Self {
        Self {
            action: other.action.or(self.action),
            installer: other.installer.or(self.installer),
            ip: other.ip.or(self.ip),
            user: other.user.or(self.user),
            ssh_key: other.ssh_key.or(self.ssh_key),
            ssh_port: other.ssh_port.or(self.ssh_port),
            local_path: other.local_path.or(self.local_path),
            local: other.local.or(self.local),
            merge: other.merge.or(self.merge),
            context: other.context.or(self.context),
            sudo: other.sudo.or(self.sudo),
            skip_install: other.skip_install.or(self.skip_install),
            no_extras: other.no_extras.or(self.no_extras),
            server: other.server.or(self.server),
            server_ip: other.server_ip.or(self.server_ip),
            server_ssh_port: other.server_ssh_port.or(self.server_ssh_port),
            server_user: other.server_user.or(self.server_user),
            cluster: other.cluster.or(self.cluster),
            datastore: other.datastore.or(self.datastore),
            k3s_extra_args: other.k3s_extra_args.or(self.k3s_extra_args),
            k3s_version: other.k3s_version.or(self.k3s_version),
            ipsec: other.ipsec.or(self.ipsec),
        }
    }

    /// Validate the record and apply defaults.
    pub fn normalize(&self) -> Result<Configuration> {
        let action: Action = self
            .action
            .as_deref()
            .ok_or_else(|| Error::validation("action is required (server or agent)"))?
            .trim()
            .parse()?;

        let installer = self.installer.as_deref().unwrap_or(DEFAULT_INSTALLER).trim();
        if installer.is_empty() {
            return Err(Error::validation("installer path must not be empty"));
        }
        let installer = PathBuf::from(shellexpand::tilde(installer).as_ref());

        let ip = required_text("ip", self.ip.as_deref(), DEFAULT_IP)?;
        let user = required_text("user", self.user.as_deref(), DEFAULT_USER)?;

        let ssh_port = match self.ssh_port {
            Some(port) => port_number("ssh_port", port)?,
            None => DEFAULT_SSH_PORT,
        };

        let join = JoinOptions {
            server: self.server.unwrap_or(false),
            server_ip: optional_text(self.server_ip.as_deref()),
            server_ssh_port: self
                .server_ssh_port
                .map(|port| port_number("server_ssh_port", port))
                .transpose()?,
            server_user: optional_text(self.server_user.as_deref()),
            cluster: self.cluster.unwrap_or(false),
            datastore: optional_text(self.datastore.as_deref()),
        };

        if action == Action::Server && !join.is_empty() {
            log::warn!(
                "join options (server, server_ip, server_user, server_ssh_port, cluster, datastore) \
                 are set for a server node; they are passed to k3sup install unchanged"
            );
        }

        let config = Configuration {
            action,
            installer,
            ip,
            user,
            ssh_key: self
                .ssh_key
                .clone()
                .unwrap_or_else(|| DEFAULT_SSH_KEY.to_string()),
            ssh_port,
            local_path: self
                .local_path
                .clone()
                .unwrap_or_else(|| DEFAULT_LOCAL_PATH.to_string()),
            local: self.local.unwrap_or(false),
            merge: self.merge.unwrap_or(false),
            context: self
                .context
                .clone()
                .unwrap_or_else(|| DEFAULT_CONTEXT.to_string()),
            sudo: self.sudo.unwrap_or(true),
            skip_install: self.skip_install.unwrap_or(false),
            no_extras: self.no_extras.unwrap_or(false),
            join,
            k3s_extra_args: optional_text(self.k3s_extra_args.as_deref()),
            k3s_version: optional_text(self.k3s_version.as_deref()),
            ipsec: self.ipsec.unwrap_or(false),
        };

        log::debug!(
            "Normalized {} configuration for {} (installer {})",
            config.action,
            config.ip,
            config.installer.display()
        );

        Ok(config)
    }
}

fn required_text(key: &str, value: Option<&str>, default: &str) -> Result<String> {
    let value = value.unwrap_or(default).trim();
    if value.is_empty() {
        return Err(Error::validation(format!("{key} must not be empty")));
    }
    Ok(value.to_string())
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn port_number(key: &str, value: i64) -> Result<u16> {
    u16::try_from(value)
        .ok()
        .filter(|port| *port > 0)
        .ok_or_else(|| {
            Error::validation(format!(
                "{key} must be a positive port number (1-65535), got {value}"
            ))
        })
}

fn parse_int(key: &str, value: &str) -> Result<i64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::validation(format!("{key} must be an integer, got '{value}'")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(Error::validation(format!(
            "{key} must be a boolean, got '{value}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RawConfig::from_pairs([("action", "server")])
            .unwrap()
            .normalize()
            .unwrap();

        assert_eq!(config.action, Action::Server);
        assert_eq!(config.installer, PathBuf::from(DEFAULT_INSTALLER));
        assert_eq!(config.ip, "127.0.0.1");
        assert_eq!(config.user, "root");
        assert_eq!(config.ssh_port, 22);
        assert_eq!(config.ssh_key, "~/.ssh/id_rsa");
        assert_eq!(config.local_path, "./kubeconfig");
        assert_eq!(config.context, "default");
        assert!(config.sudo);
        assert!(!config.merge);
        assert!(!config.skip_install);
        assert!(config.join.is_empty());
        assert!(config.k3s_version.is_none());
    }

    #[test]
    fn test_action_required() {
        let err = RawConfig::new().normalize().unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("action is required"));
    }

    #[test]
    fn test_invalid_action() {
        let err = RawConfig::from_pairs([("action", "worker")])
            .unwrap()
            .normalize()
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_port_validation() {
        for bad in ["0", "-22", "70000"] {
            let err = RawConfig::from_pairs([("action", "agent"), ("ssh_port", bad)])
                .unwrap()
                .normalize()
                .unwrap_err();
            assert!(err.is_validation(), "port {bad} should be rejected");
        }

        let err = RawConfig::from_pairs([("action", "agent"), ("server_ssh_port", "0")])
            .unwrap()
            .normalize()
            .unwrap_err();
        assert!(err.to_string().contains("server_ssh_port"));

        let config = RawConfig::from_pairs([("action", "agent"), ("ssh_port", "2222")])
            .unwrap()
            .normalize()
            .unwrap();
        assert_eq!(config.ssh_port, 2222);
    }

    #[test]
    fn test_non_numeric_port_rejected_on_set() {
        let err = RawConfig::from_pairs([("ssh_port", "twenty-two")]).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("ssh_port"));
    }

    #[test]
    fn test_empty_installer_rejected() {
        let err = RawConfig::from_pairs([("action", "server"), ("installer", "  ")])
            .unwrap()
            .normalize()
            .unwrap_err();
        assert!(err.to_string().contains("installer path"));
    }

    #[test]
    fn test_installer_tilde_is_expanded() {
        let config = RawConfig::from_pairs([("action", "server"), ("k3sup_bin", "~/bin/k3sup")])
            .unwrap()
            .normalize()
            .unwrap();
        assert!(config.installer.ends_with("bin/k3sup"));
        if home_is_set() {
            assert!(!config.installer.starts_with("~"));
        }
    }

    fn home_is_set() -> bool {
        std::env::var_os("HOME").is_some()
    }

    #[test]
    fn test_unknown_key() {
        let err = RawConfig::from_pairs([("flannel", "wireguard")]).unwrap_err();
        assert!(err.to_string().contains("unknown key 'flannel'"));
    }

    #[test]
    fn test_bool_parsing() {
        let raw = RawConfig::from_pairs([
            ("sudo", "no"),
            ("merge", "yes"),
            ("ipsec", "1"),
            ("cluster", "TRUE"),
        ])
        .unwrap();
        assert_eq!(raw.sudo, Some(false));
        assert_eq!(raw.merge, Some(true));
        assert_eq!(raw.ipsec, Some(true));
        assert_eq!(raw.cluster, Some(true));

        assert!(RawConfig::from_pairs([("sudo", "maybe")]).is_err());
    }

    #[test]
    fn test_set_assignment() {
        let mut raw = RawConfig::new();
        raw.set_assignment("ip = 10.0.0.5").unwrap();
        assert_eq!(raw.ip.as_deref(), Some("10.0.0.5"));

        // Values may contain '='
        raw.set_assignment("datastore=mysql://u:p@tcp(db:3306)/k3s?tls=true")
            .unwrap();
        assert_eq!(
            raw.datastore.as_deref(),
            Some("mysql://u:p@tcp(db:3306)/k3s?tls=true")
        );

        assert!(raw.set_assignment("no-equals-sign").is_err());
    }

    #[test]
    fn test_overlay_later_wins() {
        let file = RawConfig::from_pairs([("action", "server"), ("ip", "1.1.1.1"), ("user", "ubuntu")])
            .unwrap();
        let cli = RawConfig::from_pairs([("ip", "2.2.2.2")]).unwrap();

        let merged = file.overlay(cli);
        assert_eq!(merged.action.as_deref(), Some("server"));
        assert_eq!(merged.ip.as_deref(), Some("2.2.2.2"));
        assert_eq!(merged.user.as_deref(), Some("ubuntu"));
    }

    #[test]
    fn test_empty_optional_strings_are_unset() {
        let config = RawConfig::from_pairs([
            ("action", "agent"),
            ("server_ip", ""),
            ("k3s_version", " "),
        ])
        .unwrap()
        .normalize()
        .unwrap();
        assert!(config.join.server_ip.is_none());
        assert!(config.k3s_version.is_none());
    }

    #[test]
    fn test_join_options_kept_for_server() {
        let config = RawConfig::from_pairs([
            ("action", "server"),
            ("cluster", "true"),
            ("datastore", "postgres://db/k3s"),
        ])
        .unwrap()
        .normalize()
        .unwrap();
        assert!(config.join.cluster);
        assert_eq!(config.join.datastore.as_deref(), Some("postgres://db/k3s"));
    }

    #[test]
    fn test_deserialize_from_toml() {
        let raw: RawConfig = toml::from_str(
            r#"
            action = "agent"
            k3sup_bin = "/opt/k3sup"
            ip = "10.0.0.3"
            server_ip = "10.0.0.1"
            ssh_port = 2022
            sudo = false
            "#,
        )
        .unwrap();
        let config = raw.normalize().unwrap();
        assert_eq!(config.action, Action::Agent);
        assert_eq!(config.installer, PathBuf::from("/opt/k3sup"));
        assert_eq!(config.ssh_port, 2022);
        assert_eq!(config.join.server_ip.as_deref(), Some("10.0.0.1"));
        assert!(!config.sudo);

        let unknown: std::result::Result<RawConfig, _> = toml::from_str("flannel = \"x\"");
        assert!(unknown.is_err());
    }
}
