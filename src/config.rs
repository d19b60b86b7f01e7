//! Node configuration loading.
//!
//! Sources are layered lowest first: the TOML config file, `--set key=value`
//! assignments, then the dedicated `--action`, `--ip` and `--installer` flags.

use crate::cli::NodeArgs;
use crate::paths;
use anyhow::{Context, Result, bail};
use k3supkit::{Action, Configuration, RawConfig};
use std::fs;
use std::path::{Path, PathBuf};

/// Pick the config file: an explicit path must exist, the default is optional.
pub fn config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    match explicit {
        Some(path) => {
            let path = paths::expand(&path.to_string_lossy());
            if !path.is_file() {
                bail!("Config file not found: {}", path.display());
            }
            Ok(Some(path))
        }
        None => paths::default_config_file(),
    }
}

/// Parse a TOML node configuration file.
pub fn load_file(path: &Path) -> Result<RawConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid node config in {}", path.display()))
}

/// The overrides carried by command-line flags.
fn flag_overrides(node: &NodeArgs) -> Result<RawConfig> {
    let mut raw = RawConfig::new();
    for assignment in &node.set {
        raw.set_assignment(assignment)
            .with_context(|| format!("Invalid --set {assignment}"))?;
    }

    let mut dedicated = RawConfig::new();
    if let Some(action) = node.action {
        dedicated.set("action", Action::from(action).name())?;
    }
    if let Some(ip) = &node.ip {
        dedicated.set("ip", ip)?;
    }
    if let Some(installer) = &node.installer {
        dedicated.set("installer", installer)?;
    }

    Ok(raw.overlay(dedicated))
}

/// Merge every source and validate the result.
pub fn resolve(explicit: Option<&Path>, node: &NodeArgs) -> Result<Configuration> {
    let base = match config_file(explicit)? {
        Some(path) => {
            log::info!("Loading node config from {}", path.display());
            load_file(&path)?
        }
        None => {
            log::debug!("No config file, using flags only");
            RawConfig::new()
        }
    };

    let raw = base.overlay(flag_overrides(node)?);
    Ok(raw.normalize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ActionArg;
    use crate::paths::test_env::{lock, with_var};
    use tempfile::TempDir;

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("node.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_file() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            tmp.path(),
            r#"
action = "agent"
ip = "10.0.0.7"
server_ip = "10.0.0.1"
ssh_port = 2222
sudo = false
"#,
        );

        let config = load_file(&path).unwrap().normalize().unwrap();
        assert_eq!(config.action, Action::Agent);
        assert_eq!(config.ip, "10.0.0.7");
        assert_eq!(config.ssh_port, 2222);
        assert!(!config.sudo);
        assert_eq!(config.join.server_ip.as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_load_file_rejects_unknown_keys() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(tmp.path(), "action = \"server\"\nserver_port = 6443\n");

        let err = load_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("server_port"), "{err:#}");
    }

    #[test]
    fn test_precedence() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            tmp.path(),
            "action = \"server\"\nip = \"1.1.1.1\"\nuser = \"ubuntu\"\ncontext = \"file\"\n",
        );
        let node = NodeArgs {
            action: None,
            ip: Some("3.3.3.3".to_string()),
            installer: None,
            set: vec!["ip=2.2.2.2".to_string(), "context=cli".to_string()],
        };

        let config = resolve(Some(&path), &node).unwrap();
        assert_eq!(config.ip, "3.3.3.3");
        assert_eq!(config.context, "cli");
        assert_eq!(config.user, "ubuntu");
        assert_eq!(config.action, Action::Server);
    }

    #[test]
    fn test_flags_only() {
        let _guard = lock();
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_string_lossy().into_owned();
        let node = NodeArgs {
            action: Some(ActionArg::Agent),
            set: vec!["server_ip=10.0.0.1".to_string()],
            ..NodeArgs::default()
        };

        let config = with_var(paths::ENV_CONFIG_DIR, Some(&dir), || resolve(None, &node)).unwrap();
        assert_eq!(config.action, Action::Agent);
        assert_eq!(config.ip, "127.0.0.1");
        assert_eq!(config.join.server_ip.as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_default_file_is_picked_up() {
        let _guard = lock();
        let tmp = TempDir::new().unwrap();
        write_config(tmp.path(), "action = \"server\"\nip = \"9.9.9.9\"\n");
        let dir = tmp.path().to_string_lossy().into_owned();

        let config = with_var(paths::ENV_CONFIG_DIR, Some(&dir), || {
            resolve(None, &NodeArgs::default())
        })
        .unwrap();
        assert_eq!(config.ip, "9.9.9.9");
    }

    #[test]
    fn test_missing_explicit_file() {
        let tmp = TempDir::new().unwrap();
        let err = resolve(Some(&tmp.path().join("nope.toml")), &NodeArgs::default()).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_missing_action_is_validation_error() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(tmp.path(), "ip = \"1.1.1.1\"\n");

        let err = resolve(Some(&path), &NodeArgs::default()).unwrap_err();
        let lib_err = err.downcast_ref::<k3supkit::Error>().unwrap();
        assert!(lib_err.is_validation());
    }

    #[test]
    fn test_bad_set_assignment() {
        let node = NodeArgs {
            action: Some(ActionArg::Server),
            set: vec!["ssh_port=99999".to_string()],
            ..NodeArgs::default()
        };
        let tmp = TempDir::new().unwrap();
        let path = write_config(tmp.path(), "");
        assert!(resolve(Some(&path), &node).is_err());

        let node = NodeArgs {
            set: vec!["no_equals_sign".to_string()],
            ..NodeArgs::default()
        };
        let err = flag_overrides(&node).unwrap_err();
        assert!(err.to_string().contains("no_equals_sign"));
    }
}
