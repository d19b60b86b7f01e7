//! Builds k3sup command lines.
//!
//! The flag order is fixed so rendered commands are reproducible:
//!
//! ```text
//! <bin> {install|join} [--skip-install] --ip <ip> --local-path <path>
//!     --ssh-key <key> --ssh-port <port> --user <user> [--context <ctx>]
//!     [--local] [--merge] [--server-ip <ip>] [--server-ssh-port <port>]
//!     [--server-user <user>] [--server] [--cluster] [--datastore <dsn>]
//!     [--sudo] [--skip-install] [--no-extras] [--k3s-extra-args <args>]
//!     [--k3s-version <ver>] [--ipsec]
//! ```
//!
//! The leading `--skip-install` belongs to probe mode only. Probes carry the
//! addressing flags and nothing that would change the target.

use crate::types::{Action, CommandInvocation, Configuration, JoinOptions, OperationMode};

/// Build the invocation for `config` in the given mode.
///
/// `--local` is emitted when either `merge` or `local` is set, so `local`
/// on its own produces a local install without `--merge`.
pub fn build(config: &Configuration, mode: OperationMode) -> CommandInvocation {
    let mut args = vec![config.action.verb().to_string()];

    if mode == OperationMode::Probe {
        args.push("--skip-install".to_string());
    }

    args.extend(addressing_args(config));

    if mode == OperationMode::Execute && config.action == Action::Server {
        push_value(&mut args, "--context", &config.context);
    }

    if config.merge || config.local {
        args.push("--local".to_string());
    }
    if config.merge {
        args.push("--merge".to_string());
    }

    let (addressing, mutating) = join_args(&config.join);
    args.extend(addressing);

    if mode == OperationMode::Execute {
        args.extend(mutating);
        args.extend(install_args(config));
    }

    CommandInvocation::new(config.installer.clone(), args)
}

/// Flags every invocation needs to reach the target.
fn addressing_args(config: &Configuration) -> Vec<String> {
    vec![
        "--ip".to_string(),
        config.ip.clone(),
        "--local-path".to_string(),
        config.local_path.clone(),
        "--ssh-key".to_string(),
        config.ssh_key.clone(),
        "--ssh-port".to_string(),
        config.ssh_port.to_string(),
        "--user".to_string(),
        config.user.clone(),
    ]
}

/// Role-scoped flags, split into (addressing, mutating).
///
/// These are emitted whenever they are set, for `install` as well as `join`.
/// Gating them to agents would happen here.
pub fn join_args(join: &JoinOptions) -> (Vec<String>, Vec<String>) {
    let mut addressing = Vec::new();
    if let Some(ip) = &join.server_ip {
        push_value(&mut addressing, "--server-ip", ip);
    }
    if let Some(port) = join.server_ssh_port {
        push_value(&mut addressing, "--server-ssh-port", &port.to_string());
    }
    if let Some(user) = &join.server_user {
        push_value(&mut addressing, "--server-user", user);
    }

    let mut mutating = Vec::new();
    if join.server {
        mutating.push("--server".to_string());
    }
    if join.cluster {
        mutating.push("--cluster".to_string());
    }
    if let Some(datastore) = &join.datastore {
        push_value(&mut mutating, "--datastore", datastore);
    }

    (addressing, mutating)
}

/// Flags that only make sense for the mutating run.
fn install_args(config: &Configuration) -> Vec<String> {
    let mut args = Vec::new();
    if config.sudo {
        args.push("--sudo".to_string());
    }
    if config.skip_install {
        args.push("--skip-install".to_string());
    }
    if config.no_extras {
        args.push("--no-extras".to_string());
    }
    if let Some(extra) = &config.k3s_extra_args {
        push_value(&mut args, "--k3s-extra-args", extra);
    }
    if let Some(version) = &config.k3s_version {
        push_value(&mut args, "--k3s-version", version);
    }
    if config.ipsec {
        args.push("--ipsec".to_string());
    }
    args
}

fn push_value(args: &mut Vec<String>, flag: &str, value: &str) {
    args.push(flag.to_string());
    args.push(value.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawConfig;

    const MUTATING_FLAGS: &[&str] = &[
        "--context",
        "--sudo",
        "--k3s-extra-args",
        "--k3s-version",
        "--ipsec",
        "--server",
        "--cluster",
        "--datastore",
        "--no-extras",
    ];

    fn config(pairs: &[(&str, &str)]) -> Configuration {
        RawConfig::from_pairs(pairs.iter().copied())
            .unwrap()
            .normalize()
            .unwrap()
    }

    /// Every option switched on, for both roles.
    fn fully_loaded(action: &str) -> Configuration {
        config(&[
            ("action", action),
            ("installer", "/opt/k3sup"),
            ("ip", "10.0.0.9"),
            ("context", "prod"),
            ("merge", "true"),
            ("server", "true"),
            ("server_ip", "10.0.0.1"),
            ("server_ssh_port", "2222"),
            ("server_user", "admin"),
            ("cluster", "true"),
            ("datastore", "mysql://u:p@tcp(db:3306)/k3s"),
            ("skip_install", "true"),
            ("no_extras", "true"),
            ("k3s_extra_args", "--no-deploy traefik --docker"),
            ("k3s_version", "v1.29.1+k3s1"),
            ("ipsec", "true"),
        ])
    }

    fn position(inv: &CommandInvocation, arg: &str) -> usize {
        inv.args()
            .iter()
            .position(|a| a == arg)
            .unwrap_or_else(|| panic!("{arg} missing from {inv}"))
    }

    #[test]
    fn test_default_server_execute() {
        let inv = build(&config(&[("action", "server")]), OperationMode::Execute);
        assert_eq!(
            inv.render(),
            "/usr/local/bin/k3sup install --ip 127.0.0.1 --local-path ./kubeconfig \
             --ssh-key ~/.ssh/id_rsa --ssh-port 22 --user root --context default --sudo"
        );
    }

    #[test]
    fn test_default_agent_probe() {
        let inv = build(&config(&[("action", "agent")]), OperationMode::Probe);
        assert_eq!(
            inv.render(),
            "/usr/local/bin/k3sup join --skip-install --ip 127.0.0.1 --local-path ./kubeconfig \
             --ssh-key ~/.ssh/id_rsa --ssh-port 22 --user root"
        );
    }

    #[test]
    fn test_probe_never_mutates() {
        for action in ["server", "agent"] {
            let inv = build(&fully_loaded(action), OperationMode::Probe);
            for flag in MUTATING_FLAGS {
                assert!(!inv.has_flag(flag), "probe for {action} contains {flag}: {inv}");
            }
            // The only --skip-install is the injected one
            assert_eq!(inv.args().iter().filter(|a| *a == "--skip-install").count(), 1);
            assert_eq!(inv.args()[1], "--skip-install");
            // Addressing flags still reach the target
            assert_eq!(inv.flag_value("--ip"), Some("10.0.0.9"));
            assert_eq!(inv.flag_value("--server-ip"), Some("10.0.0.1"));
            assert!(inv.has_flag("--merge"));
        }
    }

    #[test]
    fn test_server_execute_has_context_once() {
        for inv in [
            build(&config(&[("action", "server")]), OperationMode::Execute),
            build(&fully_loaded("server"), OperationMode::Execute),
        ] {
            let count = inv.args().iter().filter(|a| *a == "--context").count();
            assert_eq!(count, 1, "{inv}");
        }

        let inv = build(&config(&[("action", "server"), ("context", "prod")]), OperationMode::Execute);
        assert_eq!(inv.flag_value("--context"), Some("prod"));
    }

    #[test]
    fn test_agent_execute_has_no_context() {
        let inv = build(&fully_loaded("agent"), OperationMode::Execute);
        assert!(!inv.has_flag("--context"));
    }

    #[test]
    fn test_scenario_server_install() {
        let inv = build(
            &config(&[("action", "server"), ("ip", "1.1.1.1"), ("context", "prod")]),
            OperationMode::Execute,
        );
        let rendered = inv.render();
        assert!(rendered.contains("install --ip 1.1.1.1"));
        assert!(rendered.contains("--context prod"));
    }

    #[test]
    fn test_scenario_agent_join_order() {
        let inv = build(
            &config(&[
                ("action", "agent"),
                ("server_ip", "2.2.2.2"),
                ("server", "true"),
                ("cluster", "true"),
            ]),
            OperationMode::Execute,
        );
        assert_eq!(inv.args()[0], "join");
        assert_eq!(inv.flag_value("--server-ip"), Some("2.2.2.2"));

        let server_ip = position(&inv, "--server-ip");
        let server = position(&inv, "--server");
        let cluster = position(&inv, "--cluster");
        assert!(server_ip < server && server < cluster, "{inv}");
    }

    #[test]
    fn test_full_flag_order() {
        let inv = build(&fully_loaded("server"), OperationMode::Execute);
        let order = [
            "install",
            "--ip",
            "--local-path",
            "--ssh-key",
            "--ssh-port",
            "--user",
            "--context",
            "--local",
            "--merge",
            "--server-ip",
            "--server-ssh-port",
            "--server-user",
            "--server",
            "--cluster",
            "--datastore",
            "--sudo",
            "--skip-install",
            "--no-extras",
            "--k3s-extra-args",
            "--k3s-version",
            "--ipsec",
        ];
        let positions: Vec<usize> = order.iter().map(|f| position(&inv, f)).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{inv}");
    }

    #[test]
    fn test_skip_install_execute_is_still_runnable() {
        let inv = build(
            &config(&[("action", "server"), ("skip_install", "true")]),
            OperationMode::Execute,
        );
        assert_eq!(inv.args()[0], "install");
        assert!(inv.has_flag("--skip-install"));
        assert!(inv.has_flag("--context"));
    }

    #[test]
    fn test_extra_args_stay_one_argument() {
        let inv = build(&fully_loaded("server"), OperationMode::Execute);
        assert_eq!(
            inv.flag_value("--k3s-extra-args"),
            Some("--no-deploy traefik --docker")
        );
    }

    #[test]
    fn test_local_without_merge() {
        let inv = build(&config(&[("action", "server"), ("local", "true")]), OperationMode::Execute);
        assert!(inv.has_flag("--local"));
        assert!(!inv.has_flag("--merge"));

        let inv = build(&config(&[("action", "server"), ("merge", "true")]), OperationMode::Execute);
        assert!(inv.has_flag("--local"));
        assert!(inv.has_flag("--merge"));
    }

    #[test]
    fn test_sudo_can_be_disabled() {
        let inv = build(&config(&[("action", "agent"), ("sudo", "false")]), OperationMode::Execute);
        assert!(!inv.has_flag("--sudo"));
    }

    #[test]
    fn test_join_args_split() {
        let join = JoinOptions {
            server: true,
            server_ip: Some("2.2.2.2".to_string()),
            server_ssh_port: Some(22),
            server_user: None,
            cluster: false,
            datastore: Some("etcd".to_string()),
        };
        let (addressing, mutating) = join_args(&join);
        assert_eq!(
            addressing,
            vec!["--server-ip", "2.2.2.2", "--server-ssh-port", "22"]
        );
        assert_eq!(mutating, vec!["--server", "--datastore", "etcd"]);
    }

    #[test]
    fn test_build_is_deterministic() {
        let config = fully_loaded("agent");
        assert_eq!(
            build(&config, OperationMode::Execute),
            build(&config, OperationMode::Execute)
        );
    }
}
