//! DS-009: Bootstrap script generation (EC2 user data).
//!
//! The script runs once under cloud-init: install Docker, log into the
//! registry, read the rendezvous parameter, start the containers. It stops at
//! the first failing command and never retries. Every configured value is
//! single-quoted.

use crate::core::types::{BootstrapConfig, ContainerConfig, EnvFrom, EnvValue, Registry, Rendezvous};
use crate::resources::rendezvous;
use regex::Regex;
use std::sync::LazyLock;

const DOCKER_GPG_URL: &str = "https://download.docker.com/linux/ubuntu/gpg";
const DOCKER_APT_REPO: &str = "https://download.docker.com/linux/ubuntu";

/// Shell variable holding the rendezvous value once read.
pub const RENDEZVOUS_VAR: &str = "RENDEZVOUS_VALUE";

/// Single-quote a value for bash.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Reject values that cannot be carried on one script line.
pub fn validate_shell_value(value: &str, field: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{} cannot be empty", field));
    }
    if let Some(bad) = value.chars().find(|c| matches!(c, '\n' | '\r' | '\0')) {
        return Err(format!("{} contains forbidden character: {:?}", field, bad));
    }
    Ok(())
}

static ENV_KEY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid env key regex"));

/// Container env keys must be plain variable names.
pub fn validate_env_key(key: &str, field: &str) -> Result<(), String> {
    if ENV_KEY_REGEX.is_match(key) {
        Ok(())
    } else {
        Err(format!("{} key '{}' is not a valid variable name", field, key))
    }
}

/// Registry host to log into, if any.
pub fn registry_host(registry: &Registry, stack_region: &str) -> Option<(String, String)> {
    match registry {
        Registry::Ecr { account_id, region } => {
            let region = region.as_deref().unwrap_or(stack_region);
            Some((
                format!("{}.dkr.ecr.{}.amazonaws.com", account_id, region),
                region.to_string(),
            ))
        }
        Registry::Public => None,
    }
}

fn uses_rendezvous(containers: &[ContainerConfig]) -> bool {
    containers.iter().any(|c| {
        c.env
            .values()
            .any(|v| matches!(v, EnvValue::Source(s) if s.from == EnvFrom::Rendezvous))
    })
}

/// Generate the full user-data script.
pub fn render(
    config: &BootstrapConfig,
    rendezvous: &Rendezvous,
    stack_region: &str,
) -> Result<String, String> {
    validate_shell_value(&config.docker_user, "bootstrap.docker_user")?;
    for pkg in &config.packages {
        validate_shell_value(pkg, "bootstrap.packages[]")?;
    }

    let mut lines = vec![
        "#!/bin/bash".to_string(),
        "set -euo pipefail".to_string(),
        "export DEBIAN_FRONTEND=noninteractive".to_string(),
        String::new(),
        "apt-get update".to_string(),
    ];

    if !config.packages.is_empty() {
        let pkgs: Vec<String> = config.packages.iter().map(|p| shell_quote(p)).collect();
        lines.push(format!("apt-get install -y {}", pkgs.join(" ")));
    }

    lines.push(format!("curl -fsSL {} | apt-key add -", DOCKER_GPG_URL));
    lines.push(format!(
        "add-apt-repository \"deb [arch=amd64] {} $(lsb_release -cs) stable\"",
        DOCKER_APT_REPO
    ));
    lines.push("apt-get update".to_string());
    lines.push("apt-get install -y docker-ce".to_string());
    lines.push(format!("usermod -aG docker {}", shell_quote(&config.docker_user)));
    lines.push("apt-get install -y awscli".to_string());

    if let Some((host, region)) = registry_host(&config.registry, stack_region) {
        validate_shell_value(&host, "bootstrap.registry")?;
        lines.push(format!(
            "aws ecr get-login-password --region {} | docker login --username AWS --password-stdin {}",
            shell_quote(&region),
            shell_quote(&host)
        ));
    }

    if uses_rendezvous(&config.containers) {
        lines.push(String::new());
        lines.push(format!(
            "{}=\"$({})\"",
            RENDEZVOUS_VAR,
            rendezvous::read_command(rendezvous)
        ));
    }

    if let Some(ref network) = config.network {
        validate_shell_value(network, "bootstrap.network")?;
        let net = shell_quote(network);
        lines.push(String::new());
        lines.push(format!(
            "docker network inspect {} >/dev/null 2>&1 || docker network create {}",
            net, net
        ));
    }

    if !config.containers.is_empty() {
        let names: Vec<String> = config
            .containers
            .iter()
            .map(|c| shell_quote(&c.name))
            .collect();
        lines.push(format!("docker rm -f {} || true", names.join(" ")));
    }

    for container in &config.containers {
        lines.push(docker_run(container, config.network.as_deref())?);
    }

    let mut script = lines.join("\n");
    script.push('\n');
    Ok(script)
}

/// `docker run -d ...` for one container.
fn docker_run(container: &ContainerConfig, network: Option<&str>) -> Result<String, String> {
    let field = format!("bootstrap.containers[{}]", container.name);
    validate_shell_value(&container.name, &field)?;
    validate_shell_value(&container.image, &format!("{}.image", field))?;

    let mut args = vec![
        "docker run -d".to_string(),
        format!("--name {}", shell_quote(&container.name)),
    ];
    if let Some(net) = network {
        args.push(format!("--network {}", shell_quote(net)));
    }
    for port in &container.ports {
        args.push(format!("-p {}:{}", port.host, port.container));
    }
    for (key, value) in &container.env {
        validate_env_key(key, &format!("{}.env", field))?;
        match value {
            EnvValue::Literal(v) => {
                validate_shell_value(v, &format!("{}.env.{}", field, key))?;
                args.push(format!("-e {}", shell_quote(&format!("{}={}", key, v))));
            }
            EnvValue::Source(source) => match source.from {
                EnvFrom::Rendezvous => {
                    args.push(format!(
                        "-e {}\"${}\"",
                        shell_quote(&format!("{}=", key)),
                        RENDEZVOUS_VAR
                    ));
                }
            },
        }
    }
    for volume in &container.volumes {
        validate_shell_value(volume, &format!("{}.volumes[]", field))?;
        args.push(format!("-v {}", shell_quote(volume)));
    }
    if container.tty {
        args.push("-t".to_string());
    }
    args.push(shell_quote(&container.image));

    Ok(args.join(" "))
}
