//! DS-003: YAML parsing and validation.
//!
//! Parses devstack.yaml and validates structural constraints:
//! - Version must be "1.0"
//! - Subnets lie inside the VPC, do not overlap, and sit in the stack region
//! - Ingress ports are well-formed and unique
//! - Managed policy ARNs and the rendezvous parameter name are well-formed
//! - Every bootstrap value fits on one shell line

use super::types::*;
use crate::resources::bootstrap::{validate_env_key, validate_shell_value};
use regex::Regex;
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::LazyLock;

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a devstack.yaml file from disk.
pub fn parse_config_file(path: &Path) -> Result<StackConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    parse_config(&content)
}

/// Parse a devstack.yaml from a string.
pub fn parse_config(yaml: &str) -> Result<StackConfig, String> {
    serde_yaml_ng::from_str(yaml).map_err(|e| format!("YAML parse error: {}", e))
}

/// An IPv4 network in CIDR notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Cidr {
    pub network: u32,
    pub prefix: u8,
}

impl Ipv4Cidr {
    /// Parse `a.b.c.d/n`. Host bits must be zero.
    pub fn parse(s: &str) -> Result<Self, String> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| format!("'{}' is not in CIDR notation", s))?;
        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|e| format!("'{}' has an invalid address: {}", s, e))?;
        let prefix: u8 = prefix
            .parse()
            .ok()
            .filter(|p| *p <= 32)
            .ok_or_else(|| format!("'{}' has an invalid prefix length", s))?;
        let network = u32::from(addr);
        let cidr = Self { network, prefix };
        if network & !cidr.mask() != 0 {
            return Err(format!("'{}' has host bits set", s));
        }
        Ok(cidr)
    }

    fn mask(&self) -> u32 {
        if self.prefix == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(self.prefix))
        }
    }

    /// `other` lies entirely inside `self`.
    pub fn contains(&self, other: &Ipv4Cidr) -> bool {
        other.prefix >= self.prefix && other.network & self.mask() == self.network
    }

    pub fn overlaps(&self, other: &Ipv4Cidr) -> bool {
        self.contains(other) || other.contains(self)
    }
}

static ARN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^arn:aws:iam::(\d{12}|aws):policy/[\w+=,.@/-]+$").expect("Invalid policy ARN regex")
});

static PARAMETER_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.\-/]+$").expect("Invalid parameter name regex"));

static STACK_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("Invalid stack name regex"));

/// The stack name is a directory under the state dir and the program name.
pub fn check_stack_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name must not be empty".to_string());
    }
    if name == "." || name == ".." || !STACK_NAME_REGEX.is_match(name) {
        return Err(format!(
            "name '{}' must use only letters, digits, '_', '.', '-' and cannot be '.' or '..'",
            name
        ));
    }
    Ok(())
}

/// Validate a parsed config. Returns a list of errors (empty = valid).
pub fn validate_config(config: &StackConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut err = |message: String| errors.push(ValidationError { message });

    if config.version != "1.0" {
        err(format!("version must be \"1.0\", got \"{}\"", config.version));
    }
    if let Err(e) = check_stack_name(&config.name) {
        err(e);
    }
    if config.region.is_empty() {
        err("region must not be empty".to_string());
    }

    validate_network(config, &mut err);
    validate_security(&config.security, &mut err);
    validate_identity(&config.identity, &mut err);
    validate_rendezvous(&config.rendezvous, &mut err);
    validate_bootstrap(config, &mut err);

    errors
}

fn validate_network(config: &StackConfig, err: &mut impl FnMut(String)) {
    let net = &config.network;
    let vpc = match Ipv4Cidr::parse(&net.vpc_cidr) {
        Ok(c) => Some(c),
        Err(e) => {
            err(format!("network.vpc_cidr: {}", e));
            None
        }
    };

    let mut subnets = Vec::new();
    for (label, subnet) in [
        ("public_subnet", &net.public_subnet),
        ("private_subnet", &net.private_subnet),
    ] {
        if !subnet.availability_zone.starts_with(&config.region) {
            err(format!(
                "network.{}: availability zone '{}' is not in region '{}'",
                label, subnet.availability_zone, config.region
            ));
        }
        match Ipv4Cidr::parse(&subnet.cidr) {
            Ok(cidr) => {
                if let Some(vpc) = vpc {
                    if !vpc.contains(&cidr) {
                        err(format!(
                            "network.{}: {} is outside the VPC {}",
                            label, subnet.cidr, net.vpc_cidr
                        ));
                    }
                }
                subnets.push((label, cidr));
            }
            Err(e) => err(format!("network.{}: {}", label, e)),
        }
    }

    if let [(a, ca), (b, cb)] = subnets.as_slice() {
        if ca.overlaps(cb) {
            err(format!("network.{} and network.{} overlap", a, b));
        }
    }
}

fn validate_security(security: &SecurityConfig, err: &mut impl FnMut(String)) {
    let mut seen = HashSet::new();
    for rule in &security.ingress {
        let range = format!("{}-{}/{}", rule.from_port, rule.to_port, rule.protocol);
        if rule.from_port == 0 || rule.to_port == 0 {
            err(format!("security.ingress {}: port must be non-zero", range));
        }
        if rule.from_port > rule.to_port {
            err(format!("security.ingress {}: from_port exceeds to_port", range));
        }
        if !seen.insert((rule.from_port, rule.to_port, rule.protocol.clone())) {
            err(format!("security.ingress {}: duplicate rule", range));
        }
        for block in &rule.cidr_blocks {
            if let Err(e) = Ipv4Cidr::parse(block) {
                err(format!("security.ingress {}: {}", range, e));
            }
        }
    }
}

fn validate_identity(identity: &IdentityConfig, err: &mut impl FnMut(String)) {
    if identity.service_principal.is_empty() {
        err("identity.service_principal must not be empty".to_string());
    }
    for policy in &identity.inline_policies {
        if policy.actions.is_empty() {
            err(format!("identity policy '{}' has no actions", policy.name));
        }
    }
    for managed in &identity.managed_policies {
        if !ARN_REGEX.is_match(&managed.arn) {
            err(format!(
                "identity managed policy '{}' is not a valid policy ARN",
                managed.arn
            ));
        }
    }
}

fn validate_rendezvous(rendezvous: &RendezvousConfig, err: &mut impl FnMut(String)) {
    if rendezvous.parameter_name.is_empty() {
        err("rendezvous.parameter_name must not be empty".to_string());
    } else if !PARAMETER_NAME_REGEX.is_match(&rendezvous.parameter_name) {
        err(format!(
            "rendezvous.parameter_name '{}' contains invalid characters",
            rendezvous.parameter_name
        ));
    }
    if !matches!(
        rendezvous.parameter_type.as_str(),
        "String" | "StringList" | "SecureString"
    ) {
        err(format!(
            "rendezvous.parameter_type '{}' must be String, StringList, or SecureString",
            rendezvous.parameter_type
        ));
    }
}

fn validate_bootstrap(config: &StackConfig, err: &mut impl FnMut(String)) {
    let bootstrap = &config.bootstrap;
    if let Err(e) = validate_shell_value(&bootstrap.docker_user, "bootstrap.docker_user") {
        err(e);
    }
    if let Some(ref network) = bootstrap.network {
        if let Err(e) = validate_shell_value(network, "bootstrap.network") {
            err(e);
        }
    }

    let mut names = HashSet::new();
    for container in &bootstrap.containers {
        if container.name.is_empty() {
            err("bootstrap container with empty name".to_string());
        } else if !names.insert(container.name.as_str()) {
            err(format!("bootstrap container '{}' is declared twice", container.name));
        }
        if let Err(e) = validate_shell_value(&container.image, &format!("container '{}' image", container.name)) {
            err(e);
        }
        for (key, value) in &container.env {
            if let Err(e) = validate_env_key(key, &format!("container '{}' env", container.name)) {
                err(e);
            }
            match value {
                EnvValue::Literal(v) => {
                    if let Err(e) = validate_shell_value(v, &format!("container '{}' env {}", container.name, key)) {
                        err(e);
                    }
                }
                EnvValue::Source(_) if config.rendezvous.parameter_name.is_empty() => err(format!(
                    "container '{}' env {} reads the rendezvous parameter, but rendezvous.parameter_name is empty",
                    container.name, key
                )),
                EnvValue::Source(_) => {}
            }
        }
    }
}
