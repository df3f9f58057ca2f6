//! DS-007: The instance security group.

use crate::core::types::{
    Declaration, EgressRule, Group, IngressRule, Property, ResourceKind, SecurityConfig,
};
use crate::resources::network;

pub const SECURITY_GROUP: &str = "dev-sg";

/// Declare the security group with its static ingress/egress rules.
pub fn declare(security: &SecurityConfig) -> Vec<(String, Declaration)> {
    let ports: Vec<String> = security
        .ingress
        .iter()
        .map(|r| {
            if r.from_port == r.to_port {
                r.from_port.to_string()
            } else {
                format!("{}-{}", r.from_port, r.to_port)
            }
        })
        .collect();

    let sg = Declaration::new(
        ResourceKind::SecurityGroup,
        Group::AccessControl,
        format!("security group, ingress {}", ports.join(", ")),
    )
    .with("description", Property::str(&security.description))
    .with("vpcId", Property::reference(network::VPC, "id"))
    .with("ingress", Property::List(ingress_rules(security)))
    .with(
        "egress",
        Property::List(security.egress.iter().map(egress_rule).collect()),
    )
    .with("tags", Property::name_tag(SECURITY_GROUP));

    vec![(SECURITY_GROUP.to_string(), sg)]
}

/// The configured ingress rules as security group rule entries.
pub fn ingress_rules(security: &SecurityConfig) -> Vec<Property> {
    security.ingress.iter().map(ingress_rule).collect()
}

fn ingress_rule(rule: &IngressRule) -> Property {
    let mut entries = Vec::new();
    if let Some(ref description) = rule.description {
        entries.push(("description", Property::str(description)));
    }
    entries.push(("fromPort", Property::Int(i64::from(rule.from_port))));
    entries.push(("toPort", Property::Int(i64::from(rule.to_port))));
    entries.push(("protocol", Property::str(&rule.protocol)));
    entries.push(("cidrBlocks", Property::str_list(&rule.cidr_blocks)));
    Property::map(entries)
}

fn egress_rule(rule: &EgressRule) -> Property {
    let mut entries = vec![
        ("fromPort", Property::Int(i64::from(rule.from_port))),
        ("toPort", Property::Int(i64::from(rule.to_port))),
        ("protocol", Property::str(&rule.protocol)),
    ];
    if !rule.cidr_blocks.is_empty() {
        entries.push(("cidrBlocks", Property::str_list(&rule.cidr_blocks)));
    }
    if !rule.ipv6_cidr_blocks.is_empty() {
        entries.push(("ipv6CidrBlocks", Property::str_list(&rule.ipv6_cidr_blocks)));
    }
    Property::map(entries)
}
