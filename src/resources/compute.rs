//! DS-011: AMI lookup, key pair and the EC2 instance.

use crate::core::inputs::KeySource;
use crate::core::types::{ComputeConfig, Declaration, Group, Property, ResourceKind};
use crate::resources::{identity, network, security};

pub const AMI: &str = "ubuntu";
pub const KEY_PAIR: &str = "key";
pub const INSTANCE: &str = "dev-server";

/// Declare the AMI lookup, the optional key pair, and the instance.
pub fn declare(
    compute: &ComputeConfig,
    key_source: &KeySource,
    bootstrap_script: &str,
) -> Vec<(String, Declaration)> {
    let ami = &compute.ami;
    let mut decls = vec![(
        AMI.to_string(),
        Declaration::new(
            ResourceKind::AmiLookup,
            Group::Compute,
            format!(
                "{} AMI matching {} ({}, owners: {})",
                if ami.most_recent { "latest" } else { "any" },
                ami.name_pattern,
                ami.virtualization_type,
                ami.owners.join(", ")
            ),
        )
        .with("mostRecent", Property::Bool(ami.most_recent))
        .with(
            "filters",
            Property::List(vec![
                filter("name", &ami.name_pattern),
                filter("virtualization-type", &ami.virtualization_type),
            ]),
        )
        .with("owners", Property::str_list(&ami.owners)),
    )];

    let key_name = match key_source {
        KeySource::Existing(name) => Property::str(name),
        KeySource::Generated { public_key } => {
            decls.push((
                KEY_PAIR.to_string(),
                Declaration::new(
                    ResourceKind::KeyPair,
                    Group::Compute,
                    "key pair from supplied public key",
                )
                .with("publicKey", Property::str(public_key)),
            ));
            Property::reference(KEY_PAIR, "keyName")
        }
    };

    decls.push((
        INSTANCE.to_string(),
        Declaration::new(
            ResourceKind::Instance,
            Group::Compute,
            format!("{} instance in {}", compute.instance_type, network::PUBLIC_SUBNET),
        )
        .with("instanceType", Property::str(&compute.instance_type))
        .with(
            "vpcSecurityGroupIds",
            Property::List(vec![Property::reference(security::SECURITY_GROUP, "id")]),
        )
        .with("ami", Property::reference(AMI, "id"))
        .with("subnetId", Property::reference(network::PUBLIC_SUBNET, "id"))
        .with("keyName", key_name)
        .with(
            "iamInstanceProfile",
            Property::reference(identity::INSTANCE_PROFILE, "name"),
        )
        .with("userData", Property::str(bootstrap_script))
        .with("tags", Property::name_tag(INSTANCE)),
    ));

    decls
}

fn filter(name: &str, value: &str) -> Property {
    Property::map([
        ("name", Property::str(name)),
        ("values", Property::str_list(&[value])),
    ])
}
