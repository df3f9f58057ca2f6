//! DS-010: Rendezvous — the SSM parameter that hands the instance its public IP.
//!
//! One [`Rendezvous`] value feeds both sides: the parameter declaration
//! (writer, filled by the engine after the instance exists) and the bootstrap
//! script (reader, at first boot). Consistency is eventual; nothing here waits.

use crate::core::types::{Declaration, Group, Property, Rendezvous, RendezvousConfig, ResourceKind};
use crate::resources::bootstrap::shell_quote;

pub const PARAMETER: &str = "server-public-ip";

/// Build the contract from the stack file section.
pub fn contract(config: &RendezvousConfig, region: &str) -> Rendezvous {
    Rendezvous {
        parameter_name: config.parameter_name.clone(),
        parameter_type: config.parameter_type.clone(),
        region: region.to_string(),
    }
}

/// Declare the parameter, valued with the instance's public IP.
pub fn declare(rendezvous: &Rendezvous, instance: &str) -> Vec<(String, Declaration)> {
    vec![(
        PARAMETER.to_string(),
        Declaration::new(
            ResourceKind::SsmParameter,
            Group::Rendezvous,
            format!(
                "{} parameter {} ← {}.publicIp",
                rendezvous.parameter_type, rendezvous.parameter_name, instance
            ),
        )
        .with("name", Property::str(&rendezvous.parameter_name))
        .with("type", Property::str(&rendezvous.parameter_type))
        .with("value", Property::reference(instance, "publicIp")),
    )]
}

/// Shell command that prints the parameter value on the instance.
pub fn read_command(rendezvous: &Rendezvous) -> String {
    format!(
        "aws ssm get-parameter --region {} --name {} --query Parameter.Value --output text",
        shell_quote(&rendezvous.region),
        shell_quote(&rendezvous.parameter_name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock() -> Rendezvous {
        contract(&RendezvousConfig::default(), "ap-south-1")
    }

    #[test]
    fn test_ds010_contract_defaults() {
        let rv = stock();
        assert_eq!(rv.parameter_name, "publicIP");
        assert_eq!(rv.parameter_type, "String");
        assert_eq!(rv.region, "ap-south-1");
    }

    #[test]
    fn test_ds010_parameter_written_from_instance() {
        let (id, decl) = declare(&stock(), "dev-server").remove(0);
        assert_eq!(id, PARAMETER);
        assert_eq!(decl.kind, ResourceKind::SsmParameter);
        assert_eq!(decl.property("name"), Some(&Property::str("publicIP")));
        assert_eq!(decl.property("type"), Some(&Property::str("String")));
        assert_eq!(
            decl.property("value"),
            Some(&Property::reference("dev-server", "publicIp"))
        );
        assert_eq!(decl.dependencies(), vec!["dev-server"]);
    }

    #[test]
    fn test_ds010_read_command_uses_same_name() {
        let cmd = read_command(&stock());
        assert_eq!(
            cmd,
            "aws ssm get-parameter --region 'ap-south-1' --name 'publicIP' --query Parameter.Value --output text"
        );
    }
}
