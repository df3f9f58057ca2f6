//! DS-006: Network declarations — VPC, subnets, internet gateway, route tables.

use crate::core::types::{
    Declaration, Group, NetworkConfig, PrivateRoute, Property, ResourceKind, SubnetConfig,
};

pub const VPC: &str = "dev-vpc";
pub const PUBLIC_SUBNET: &str = "dev-public-subnet";
pub const PRIVATE_SUBNET: &str = "dev-private-subnet";
pub const INTERNET_GATEWAY: &str = "dev-igw";
pub const PUBLIC_ROUTE_TABLE: &str = "dev-public-rt";
pub const PRIVATE_ROUTE_TABLE: &str = "dev-private-rt";
pub const PUBLIC_ASSOCIATION: &str = "public-rt-association";
pub const PRIVATE_ASSOCIATION: &str = "private-rt-association";

/// Destination of every default route.
pub const DEFAULT_ROUTE_CIDR: &str = "0.0.0.0/0";

/// Declare the network group in dependency order.
pub fn declare(network: &NetworkConfig) -> Vec<(String, Declaration)> {
    let vpc = Declaration::new(
        ResourceKind::Vpc,
        Group::Network,
        format!("VPC {}", network.vpc_cidr),
    )
    .with("cidrBlock", Property::str(&network.vpc_cidr))
    .with("instanceTenancy", Property::str(&network.instance_tenancy))
    .with("tags", Property::name_tag(VPC));

    let private_routes = match network.private_route {
        PrivateRoute::InternetGateway => vec![default_route()],
        PrivateRoute::Isolated => vec![],
    };

    vec![
        (VPC.to_string(), vpc),
        (
            PUBLIC_SUBNET.to_string(),
            subnet(PUBLIC_SUBNET, &network.public_subnet, true),
        ),
        (
            PRIVATE_SUBNET.to_string(),
            subnet(PRIVATE_SUBNET, &network.private_subnet, false),
        ),
        (
            INTERNET_GATEWAY.to_string(),
            Declaration::new(
                ResourceKind::InternetGateway,
                Group::Network,
                "internet gateway",
            )
            .with("vpcId", Property::reference(VPC, "id"))
            .with("tags", Property::name_tag(INTERNET_GATEWAY)),
        ),
        (
            PUBLIC_ROUTE_TABLE.to_string(),
            route_table(PUBLIC_ROUTE_TABLE, vec![default_route()]),
        ),
        (
            PRIVATE_ROUTE_TABLE.to_string(),
            route_table(PRIVATE_ROUTE_TABLE, private_routes),
        ),
        (
            PUBLIC_ASSOCIATION.to_string(),
            association(PUBLIC_SUBNET, PUBLIC_ROUTE_TABLE),
        ),
        (
            PRIVATE_ASSOCIATION.to_string(),
            association(PRIVATE_SUBNET, PRIVATE_ROUTE_TABLE),
        ),
    ]
}

/// `0.0.0.0/0 → internet gateway`.
pub fn default_route() -> Property {
    Property::map([
        ("cidrBlock", Property::str(DEFAULT_ROUTE_CIDR)),
        ("gatewayId", Property::reference(INTERNET_GATEWAY, "id")),
    ])
}

/// Routes of a route table declaration whose destination is 0.0.0.0/0.
pub fn default_routes(route_table: &Declaration) -> Vec<&Property> {
    route_table
        .property("routes")
        .and_then(Property::as_list)
        .unwrap_or_default()
        .iter()
        .filter(|r| r.get("cidrBlock").and_then(Property::as_str) == Some(DEFAULT_ROUTE_CIDR))
        .collect()
}

fn subnet(name: &str, config: &SubnetConfig, public: bool) -> Declaration {
    let visibility = if public { "public" } else { "private" };
    Declaration::new(
        ResourceKind::Subnet,
        Group::Network,
        format!(
            "{} subnet {} in {}",
            visibility, config.cidr, config.availability_zone
        ),
    )
    .with("vpcId", Property::reference(VPC, "id"))
    .with("cidrBlock", Property::str(&config.cidr))
    .with("availabilityZone", Property::str(&config.availability_zone))
    .with("mapPublicIpOnLaunch", Property::Bool(public))
    .with("tags", Property::name_tag(name))
}

fn route_table(name: &str, routes: Vec<Property>) -> Declaration {
    let description = if routes.is_empty() {
        "route table (no default route)".to_string()
    } else {
        format!("route table, {} → {}", DEFAULT_ROUTE_CIDR, INTERNET_GATEWAY)
    };
    Declaration::new(ResourceKind::RouteTable, Group::Network, description)
        .with("vpcId", Property::reference(VPC, "id"))
        .with("routes", Property::List(routes))
        .with("tags", Property::name_tag(name))
}

fn association(subnet: &str, route_table: &str) -> Declaration {
    Declaration::new(
        ResourceKind::RouteTableAssociation,
        Group::Network,
        format!("associate {} with {}", subnet, route_table),
    )
    .with("subnetId", Property::reference(subnet, "id"))
    .with("routeTableId", Property::reference(route_table, "id"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn declared(network: &NetworkConfig) -> IndexMap<String, Declaration> {
        declare(network).into_iter().collect()
    }

    #[test]
    fn test_ds006_declares_eight_resources_in_order() {
        let decls = declared(&NetworkConfig::default());
        let ids: Vec<_> = decls.keys().map(String::as_str).collect();
        assert_eq!(
            ids,
            vec![
                VPC,
                PUBLIC_SUBNET,
                PRIVATE_SUBNET,
                INTERNET_GATEWAY,
                PUBLIC_ROUTE_TABLE,
                PRIVATE_ROUTE_TABLE,
                PUBLIC_ASSOCIATION,
                PRIVATE_ASSOCIATION
            ]
        );
    }

    #[test]
    fn test_ds006_public_ip_only_on_public_subnet() {
        let decls = declared(&NetworkConfig::default());
        assert_eq!(
            decls[PUBLIC_SUBNET].property("mapPublicIpOnLaunch"),
            Some(&Property::Bool(true))
        );
        assert_eq!(
            decls[PRIVATE_SUBNET].property("mapPublicIpOnLaunch"),
            Some(&Property::Bool(false))
        );
    }

    #[test]
    fn test_ds006_subnets_pinned_to_zones() {
        let decls = declared(&NetworkConfig::default());
        assert_eq!(
            decls[PUBLIC_SUBNET].property("availabilityZone"),
            Some(&Property::str("ap-south-1c"))
        );
        assert_eq!(
            decls[PRIVATE_SUBNET].property("availabilityZone"),
            Some(&Property::str("ap-south-1b"))
        );
    }

    #[test]
    fn test_ds006_one_default_route_per_table() {
        let decls = declared(&NetworkConfig::default());
        for rt in [PUBLIC_ROUTE_TABLE, PRIVATE_ROUTE_TABLE] {
            let routes = default_routes(&decls[rt]);
            assert_eq!(routes.len(), 1, "{} should hold one default route", rt);
            assert_eq!(
                routes[0].get("gatewayId"),
                Some(&Property::reference(INTERNET_GATEWAY, "id"))
            );
        }
    }

    #[test]
    fn test_ds006_isolated_private_route_table() {
        let network = NetworkConfig {
            private_route: PrivateRoute::Isolated,
            ..NetworkConfig::default()
        };
        let decls = declared(&network);
        assert!(default_routes(&decls[PRIVATE_ROUTE_TABLE]).is_empty());
        assert_eq!(default_routes(&decls[PUBLIC_ROUTE_TABLE]).len(), 1);
        assert!(!decls[PRIVATE_ROUTE_TABLE]
            .dependencies()
            .contains(&INTERNET_GATEWAY.to_string()));
    }

    #[test]
    fn test_ds006_associations_reference_their_pairs() {
        let decls = declared(&NetworkConfig::default());
        assert_eq!(
            decls[PUBLIC_ASSOCIATION].dependencies(),
            vec![PUBLIC_SUBNET, PUBLIC_ROUTE_TABLE]
        );
        assert_eq!(
            decls[PRIVATE_ASSOCIATION].dependencies(),
            vec![PRIVATE_SUBNET, PRIVATE_ROUTE_TABLE]
        );
    }

    #[test]
    fn test_ds006_name_tags() {
        let decls = declared(&NetworkConfig::default());
        let tag = decls[VPC]
            .property("tags")
            .and_then(|t| t.get("Name"))
            .and_then(Property::as_str);
        assert_eq!(tag, Some(VPC));
    }
}
