//! DS-001: Stack file schema, declaration graph types, render lock, and events.
//!
//! Every stack-file field carries a serde default, so a file holding only
//! `version` and `name` describes the stock dev stack (ap-south-1 VPC, two
//! subnets, one t3.micro instance, `publicIP` rendezvous parameter).

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

// ============================================================================
// Top-level devstack.yaml
// ============================================================================

/// Root configuration: the declared stack.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StackConfig {
    /// Schema version (must be "1.0")
    pub version: String,

    /// Stack name, also used as the rendered project name
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// AWS region
    #[serde(default = "default_region")]
    pub region: String,

    /// Deployment inputs (key material); usually supplied via env or flags
    #[serde(default)]
    pub inputs: InputsConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub security: SecurityConfig,

    #[serde(default)]
    pub identity: IdentityConfig,

    #[serde(default)]
    pub compute: ComputeConfig,

    #[serde(default)]
    pub bootstrap: BootstrapConfig,

    #[serde(default)]
    pub rendezvous: RendezvousConfig,
}

fn default_region() -> String {
    "ap-south-1".to_string()
}

fn default_anywhere() -> Vec<String> {
    vec!["0.0.0.0/0".to_string()]
}

fn default_tcp() -> String {
    "tcp".to_string()
}

// ============================================================================
// Inputs
// ============================================================================

/// Raw deployment inputs as written in the stack file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct InputsConfig {
    /// Name of an existing EC2 key pair
    #[serde(default, alias = "keyName")]
    pub key_name: Option<String>,

    /// Public key material for a generated key pair
    #[serde(default, alias = "publicKey")]
    pub public_key: Option<String>,

    /// Private key, PEM or base64-encoded PEM
    #[serde(default, alias = "privateKey")]
    pub private_key: Option<String>,
}

// ============================================================================
// Network
// ============================================================================

/// VPC, subnets, gateway, and routing.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NetworkConfig {
    #[serde(default = "default_vpc_cidr")]
    pub vpc_cidr: String,

    #[serde(default = "default_tenancy")]
    pub instance_tenancy: String,

    #[serde(default = "default_public_subnet")]
    pub public_subnet: SubnetConfig,

    #[serde(default = "default_private_subnet")]
    pub private_subnet: SubnetConfig,

    /// Default route of the private route table
    #[serde(default)]
    pub private_route: PrivateRoute,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            vpc_cidr: default_vpc_cidr(),
            instance_tenancy: default_tenancy(),
            public_subnet: default_public_subnet(),
            private_subnet: default_private_subnet(),
            private_route: PrivateRoute::default(),
        }
    }
}

fn default_vpc_cidr() -> String {
    "10.0.0.0/16".to_string()
}

fn default_tenancy() -> String {
    "default".to_string()
}

fn default_public_subnet() -> SubnetConfig {
    SubnetConfig {
        cidr: "10.0.1.0/24".to_string(),
        availability_zone: "ap-south-1c".to_string(),
    }
}

fn default_private_subnet() -> SubnetConfig {
    SubnetConfig {
        cidr: "10.0.2.0/24".to_string(),
        availability_zone: "ap-south-1b".to_string(),
    }
}

/// A subnet pinned to one availability zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SubnetConfig {
    pub cidr: String,
    pub availability_zone: String,
}

/// Where the private route table sends 0.0.0.0/0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PrivateRoute {
    /// Same internet gateway as the public table (no isolation)
    #[default]
    InternetGateway,
    /// No default route at all
    Isolated,
}

// ============================================================================
// Access control
// ============================================================================

/// Security group attached to the instance.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SecurityConfig {
    #[serde(default = "default_sg_description")]
    pub description: String,

    #[serde(default = "default_ingress")]
    pub ingress: Vec<IngressRule>,

    #[serde(default = "default_egress")]
    pub egress: Vec<EgressRule>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            description: default_sg_description(),
            ingress: default_ingress(),
            egress: default_egress(),
        }
    }
}

fn default_sg_description() -> String {
    "EC2 Security Group".to_string()
}

fn default_ingress() -> Vec<IngressRule> {
    [
        ("Allow HTTPS", 443),
        ("Allow HTTP", 80),
        ("Allow SSH", 22),
        ("Allow requests at 3000", 3000),
    ]
    .into_iter()
    .map(|(description, port)| IngressRule {
        description: Some(description.to_string()),
        from_port: port,
        to_port: port,
        protocol: default_tcp(),
        cidr_blocks: default_anywhere(),
    })
    .collect()
}

fn default_egress() -> Vec<EgressRule> {
    vec![EgressRule {
        from_port: 0,
        to_port: 0,
        protocol: "-1".to_string(),
        cidr_blocks: default_anywhere(),
        ipv6_cidr_blocks: vec!["::/0".to_string()],
    }]
}

/// One ingress allow rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IngressRule {
    #[serde(default)]
    pub description: Option<String>,
    pub from_port: u16,
    pub to_port: u16,
    #[serde(default = "default_tcp")]
    pub protocol: String,
    #[serde(default = "default_anywhere")]
    pub cidr_blocks: Vec<String>,
}

/// One egress allow rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EgressRule {
    #[serde(default)]
    pub from_port: u16,
    #[serde(default)]
    pub to_port: u16,
    pub protocol: String,
    #[serde(default)]
    pub cidr_blocks: Vec<String>,
    #[serde(default)]
    pub ipv6_cidr_blocks: Vec<String>,
}

// ============================================================================
// Identity
// ============================================================================

/// IAM role, policies, and instance profile.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IdentityConfig {
    /// Principal allowed to assume the role
    #[serde(default = "default_service_principal")]
    pub service_principal: String,

    /// Policies authored inline and attached to the role
    #[serde(default = "default_inline_policies")]
    pub inline_policies: Vec<InlinePolicy>,

    /// Pre-existing managed policies attached by ARN
    #[serde(default = "default_managed_policies")]
    pub managed_policies: Vec<ManagedPolicy>,

    /// Physical name of the instance profile
    #[serde(default = "default_profile_name")]
    pub instance_profile_name: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            service_principal: default_service_principal(),
            inline_policies: default_inline_policies(),
            managed_policies: default_managed_policies(),
            instance_profile_name: default_profile_name(),
        }
    }
}

fn default_service_principal() -> String {
    "ec2.amazonaws.com".to_string()
}

fn default_profile_name() -> String {
    "myProfile".to_string()
}

fn default_inline_policies() -> Vec<InlinePolicy> {
    vec![
        InlinePolicy {
            name: "ssm-parameter-policy".to_string(),
            attachment: "ssm-parameter-policy-attachment".to_string(),
            actions: [
                "ssm:GetParameter",
                "ssm:GetParameters",
                "ssm:GetParametersByPath",
            ]
            .map(String::from)
            .to_vec(),
            resource: "*".to_string(),
        },
        InlinePolicy {
            name: "rds-readOnly-policy".to_string(),
            attachment: "rds-readOnly-policy-attachment".to_string(),
            actions: [
                "rds:Describe*",
                "rds:ListTagsForResource",
                "ec2:DescribeAccountAttributes",
                "ec2:DescribeAvailabilityZones",
                "ec2:DescribeInternetGateways",
                "ec2:DescribeSecurityGroups",
                "ec2:DescribeSubnets",
                "ec2:DescribeVpcAttribute",
                "ec2:DescribeVpcs",
            ]
            .map(String::from)
            .to_vec(),
            resource: "*".to_string(),
        },
    ]
}

fn default_managed_policies() -> Vec<ManagedPolicy> {
    vec![ManagedPolicy {
        arn: "arn:aws:iam::623865992637:policy/ECR_FullAccess".to_string(),
        attachment: "ECR-Readonly-policy-attachment".to_string(),
    }]
}

/// A policy document authored in the stack, plus its role attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InlinePolicy {
    /// Logical name of the policy resource
    pub name: String,
    /// Logical name of the attachment resource
    pub attachment: String,
    pub actions: Vec<String>,
    #[serde(default = "default_star")]
    pub resource: String,
}

fn default_star() -> String {
    "*".to_string()
}

/// A managed policy referenced by ARN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ManagedPolicy {
    pub arn: String,
    /// Logical name of the attachment resource
    pub attachment: String,
}

// ============================================================================
// Compute
// ============================================================================

/// The EC2 instance and its AMI lookup.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ComputeConfig {
    #[serde(default = "default_instance_type")]
    pub instance_type: String,

    #[serde(default)]
    pub ami: AmiFilter,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            instance_type: default_instance_type(),
            ami: AmiFilter::default(),
        }
    }
}

fn default_instance_type() -> String {
    "t3.micro".to_string()
}

/// AMI lookup filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AmiFilter {
    #[serde(default = "default_ami_pattern")]
    pub name_pattern: String,

    #[serde(default = "default_virtualization")]
    pub virtualization_type: String,

    #[serde(default = "default_ami_owners")]
    pub owners: Vec<String>,

    #[serde(default = "default_true")]
    pub most_recent: bool,
}

impl Default for AmiFilter {
    fn default() -> Self {
        Self {
            name_pattern: default_ami_pattern(),
            virtualization_type: default_virtualization(),
            owners: default_ami_owners(),
            most_recent: true,
        }
    }
}

fn default_ami_pattern() -> String {
    "ubuntu*-20.04-amd64-*".to_string()
}

fn default_virtualization() -> String {
    "hvm".to_string()
}

fn default_ami_owners() -> Vec<String> {
    vec!["amazon".to_string()]
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Bootstrap
// ============================================================================

/// Contents of the first-boot user-data script.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BootstrapConfig {
    /// Login user added to the docker group
    #[serde(default = "default_docker_user")]
    pub docker_user: String,

    /// apt packages installed before Docker
    #[serde(default = "default_bootstrap_packages")]
    pub packages: Vec<String>,

    #[serde(default)]
    pub registry: Registry,

    /// Docker network shared by all containers
    #[serde(default = "default_docker_network")]
    pub network: Option<String>,

    #[serde(default = "default_containers")]
    pub containers: Vec<ContainerConfig>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            docker_user: default_docker_user(),
            packages: default_bootstrap_packages(),
            registry: Registry::default(),
            network: default_docker_network(),
            containers: default_containers(),
        }
    }
}

fn default_docker_user() -> String {
    "ubuntu".to_string()
}

fn default_bootstrap_packages() -> Vec<String> {
    [
        "cloud-utils",
        "apt-transport-https",
        "ca-certificates",
        "curl",
        "software-properties-common",
    ]
    .map(String::from)
    .to_vec()
}

fn default_docker_network() -> Option<String> {
    Some("devstack".to_string())
}

fn default_containers() -> Vec<ContainerConfig> {
    vec![
        ContainerConfig {
            name: "app-container".to_string(),
            image: "623865992637.dkr.ecr.ap-south-1.amazonaws.com/demo:latest".to_string(),
            ports: vec![PortMapping {
                host: 3000,
                container: 3000,
            }],
            env: IndexMap::from([
                (
                    "VIRTUAL_HOST".to_string(),
                    EnvValue::Source(EnvSource {
                        from: EnvFrom::Rendezvous,
                    }),
                ),
                (
                    "BACKEND_API_URL".to_string(),
                    EnvValue::Literal("http://backend:3456".to_string()),
                ),
            ]),
            volumes: vec![],
            tty: false,
        },
        ContainerConfig {
            name: "nginx".to_string(),
            image: "jwilder/nginx-proxy".to_string(),
            ports: vec![PortMapping {
                host: 80,
                container: 80,
            }],
            env: IndexMap::new(),
            volumes: vec!["/var/run/docker.sock:/tmp/docker.sock".to_string()],
            tty: true,
        },
    ]
}

/// Registry the instance logs into before pulling images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Registry {
    /// Private ECR registry of an AWS account
    Ecr {
        account_id: String,
        /// Defaults to the stack region
        #[serde(default)]
        region: Option<String>,
    },
    /// Public registry, no login
    Public,
}

impl Default for Registry {
    fn default() -> Self {
        Self::Ecr {
            account_id: "623865992637".to_string(),
            region: Some("ap-south-1".to_string()),
        }
    }
}

/// One container started at boot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ContainerConfig {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub ports: Vec<PortMapping>,
    #[serde(default)]
    pub env: IndexMap<String, EnvValue>,
    #[serde(default)]
    pub volumes: Vec<String>,
    /// Allocate a pseudo-TTY
    #[serde(default)]
    pub tty: bool,
}

/// host:container port publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PortMapping {
    pub host: u16,
    pub container: u16,
}

/// Container environment value — literal or read at boot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    Source(EnvSource),
}

/// Boot-time source of an environment value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EnvSource {
    pub from: EnvFrom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EnvFrom {
    /// The rendezvous SSM parameter
    Rendezvous,
}

// ============================================================================
// Rendezvous
// ============================================================================

/// SSM parameter written with the instance public IP.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RendezvousConfig {
    #[serde(default = "default_parameter_name")]
    pub parameter_name: String,

    #[serde(default = "default_parameter_type")]
    pub parameter_type: String,
}

impl Default for RendezvousConfig {
    fn default() -> Self {
        Self {
            parameter_name: default_parameter_name(),
            parameter_type: default_parameter_type(),
        }
    }
}

fn default_parameter_name() -> String {
    "publicIP".to_string()
}

fn default_parameter_type() -> String {
    "String".to_string()
}

/// The single contract shared by the parameter writer and the boot-time reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendezvous {
    pub parameter_name: String,
    pub parameter_type: String,
    pub region: String,
}

// ============================================================================
// Declarations
// ============================================================================

/// Kind of a declared resource or lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    AmiLookup,
    Vpc,
    Subnet,
    InternetGateway,
    RouteTable,
    RouteTableAssociation,
    SecurityGroup,
    KeyPair,
    IamRole,
    IamPolicy,
    RolePolicyAttachment,
    InstanceProfile,
    Instance,
    SsmParameter,
}

impl ResourceKind {
    /// Provider type token in the rendered program.
    pub fn type_token(&self) -> &'static str {
        match self {
            Self::AmiLookup => "aws:ec2:getAmi",
            Self::Vpc => "aws:ec2:Vpc",
            Self::Subnet => "aws:ec2:Subnet",
            Self::InternetGateway => "aws:ec2:InternetGateway",
            Self::RouteTable => "aws:ec2:RouteTable",
            Self::RouteTableAssociation => "aws:ec2:RouteTableAssociation",
            Self::SecurityGroup => "aws:ec2:SecurityGroup",
            Self::KeyPair => "aws:ec2:KeyPair",
            Self::IamRole => "aws:iam:Role",
            Self::IamPolicy => "aws:iam:Policy",
            Self::RolePolicyAttachment => "aws:iam:RolePolicyAttachment",
            Self::InstanceProfile => "aws:iam:InstanceProfile",
            Self::Instance => "aws:ec2:Instance",
            Self::SsmParameter => "aws:ssm:Parameter",
        }
    }

    /// Data sources are read, never created.
    pub fn is_lookup(&self) -> bool {
        matches!(self, Self::AmiLookup)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AmiLookup => "ami_lookup",
            Self::Vpc => "vpc",
            Self::Subnet => "subnet",
            Self::InternetGateway => "internet_gateway",
            Self::RouteTable => "route_table",
            Self::RouteTableAssociation => "route_table_association",
            Self::SecurityGroup => "security_group",
            Self::KeyPair => "key_pair",
            Self::IamRole => "iam_role",
            Self::IamPolicy => "iam_policy",
            Self::RolePolicyAttachment => "role_policy_attachment",
            Self::InstanceProfile => "instance_profile",
            Self::Instance => "instance",
            Self::SsmParameter => "ssm_parameter",
        };
        write!(f, "{}", s)
    }
}

/// Logical group a declaration belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Group {
    Network,
    AccessControl,
    Identity,
    Compute,
    Rendezvous,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::AccessControl => write!(f, "access-control"),
            Self::Identity => write!(f, "identity"),
            Self::Compute => write!(f, "compute"),
            Self::Rendezvous => write!(f, "rendezvous"),
        }
    }
}

/// Reference to an output attribute of another declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    pub target: String,
    pub attribute: String,
}

impl Reference {
    pub fn new(target: &str, attribute: &str) -> Self {
        Self {
            target: target.to_string(),
            attribute: attribute.to_string(),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${{{}.{}}}", self.target, self.attribute)
    }
}

/// A property value of a declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    Str(String),
    Int(i64),
    Bool(bool),
    List(Vec<Property>),
    Map(IndexMap<String, Property>),
    Ref(Reference),
}

impl Property {
    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    pub fn reference(target: &str, attribute: &str) -> Self {
        Self::Ref(Reference::new(target, attribute))
    }

    pub fn str_list<S: AsRef<str>>(items: &[S]) -> Self {
        Self::List(items.iter().map(|s| Self::str(s.as_ref())).collect())
    }

    pub fn map<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Property)>,
        K: Into<String>,
    {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// `{ Name: <name> }` tag map.
    pub fn name_tag(name: &str) -> Self {
        Self::map([("Name", Self::str(name))])
    }

    /// Collect every reference reachable from this value, depth-first.
    pub fn collect_references<'a>(&'a self, out: &mut Vec<&'a Reference>) {
        match self {
            Self::Ref(r) => out.push(r),
            Self::List(items) => items.iter().for_each(|p| p.collect_references(out)),
            Self::Map(entries) => entries.values().for_each(|p| p.collect_references(out)),
            Self::Str(_) | Self::Int(_) | Self::Bool(_) => {}
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Property]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Map field lookup; `None` for non-maps.
    pub fn get(&self, key: &str) -> Option<&Property> {
        match self {
            Self::Map(entries) => entries.get(key),
            _ => None,
        }
    }
}

impl Serialize for Property {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Str(s) => serializer.serialize_str(s),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Ref(r) => serializer.serialize_str(&r.to_string()),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

/// One resource or lookup in the stack graph.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub kind: ResourceKind,
    pub group: Group,
    pub properties: IndexMap<String, Property>,
    /// Ordering edges not expressed by references
    pub depends_on: Vec<String>,
    pub description: String,
}

impl Declaration {
    pub fn new(kind: ResourceKind, group: Group, description: impl Into<String>) -> Self {
        Self {
            kind,
            group,
            properties: IndexMap::new(),
            depends_on: Vec::new(),
            description: description.into(),
        }
    }

    /// Builder-style property insert.
    pub fn with(mut self, key: &str, value: Property) -> Self {
        self.properties.insert(key.to_string(), value);
        self
    }

    pub fn property(&self, key: &str) -> Option<&Property> {
        self.properties.get(key)
    }

    /// Referenced declarations plus explicit `depends_on`, first-seen order, no duplicates.
    pub fn dependencies(&self) -> Vec<String> {
        let mut refs = Vec::new();
        for value in self.properties.values() {
            value.collect_references(&mut refs);
        }
        let mut deps: Vec<String> = Vec::new();
        for target in refs
            .into_iter()
            .map(|r| r.target.as_str())
            .chain(self.depends_on.iter().map(String::as_str))
        {
            if !deps.iter().any(|d| d == target) {
                deps.push(target.to_string());
            }
        }
        deps
    }
}

/// Fully declared stack, ready for ordering and rendering.
#[derive(Debug, Clone)]
pub struct Stack {
    pub name: String,
    pub description: Option<String>,
    pub region: String,
    /// Declarations in declaration order
    pub declarations: IndexMap<String, Declaration>,
    pub outputs: IndexMap<String, Property>,
    pub bootstrap_script: String,
    pub rendezvous: Rendezvous,
}

// ============================================================================
// Plan
// ============================================================================

/// One entry of the declaration plan.
#[derive(Debug, Clone)]
pub struct PlannedDeclaration {
    pub id: String,
    pub kind: ResourceKind,
    pub group: Group,
    pub description: String,
    pub depends_on: Vec<String>,
}

/// Ordered listing of what a render would hand to the engine.
#[derive(Debug, Clone)]
pub struct DeclarationPlan {
    pub name: String,
    pub region: String,
    /// Entries in topological order
    pub entries: Vec<PlannedDeclaration>,
    /// Per-group counts in first-seen order
    pub group_counts: IndexMap<Group, u32>,
    pub resources: u32,
    pub lookups: u32,
}

// ============================================================================
// Render lock
// ============================================================================

/// Record of the last render of a stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderLock {
    pub schema: String,
    pub stack: String,
    pub generated_at: String,
    pub generator: String,
    /// BLAKE3 of the rendered program text
    pub program_hash: String,
    /// BLAKE3 of the bootstrap script
    pub bootstrap_hash: String,
    /// BLAKE3 of the private key, never the key itself
    pub key_fingerprint: String,
    /// "existing:<name>" or "generated"
    pub key_source: String,
    /// Files written by the render
    #[serde(default)]
    pub artifacts: IndexMap<String, ArtifactLock>,
    /// Per-declaration hashes, topological order
    #[serde(default)]
    pub declarations: IndexMap<String, DeclarationLock>,
}

/// A rendered file on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactLock {
    pub path: String,
    pub hash: String,
}

/// Per-declaration lock entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclarationLock {
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub group: Group,
    pub hash: String,
}

// ============================================================================
// Provenance events
// ============================================================================

/// Event for the JSONL render log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProvenanceEvent {
    RenderStarted {
        stack: String,
        run_id: String,
        devstack_version: String,
    },
    DeclarationRendered {
        stack: String,
        declaration: String,
        kind: ResourceKind,
        hash: String,
    },
    RenderCompleted {
        stack: String,
        run_id: String,
        declarations: u32,
        program_hash: String,
        total_seconds: f64,
    },
    DriftDetected {
        stack: String,
        artifact: String,
        expected_hash: String,
        actual_hash: String,
    },
}

/// Timestamped event wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampedEvent {
    pub ts: String,
    #[serde(flatten)]
    pub event: ProvenanceEvent,
}

// ============================================================================
// Tests
// ============================================================================
