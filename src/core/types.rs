//! Stack data model: constructs, synthesized template, snapshot lock, plan.
//!
//! Constructs are the declared entities of the topology (network, security
//! groups, load balancer, ...). They reference each other by construct id.
//! Nothing here validates; see [`crate::core::validate`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Stack
// ============================================================================

/// Deployment target of a stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackEnv {
    /// Account identifier (unset means environment-agnostic)
    pub account: Option<String>,

    /// Region name
    pub region: String,
}

/// The desired-state resource graph produced by one descriptor evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct Stack {
    /// Stack name
    pub id: String,

    /// Deployment target
    pub env: StackEnv,

    /// Optional template description
    pub description: Option<String>,

    /// Declared constructs (construction order preserved)
    pub constructs: IndexMap<String, Construct>,

    /// Named informational outputs
    pub outputs: IndexMap<String, StackOutput>,
}

impl Stack {
    /// Look up a construct by id.
    pub fn get(&self, id: &str) -> Option<&Construct> {
        self.constructs.get(id)
    }

    /// Look up a network construct by id.
    pub fn network(&self, id: &str) -> Option<&Network> {
        match self.constructs.get(id) {
            Some(Construct::Network(n)) => Some(n),
            _ => None,
        }
    }

    /// Look up a security group construct by id.
    pub fn security_group(&self, id: &str) -> Option<&SecurityGroup> {
        match self.constructs.get(id) {
            Some(Construct::SecurityGroup(sg)) => Some(sg),
            _ => None,
        }
    }

    /// Look up a target group construct by id.
    pub fn target_group(&self, id: &str) -> Option<&TargetGroup> {
        match self.constructs.get(id) {
            Some(Construct::TargetGroup(tg)) => Some(tg),
            _ => None,
        }
    }

    /// Look up a load balancer construct by id.
    pub fn load_balancer(&self, id: &str) -> Option<&LoadBalancer> {
        match self.constructs.get(id) {
            Some(Construct::LoadBalancer(lb)) => Some(lb),
            _ => None,
        }
    }

    /// Look up a launch template construct by id.
    pub fn launch_template(&self, id: &str) -> Option<&LaunchTemplate> {
        match self.constructs.get(id) {
            Some(Construct::LaunchTemplate(lt)) => Some(lt),
            _ => None,
        }
    }

    /// Look up an auto-scaling group construct by id.
    pub fn auto_scaling_group(&self, id: &str) -> Option<&AutoScalingGroup> {
        match self.constructs.get(id) {
            Some(Construct::AutoScalingGroup(asg)) => Some(asg),
            _ => None,
        }
    }

    /// All constructs of one kind, in declaration order.
    pub fn of_kind(&self, kind: ConstructKind) -> impl Iterator<Item = (&String, &Construct)> {
        self.constructs.iter().filter(move |(_, c)| c.kind() == kind)
    }
}

// ============================================================================
// Constructs
// ============================================================================

/// One declared entity of the topology.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Construct {
    Network(Network),
    SecurityGroup(SecurityGroup),
    LoadBalancer(LoadBalancer),
    TargetGroup(TargetGroup),
    Listener(Listener),
    KeyPair(KeyPair),
    LaunchTemplate(LaunchTemplate),
    AutoScalingGroup(AutoScalingGroup),
}

/// Construct kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructKind {
    Network,
    SecurityGroup,
    LoadBalancer,
    TargetGroup,
    Listener,
    KeyPair,
    LaunchTemplate,
    AutoScalingGroup,
}

impl fmt::Display for ConstructKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::SecurityGroup => write!(f, "security_group"),
            Self::LoadBalancer => write!(f, "load_balancer"),
            Self::TargetGroup => write!(f, "target_group"),
            Self::Listener => write!(f, "listener"),
            Self::KeyPair => write!(f, "key_pair"),
            Self::LaunchTemplate => write!(f, "launch_template"),
            Self::AutoScalingGroup => write!(f, "auto_scaling_group"),
        }
    }
}

impl Construct {
    pub fn kind(&self) -> ConstructKind {
        match self {
            Self::Network(_) => ConstructKind::Network,
            Self::SecurityGroup(_) => ConstructKind::SecurityGroup,
            Self::LoadBalancer(_) => ConstructKind::LoadBalancer,
            Self::TargetGroup(_) => ConstructKind::TargetGroup,
            Self::Listener(_) => ConstructKind::Listener,
            Self::KeyPair(_) => ConstructKind::KeyPair,
            Self::LaunchTemplate(_) => ConstructKind::LaunchTemplate,
            Self::AutoScalingGroup(_) => ConstructKind::AutoScalingGroup,
        }
    }

    /// Construct ids this construct points at, with the kind each must be.
    pub fn references(&self) -> Vec<(&str, ConstructKind)> {
        let mut refs = Vec::new();
        match self {
            Self::Network(_) | Self::KeyPair(_) => {}
            Self::SecurityGroup(sg) => {
                refs.push((sg.network.as_str(), ConstructKind::Network));
                for rule in sg.ingress.iter().chain(sg.egress.iter()) {
                    if let Peer::SecurityGroup(id) = &rule.peer {
                        refs.push((id.as_str(), ConstructKind::SecurityGroup));
                    }
                }
            }
            Self::LoadBalancer(lb) => {
                refs.push((lb.security_group.as_str(), ConstructKind::SecurityGroup));
                for s in &lb.subnets {
                    refs.push((s.network.as_str(), ConstructKind::Network));
                }
            }
            Self::TargetGroup(tg) => {
                refs.push((tg.network.as_str(), ConstructKind::Network));
            }
            Self::Listener(l) => {
                refs.push((l.load_balancer.as_str(), ConstructKind::LoadBalancer));
                let ListenerAction::Forward { target_group } = &l.default_action;
                refs.push((target_group.as_str(), ConstructKind::TargetGroup));
            }
            Self::LaunchTemplate(lt) => {
                refs.push((lt.security_group.as_str(), ConstructKind::SecurityGroup));
                refs.push((lt.key_pair.as_str(), ConstructKind::KeyPair));
            }
            Self::AutoScalingGroup(asg) => {
                refs.push((asg.launch_template.as_str(), ConstructKind::LaunchTemplate));
                for s in &asg.subnets {
                    refs.push((s.network.as_str(), ConstructKind::Network));
                }
                for tg in &asg.target_groups {
                    refs.push((tg.as_str(), ConstructKind::TargetGroup));
                }
            }
        }
        refs
    }
}

// -- Network --

/// Virtual network: an address block partitioned into subnets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Network {
    /// Address block, e.g. "10.0.0.0/16"
    pub cidr: String,

    /// Subnet layout, allocated in order from the start of the block
    pub subnets: Vec<SubnetSpec>,

    /// Availability zones the subnets are spread over (round-robin)
    pub max_azs: u8,

    pub enable_dns_hostnames: bool,
    pub enable_dns_support: bool,
}

impl Network {
    /// Public subnets in declaration order.
    pub fn public_subnets(&self) -> Vec<&SubnetSpec> {
        self.subnets
            .iter()
            .filter(|s| s.kind == SubnetKind::Public)
            .collect()
    }

    pub fn subnet(&self, name: &str) -> Option<&SubnetSpec> {
        self.subnets.iter().find(|s| s.name == name)
    }
}

/// One subnet of a network.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubnetSpec {
    pub name: String,
    pub kind: SubnetKind,
    pub cidr_mask: u8,
    pub map_public_ip_on_launch: bool,
}

impl SubnetSpec {
    pub fn public(name: &str, cidr_mask: u8) -> Self {
        Self {
            name: name.to_string(),
            kind: SubnetKind::Public,
            cidr_mask,
            map_public_ip_on_launch: true,
        }
    }

    pub fn private_isolated(name: &str, cidr_mask: u8) -> Self {
        Self {
            name: name.to_string(),
            kind: SubnetKind::PrivateIsolated,
            cidr_mask,
            map_public_ip_on_launch: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubnetKind {
    Public,
    PrivateIsolated,
}

impl fmt::Display for SubnetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::PrivateIsolated => write!(f, "private-isolated"),
        }
    }
}

/// A subnet of a specific network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubnetRef {
    pub network: String,
    pub subnet: String,
}

// -- Security groups --

/// Security group with additive rules.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityGroup {
    /// Owning network
    pub network: String,

    pub description: String,

    /// Permit all outbound traffic; explicit egress rules become redundant
    pub allow_all_outbound: bool,

    pub ingress: Vec<Rule>,
    pub egress: Vec<Rule>,
}

impl SecurityGroup {
    pub fn new(network: &str, description: &str) -> Self {
        Self {
            network: network.to_string(),
            description: description.to_string(),
            allow_all_outbound: true,
            ingress: Vec::new(),
            egress: Vec::new(),
        }
    }

    pub fn add_ingress_rule(&mut self, peer: Peer, port: PortRange, description: &str) {
        self.ingress.push(Rule {
            peer,
            port,
            description: description.to_string(),
        });
    }

    pub fn add_egress_rule(&mut self, peer: Peer, port: PortRange, description: &str) {
        self.egress.push(Rule {
            peer,
            port,
            description: description.to_string(),
        });
    }

    /// True when some ingress rule admits `protocol`/`port` from any IPv4 address.
    pub fn allows_ingress_from_anywhere(&self, protocol: Protocol, port: u16) -> bool {
        self.ingress
            .iter()
            .any(|r| r.peer.is_anywhere() && r.port.covers(protocol, port))
    }
}

/// A single ingress or egress rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub peer: Peer,
    pub port: PortRange,
    pub description: String,
}

/// Traffic source or destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Peer {
    AnyIpv4,
    Cidr(String),
    SecurityGroup(String),
}

impl Peer {
    pub fn is_anywhere(&self) -> bool {
        match self {
            Self::AnyIpv4 => true,
            Self::Cidr(c) => c == "0.0.0.0/0",
            Self::SecurityGroup(_) => false,
        }
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AnyIpv4 => write!(f, "0.0.0.0/0"),
            Self::Cidr(c) => write!(f, "{}", c),
            Self::SecurityGroup(id) => write!(f, "sg:{}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Tcp,
    Udp,
    All,
}

impl Protocol {
    /// IP protocol string as the provider expects it.
    pub fn ip_protocol(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::All => "-1",
        }
    }
}

/// Protocol plus inclusive port range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortRange {
    pub protocol: Protocol,
    pub from: u16,
    pub to: u16,
}

impl PortRange {
    pub fn tcp(port: u16) -> Self {
        Self {
            protocol: Protocol::Tcp,
            from: port,
            to: port,
        }
    }

    pub fn all_tcp() -> Self {
        Self {
            protocol: Protocol::Tcp,
            from: 0,
            to: 65535,
        }
    }

    pub fn all_traffic() -> Self {
        Self {
            protocol: Protocol::All,
            from: 0,
            to: 65535,
        }
    }

    pub fn covers(&self, protocol: Protocol, port: u16) -> bool {
        (self.protocol == Protocol::All || self.protocol == protocol)
            && self.from <= port
            && port <= self.to
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.protocol {
            Protocol::All => write!(f, "all traffic"),
            p if self.from == self.to => write!(f, "{} {}", p.ip_protocol(), self.from),
            p => write!(f, "{} {}-{}", p.ip_protocol(), self.from, self.to),
        }
    }
}

// -- Load balancing --

/// Application load balancer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadBalancer {
    pub security_group: String,
    pub subnets: Vec<SubnetRef>,
    pub internet_facing: bool,
}

/// Health-checked group of targets behind a load balancer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetGroup {
    pub network: String,
    pub port: u16,
    pub protocol: AppProtocol,
    pub target_type: TargetType,
    pub health_check: HealthCheck,
}

/// Target-group health-check policy. Values pass through unvalidated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub path: String,
    pub healthy_threshold: u32,
    pub unhealthy_threshold: u32,
    pub timeout_secs: u32,
    pub interval_secs: u32,
    /// Success codes, e.g. "200-299" or "200,202"
    pub healthy_http_codes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AppProtocol {
    Http,
    Https,
}

impl fmt::Display for AppProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => write!(f, "HTTP"),
            Self::Https => write!(f, "HTTPS"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Instance,
    Ip,
    Lambda,
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance => write!(f, "instance"),
            Self::Ip => write!(f, "ip"),
            Self::Lambda => write!(f, "lambda"),
        }
    }
}

/// Listener on a load-balancer port.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listener {
    pub load_balancer: String,
    pub port: u16,
    pub protocol: AppProtocol,
    pub default_action: ListenerAction,
}

/// Default action of a listener. Forwarding always targets exactly one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerAction {
    Forward { target_group: String },
}

// -- Compute --

/// Named public key registered with the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyPair {
    pub key_name: String,
    pub public_key_material: String,
}

/// Immutable instance specification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaunchTemplate {
    pub machine_image: MachineImage,
    pub instance_type: InstanceType,
    pub security_group: String,
    pub key_pair: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineImage {
    /// Latest Amazon Linux, resolved at deploy time through SSM
    AmazonLinux,
    /// Fixed image id
    Ami(String),
}

/// Public SSM parameter holding the latest Amazon Linux image id.
pub const AMAZON_LINUX_SSM_PARAMETER: &str =
    "/aws/service/ami-amazon-linux-latest/amzn-ami-hvm-x86_64-gp2";

/// Instance class and size, rendered as "class.size".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceType {
    pub class: String,
    pub size: String,
}

impl InstanceType {
    pub fn of(class: &str, size: &str) -> Self {
        Self {
            class: class.to_string(),
            size: size.to_string(),
        }
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class, self.size)
    }
}

impl FromStr for InstanceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((class, size)) if !class.is_empty() && !size.is_empty() => {
                Ok(Self::of(class, size))
            }
            _ => Err(format!("invalid instance type '{}', expected class.size", s)),
        }
    }
}

/// Auto-scaling group of instances launched from one template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutoScalingGroup {
    pub launch_template: String,
    pub subnets: Vec<SubnetRef>,
    pub capacity: Capacity,
    pub health_check: GroupHealthCheck,
    /// Target groups instances register with
    pub target_groups: Vec<String>,
}

/// Capacity bounds. Consistency is not enforced at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Capacity {
    pub min: u32,
    #[serde(default)]
    pub desired: Option<u32>,
    pub max: u32,
}

impl Capacity {
    /// min <= desired <= max (desired defaults to min).
    pub fn is_consistent(&self) -> bool {
        let desired = self.desired.unwrap_or(self.min);
        self.min <= desired && desired <= self.max
    }
}

/// Instance replacement policy of an auto-scaling group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GroupHealthCheck {
    pub kind: GroupHealthCheckKind,
    pub grace_secs: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupHealthCheckKind {
    Ec2,
    Elb,
}

impl fmt::Display for GroupHealthCheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ec2 => write!(f, "EC2"),
            Self::Elb => write!(f, "ELB"),
        }
    }
}

// -- Outputs --

/// Named informational stack output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackOutput {
    pub construct: String,
    pub attribute: OutputAttribute,
    pub description: Option<String>,
}

impl StackOutput {
    /// Deploy-time token for this output, e.g. `${Elb.DnsName}`.
    pub fn token(&self) -> String {
        format!("${{{}.{}}}", self.construct, self.attribute)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputAttribute {
    /// Network identifier
    NetworkId,
    /// Auto-scaling group name
    GroupName,
    /// Load balancer DNS name
    DnsName,
}

impl fmt::Display for OutputAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetworkId => write!(f, "NetworkId"),
            Self::GroupName => write!(f, "GroupName"),
            Self::DnsName => write!(f, "DnsName"),
        }
    }
}

// ============================================================================
// Synthesized template
// ============================================================================

/// Provider template produced by synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, TemplateParameter>,

    pub resources: IndexMap<String, TemplateResource>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, TemplateOutput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateParameter {
    #[serde(rename = "Type")]
    pub parameter_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateResource {
    #[serde(rename = "Type")]
    pub resource_type: String,

    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl TemplateResource {
    pub fn new(resource_type: &str) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            properties: serde_json::Map::new(),
            depends_on: Vec::new(),
        }
    }

    /// Builder-style property setter.
    pub fn prop(mut self, key: &str, value: serde_json::Value) -> Self {
        self.properties.insert(key.to_string(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateOutput {
    pub value: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ============================================================================
// Snapshot lock
// ============================================================================

/// Last-synthesized snapshot of a stack, used as the diff baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackLock {
    /// Schema version
    pub schema: String,

    /// Stack name
    pub stack: String,

    /// When the snapshot was recorded (seconds since the Unix epoch)
    pub generated_at: u64,

    /// Generator version
    pub generator: String,

    /// Per-resource snapshot, keyed by logical id
    pub resources: IndexMap<String, ResourceLock>,
}

/// Snapshot entry of one synthesized resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLock {
    /// Provider resource type
    #[serde(rename = "type")]
    pub resource_type: String,

    /// BLAKE3 of the whole resource body
    pub hash: String,

    /// BLAKE3 per top-level property
    #[serde(default)]
    pub properties: IndexMap<String, String>,
}

// ============================================================================
// Plan
// ============================================================================

/// Action the provisioning engine would take on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanAction {
    Create,
    Update,
    Replace,
    Destroy,
    NoOp,
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "CREATE"),
            Self::Update => write!(f, "UPDATE"),
            Self::Replace => write!(f, "REPLACE"),
            Self::Destroy => write!(f, "DESTROY"),
            Self::NoOp => write!(f, "NO-OP"),
        }
    }
}

/// A single planned change.
#[derive(Debug, Clone)]
pub struct PlannedChange {
    /// Logical id
    pub logical_id: String,

    /// Provider resource type
    pub resource_type: String,

    /// Action to take
    pub action: PlanAction,

    /// Human-readable description
    pub description: String,
}

/// Diff of a synthesized template against its snapshot.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    /// Stack name
    pub name: String,

    /// Planned changes in execution order
    pub changes: Vec<PlannedChange>,

    /// Topological order of the desired resources
    pub execution_order: Vec<String>,

    /// Summary counts
    pub to_create: u32,
    pub to_update: u32,
    pub to_replace: u32,
    pub to_destroy: u32,
    pub unchanged: u32,
}

impl ExecutionPlan {
    pub fn has_changes(&self) -> bool {
        self.to_create + self.to_update + self.to_replace + self.to_destroy > 0
    }
}

// ============================================================================
// Tests
// ============================================================================
