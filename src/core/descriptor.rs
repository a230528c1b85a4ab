//! The stack descriptor: builds the ALB + auto-scaling topology.
//!
//! Construction is a single synchronous pass. Parameters pass through
//! verbatim; the one side effect is fetching key material from the
//! injected [`KeyMaterialProvider`]. If that fails, no stack is returned.

use super::config::StackConfig;
use super::error::{StackError, StackResult};
use super::keys::KeyMaterialProvider;
use super::types::*;
use indexmap::IndexMap;
use tracing::{debug, info};

const HTTP_PORT: u16 = 80;
const SSH_PORT: u16 = 22;

/// Incremental builder for a [`Stack`].
#[derive(Debug)]
pub struct StackBuilder {
    id: String,
    env: StackEnv,
    description: Option<String>,
    constructs: IndexMap<String, Construct>,
    outputs: IndexMap<String, StackOutput>,
}

impl StackBuilder {
    pub fn new(id: &str, env: StackEnv) -> Self {
        Self {
            id: id.to_string(),
            env,
            description: None,
            constructs: IndexMap::new(),
            outputs: IndexMap::new(),
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Declare a construct. Ids are unique within a stack.
    pub fn add(&mut self, id: &str, construct: Construct) -> StackResult<String> {
        if self.constructs.contains_key(id) {
            return Err(StackError::Config(format!(
                "construct '{}' is already declared in stack '{}'",
                id, self.id
            )));
        }
        debug!(construct = id, kind = %construct.kind(), "declared construct");
        self.constructs.insert(id.to_string(), construct);
        Ok(id.to_string())
    }

    /// Register an auto-scaling group's instances with a target group.
    pub fn attach_to_target_group(&mut self, asg: &str, target_group: &str) -> StackResult<()> {
        match self.constructs.get_mut(asg) {
            Some(Construct::AutoScalingGroup(group)) => {
                if !group.target_groups.iter().any(|t| t == target_group) {
                    group.target_groups.push(target_group.to_string());
                }
                debug!(asg, target_group, "attached to target group");
                Ok(())
            }
            _ => Err(StackError::Reference(format!(
                "'{}' is not an auto-scaling group",
                asg
            ))),
        }
    }

    /// Emit a named output.
    pub fn output(&mut self, name: &str, construct: &str, attribute: OutputAttribute) {
        self.outputs.insert(
            name.to_string(),
            StackOutput {
                construct: construct.to_string(),
                attribute,
                description: None,
            },
        );
    }

    pub fn build(self) -> Stack {
        Stack {
            id: self.id,
            env: self.env,
            description: self.description,
            constructs: self.constructs,
            outputs: self.outputs,
        }
    }
}

/// Subnet references for the named subnets of a network.
fn subnet_refs(network: &str, names: &[&str]) -> Vec<SubnetRef> {
    names
        .iter()
        .map(|name| SubnetRef {
            network: network.to_string(),
            subnet: name.to_string(),
        })
        .collect()
}

/// HTTP and SSH from anywhere. A listener on another port is opened too.
fn add_public_ingress(sg: &mut SecurityGroup, listener_port: u16) {
    sg.add_ingress_rule(Peer::AnyIpv4, PortRange::tcp(HTTP_PORT), "Allow HTTP");
    sg.add_ingress_rule(Peer::AnyIpv4, PortRange::tcp(SSH_PORT), "Allow SSH");
    if listener_port != HTTP_PORT {
        sg.add_ingress_rule(Peer::AnyIpv4, PortRange::tcp(listener_port), "Allow listener");
    }
}

/// Evaluate the descriptor: network, security groups, load balancer, target
/// group, listener, key pair, launch template, auto-scaling group, outputs.
pub fn sample_asg_alb_stack(
    config: &StackConfig,
    keys: &dyn KeyMaterialProvider,
) -> StackResult<Stack> {
    info!(
        stack = %config.stack_name,
        region = %config.region,
        account = config.account.as_deref().unwrap_or("-"),
        "evaluating stack descriptor"
    );

    let env = StackEnv {
        account: config.account.clone(),
        region: config.region.clone(),
    };
    let mut stack = StackBuilder::new(&config.stack_name, env)
        .description("Application load balancer in front of an auto-scaling group");

    // Two public subnets for load-balancer redundancy, one isolated.
    let vpc = stack.add(
        "Vpc",
        Construct::Network(Network {
            cidr: config.vpc_cidr.clone(),
            subnets: vec![
                SubnetSpec::public("Public1", 24),
                SubnetSpec::public("Public2", 24),
                SubnetSpec::private_isolated("Private", 24),
            ],
            max_azs: 2,
            enable_dns_hostnames: true,
            enable_dns_support: true,
        }),
    )?;
    let public_subnets = ["Public1", "Public2"];

    let mut instance_sg = SecurityGroup::new(&vpc, "Instance security group");
    add_public_ingress(&mut instance_sg, config.http_port);
    let instance_sg = stack.add("InstanceSecurityGroup", Construct::SecurityGroup(instance_sg))?;

    let mut elb_sg = SecurityGroup::new(&vpc, "Load balancer security group");
    add_public_ingress(&mut elb_sg, config.http_port);
    elb_sg.add_egress_rule(Peer::AnyIpv4, PortRange::all_tcp(), "Allow all outbound");
    let elb_sg = stack.add("ElbSecurityGroup", Construct::SecurityGroup(elb_sg))?;

    let elb = stack.add(
        "Elb",
        Construct::LoadBalancer(LoadBalancer {
            security_group: elb_sg,
            subnets: subnet_refs(&vpc, &public_subnets),
            internet_facing: true,
        }),
    )?;

    let target_group = stack.add(
        "TargetGroup",
        Construct::TargetGroup(TargetGroup {
            network: vpc.clone(),
            port: config.http_port,
            protocol: AppProtocol::Http,
            target_type: TargetType::Instance,
            health_check: HealthCheck {
                path: "/".to_string(),
                healthy_threshold: 2,
                unhealthy_threshold: 3,
                timeout_secs: 10,
                interval_secs: 30,
                healthy_http_codes: "200-299".to_string(),
            },
        }),
    )?;

    stack.add(
        "Listener",
        Construct::Listener(Listener {
            load_balancer: elb.clone(),
            port: config.http_port,
            protocol: AppProtocol::Http,
            default_action: ListenerAction::Forward {
                target_group: target_group.clone(),
            },
        }),
    )?;

    debug!(source = %keys.describe(), "reading key material");
    let key_material = keys.public_key()?;
    let key = stack.add(
        "KeyPair",
        Construct::KeyPair(KeyPair {
            key_name: config.key_name.clone(),
            public_key_material: key_material,
        }),
    )?;

    let instance_type: InstanceType = config
        .instance_type
        .parse()
        .map_err(StackError::Config)?;
    let launch_template = stack.add(
        "LaunchTemplate",
        Construct::LaunchTemplate(LaunchTemplate {
            machine_image: MachineImage::AmazonLinux,
            instance_type,
            security_group: instance_sg,
            key_pair: key,
        }),
    )?;

    let asg = stack.add(
        "AutoscalingGroup",
        Construct::AutoScalingGroup(AutoScalingGroup {
            launch_template,
            subnets: subnet_refs(&vpc, &public_subnets),
            capacity: config.capacity,
            health_check: GroupHealthCheck {
                kind: GroupHealthCheckKind::Ec2,
                grace_secs: config.health_check_grace_secs(),
            },
            target_groups: Vec::new(),
        }),
    )?;
    stack.attach_to_target_group(&asg, &target_group)?;

    stack.output("VpcName", &vpc, OutputAttribute::NetworkId);
    stack.output("ASGName", &asg, OutputAttribute::GroupName);
    stack.output("LoadBalancerDNS", &elb, OutputAttribute::DnsName);

    let stack = stack.build();
    info!(
        stack = %stack.id,
        constructs = stack.constructs.len(),
        outputs = stack.outputs.len(),
        "stack descriptor evaluated"
    );
    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::keys::{FileKeyProvider, StaticKeyProvider};

    const KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIG ops@example";

    fn build() -> Stack {
        sample_asg_alb_stack(&StackConfig::default(), &StaticKeyProvider(KEY.into())).unwrap()
    }

    #[test]
    fn test_desc_network_layout() {
        let stack = build();
        let networks: Vec<_> = stack.of_kind(ConstructKind::Network).collect();
        assert_eq!(networks.len(), 1);

        let vpc = stack.network("Vpc").unwrap();
        let public = vpc.public_subnets();
        assert_eq!(public.len(), 2);
        let private: Vec<_> = vpc
            .subnets
            .iter()
            .filter(|s| s.kind == SubnetKind::PrivateIsolated)
            .collect();
        assert_eq!(private.len(), 1);
        assert!(vpc.subnets.iter().all(|s| s.cidr_mask == 24));
        assert!(public.iter().all(|s| s.map_public_ip_on_launch));
    }

    #[test]
    fn test_desc_elb_security_group() {
        let stack = build();
        let sg = stack.security_group("ElbSecurityGroup").unwrap();
        assert!(sg.allows_ingress_from_anywhere(Protocol::Tcp, 80));
        assert!(sg.allows_ingress_from_anywhere(Protocol::Tcp, 22));
        assert!(sg.allow_all_outbound);
        assert!(sg
            .egress
            .iter()
            .any(|r| r.peer.is_anywhere() && r.port == PortRange::all_tcp()));
    }

    #[test]
    fn test_desc_http_and_ssh_open_for_any_listener_port() {
        for port in [80u16, 8080, 443] {
            let config = StackConfig {
                http_port: port,
                ..StackConfig::default()
            };
            let stack = sample_asg_alb_stack(&config, &StaticKeyProvider(KEY.into())).unwrap();
            for id in ["ElbSecurityGroup", "InstanceSecurityGroup"] {
                let sg = stack.security_group(id).unwrap();
                assert!(sg.allows_ingress_from_anywhere(Protocol::Tcp, 80), "{id} on {port}");
                assert!(sg.allows_ingress_from_anywhere(Protocol::Tcp, 22), "{id} on {port}");
                assert!(sg.allows_ingress_from_anywhere(Protocol::Tcp, port), "{id} on {port}");
            }
        }
        let rules = build().security_group("ElbSecurityGroup").unwrap().ingress.len();
        assert_eq!(rules, 2);
    }

    #[test]
    fn test_desc_instance_security_group() {
        let stack = build();
        let sg = stack.security_group("InstanceSecurityGroup").unwrap();
        assert!(sg.allows_ingress_from_anywhere(Protocol::Tcp, 80));
        assert!(sg.allows_ingress_from_anywhere(Protocol::Tcp, 22));
    }

    #[test]
    fn test_desc_health_check_literals() {
        let stack = build();
        let hc = &stack.target_group("TargetGroup").unwrap().health_check;
        assert_eq!(hc.healthy_threshold, 2);
        assert_eq!(hc.unhealthy_threshold, 3);
        assert_eq!(hc.interval_secs, 30);
        assert_eq!(hc.timeout_secs, 10);
        assert_eq!(hc.path, "/");
        assert_eq!(hc.healthy_http_codes, "200-299");
        assert!(hc.interval_secs > hc.timeout_secs);
    }

    #[test]
    fn test_desc_capacity_bounds() {
        let stack = build();
        let asg = stack.auto_scaling_group("AutoscalingGroup").unwrap();
        assert_eq!(asg.capacity.min, 1);
        assert_eq!(asg.capacity.desired, Some(1));
        assert_eq!(asg.capacity.max, 2);
        assert!(asg.capacity.is_consistent());
        assert_eq!(asg.health_check.kind, GroupHealthCheckKind::Ec2);
        assert_eq!(asg.health_check.grace_secs, 30 * 60);
        assert_eq!(asg.target_groups, vec!["TargetGroup"]);
    }

    #[test]
    fn test_desc_elb_uses_public_pair() {
        let stack = build();
        let elb = stack.load_balancer("Elb").unwrap();
        assert!(elb.internet_facing);
        let names: Vec<_> = elb.subnets.iter().map(|s| s.subnet.as_str()).collect();
        assert_eq!(names, vec!["Public1", "Public2"]);
    }

    #[test]
    fn test_desc_launch_template() {
        let stack = build();
        let lt = stack.launch_template("LaunchTemplate").unwrap();
        assert_eq!(lt.instance_type.to_string(), "t2.micro");
        assert_eq!(lt.machine_image, MachineImage::AmazonLinux);
        assert_eq!(lt.key_pair, "KeyPair");
        match stack.get("KeyPair") {
            Some(Construct::KeyPair(k)) => {
                assert_eq!(k.key_name, "instanceKey");
                assert_eq!(k.public_key_material, KEY);
            }
            other => panic!("expected key pair, got {:?}", other),
        }
    }

    #[test]
    fn test_desc_outputs() {
        let stack = build();
        let names: Vec<_> = stack.outputs.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["VpcName", "ASGName", "LoadBalancerDNS"]);
        assert!(stack.outputs.values().all(|o| !o.token().is_empty()));
    }

    #[test]
    fn test_desc_env_passthrough() {
        let config = StackConfig {
            account: Some("123456789012".into()),
            region: "eu-central-1".into(),
            ..StackConfig::default()
        };
        let stack = sample_asg_alb_stack(&config, &StaticKeyProvider(KEY.into())).unwrap();
        assert_eq!(stack.env.account.as_deref(), Some("123456789012"));
        assert_eq!(stack.env.region, "eu-central-1");
    }

    #[test]
    fn test_desc_missing_key_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let keys = FileKeyProvider::new(dir.path().join("missing.pub"));
        let err = sample_asg_alb_stack(&StackConfig::default(), &keys).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_desc_bad_instance_type() {
        let config = StackConfig {
            instance_type: "micro".into(),
            ..StackConfig::default()
        };
        let err = sample_asg_alb_stack(&config, &StaticKeyProvider(KEY.into())).unwrap_err();
        assert!(matches!(err, StackError::Config(_)));
    }

    #[test]
    fn test_desc_builder_duplicate_id() {
        let env = StackEnv {
            account: None,
            region: "us-east-1".into(),
        };
        let mut b = StackBuilder::new("S", env);
        let kp = || {
            Construct::KeyPair(KeyPair {
                key_name: "k".into(),
                public_key_material: "m".into(),
            })
        };
        b.add("Key", kp()).unwrap();
        assert!(b.add("Key", kp()).is_err());
    }

    #[test]
    fn test_desc_attach_requires_asg() {
        let env = StackEnv {
            account: None,
            region: "us-east-1".into(),
        };
        let mut b = StackBuilder::new("S", env);
        assert!(b.attach_to_target_group("Nope", "TargetGroup").is_err());
    }

    #[test]
    fn test_desc_attach_is_idempotent() {
        let mut stack = StackBuilder::new(
            "S",
            StackEnv {
                account: None,
                region: "us-east-1".into(),
            },
        );
        stack
            .add(
                "Asg",
                Construct::AutoScalingGroup(AutoScalingGroup {
                    launch_template: "Lt".into(),
                    subnets: vec![],
                    capacity: Capacity { min: 1, desired: None, max: 1 },
                    health_check: GroupHealthCheck {
                        kind: GroupHealthCheckKind::Ec2,
                        grace_secs: 0,
                    },
                    target_groups: vec![],
                }),
            )
            .unwrap();
        stack.attach_to_target_group("Asg", "Tg").unwrap();
        stack.attach_to_target_group("Asg", "Tg").unwrap();
        let built = stack.build();
        assert_eq!(built.auto_scaling_group("Asg").unwrap().target_groups.len(), 1);
    }
}
