//! Security group handler.
//!
//! CIDR-peer rules render inline. Rules whose peer is another security
//! group render as standalone ingress resources so two groups can point at
//! each other without a dependency cycle.

use crate::core::error::StackResult;
use crate::core::intrinsics::{logical_id, reference};
use crate::core::synth::{construct_logical_id, SynthContext};
use crate::core::types::{
    ConstructKind, Peer, PortRange, Protocol, Rule, SecurityGroup, TemplateResource,
};
use serde_json::{json, Map, Value};
use tracing::debug;

/// Render a security group construct.
pub fn render(ctx: &mut SynthContext<'_>, id: &str, sg: &SecurityGroup) -> StackResult<()> {
    let sg_id = construct_logical_id(id, ConstructKind::SecurityGroup);
    let vpc_id = ctx.construct_id(&sg.network, ConstructKind::Network)?;

    let ingress: Vec<Value> = sg
        .ingress
        .iter()
        .filter(|r| !matches!(r.peer, Peer::SecurityGroup(_)))
        .map(cidr_rule)
        .collect();

    let egress: Vec<Value> = if sg.allow_all_outbound {
        if !sg.egress.is_empty() {
            debug!(
                security_group = id,
                rules = sg.egress.len(),
                "egress rules subsumed by allow-all-outbound"
            );
        }
        vec![json!({
            "CidrIp": "0.0.0.0/0",
            "Description": "Allow all outbound traffic by default",
            "IpProtocol": "-1"
        })]
    } else {
        let mut rules = Vec::new();
        for rule in &sg.egress {
            match &rule.peer {
                Peer::SecurityGroup(peer) => {
                    let mut v = port_fields(&rule.port);
                    v.insert("Description".into(), json!(rule.description));
                    v.insert("DestinationSecurityGroupId".into(), ctx.security_group_id(peer)?);
                    rules.push(Value::Object(v));
                }
                _ => rules.push(cidr_rule(rule)),
            }
        }
        rules
    };

    let mut resource = TemplateResource::new("AWS::EC2::SecurityGroup")
        .prop("GroupDescription", json!(sg.description))
        .prop("SecurityGroupEgress", Value::Array(egress))
        .prop("VpcId", reference(&vpc_id));
    if !ingress.is_empty() {
        resource = resource.prop("SecurityGroupIngress", Value::Array(ingress));
    }
    ctx.insert(sg_id, resource)?;

    for rule in &sg.ingress {
        if let Peer::SecurityGroup(peer) = &rule.peer {
            render_peer_ingress(ctx, id, peer, &rule.port, &rule.description)?;
        }
    }
    Ok(())
}

/// Standalone ingress into `target` from members of `source`.
pub fn render_peer_ingress(
    ctx: &mut SynthContext<'_>,
    target: &str,
    source: &str,
    port: &PortRange,
    description: &str,
) -> StackResult<()> {
    let label = format!("from {}:{}", source, port_label(port));
    let rule_id = logical_id(&[target, &label]);
    let mut props = port_fields(port);
    props.insert("Description".into(), json!(description));
    props.insert("GroupId".into(), ctx.security_group_id(target)?);
    props.insert("SourceSecurityGroupId".into(), ctx.security_group_id(source)?);

    let mut resource = TemplateResource::new("AWS::EC2::SecurityGroupIngress");
    resource.properties = props;
    ctx.insert(rule_id, resource)?;
    Ok(())
}

fn cidr_rule(rule: &Rule) -> Value {
    let mut v = port_fields(&rule.port);
    v.insert("CidrIp".into(), json!(rule.peer.to_string()));
    v.insert("Description".into(), json!(rule.description));
    Value::Object(v)
}

fn port_fields(port: &PortRange) -> Map<String, Value> {
    let mut m = Map::new();
    m.insert("IpProtocol".into(), json!(port.protocol.ip_protocol()));
    if port.protocol != Protocol::All {
        m.insert("FromPort".into(), json!(port.from));
        m.insert("ToPort".into(), json!(port.to));
    }
    m
}

fn port_label(port: &PortRange) -> String {
    match port.protocol {
        Protocol::All => "ALL".to_string(),
        _ if port.from == port.to => port.from.to_string(),
        _ => format!("{}-{}", port.from, port.to),
    }
}
