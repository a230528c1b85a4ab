//! Network handler: VPC, internet gateway, subnets and routing.
//!
//! Subnet CIDRs are carved sequentially from the network block and spread
//! round-robin over the first `max_azs` availability zones of the region.
//! Public subnets get a default route through the internet gateway.

use crate::core::cidr;
use crate::core::error::StackResult;
use crate::core::intrinsics::{logical_id, reference, select_az};
use crate::core::synth::{construct_logical_id, subnet_logical_id, SynthContext};
use crate::core::types::{ConstructKind, Network, SubnetKind, TemplateResource};
use serde_json::json;

/// Render a network construct.
pub fn render(ctx: &mut SynthContext<'_>, id: &str, network: &Network) -> StackResult<()> {
    let block = cidr::parse_block(&network.cidr)?;
    let masks: Vec<u8> = network.subnets.iter().map(|s| s.cidr_mask).collect();
    let blocks = cidr::allocate(&block, &masks)?;

    let vpc_id = construct_logical_id(id, ConstructKind::Network);
    let vpc = TemplateResource::new("AWS::EC2::VPC")
        .prop("CidrBlock", json!(block.to_string()))
        .prop("EnableDnsHostnames", json!(network.enable_dns_hostnames))
        .prop("EnableDnsSupport", json!(network.enable_dns_support))
        .prop("InstanceTenancy", json!("default"))
        .prop("Tags", ctx.name_tag(&[id]));
    ctx.insert(vpc_id.clone(), vpc)?;

    let has_public = network.subnets.iter().any(|s| s.kind == SubnetKind::Public);
    let gateway = if has_public {
        let igw_id = logical_id(&[id, "IGW"]);
        let attach_id = logical_id(&[id, "VPCGW"]);
        ctx.insert(
            igw_id.clone(),
            TemplateResource::new("AWS::EC2::InternetGateway").prop("Tags", ctx.name_tag(&[id])),
        )?;
        ctx.insert(
            attach_id.clone(),
            TemplateResource::new("AWS::EC2::VPCGatewayAttachment")
                .prop("VpcId", reference(&vpc_id))
                .prop("InternetGatewayId", reference(&igw_id)),
        )?;
        Some((igw_id, attach_id))
    } else {
        None
    };

    let az_count = usize::from(network.max_azs.max(1));
    for (index, (spec, subnet_block)) in network.subnets.iter().zip(&blocks).enumerate() {
        let subnet_id = subnet_logical_id(id, &spec.name, "Subnet");
        let table_id = subnet_logical_id(id, &spec.name, "RouteTable");
        let assoc_id = subnet_logical_id(id, &spec.name, "RouteTableAssociation");
        let scope = format!("{}Subnet", spec.name);

        ctx.insert(
            subnet_id.clone(),
            TemplateResource::new("AWS::EC2::Subnet")
                .prop("VpcId", reference(&vpc_id))
                .prop("AvailabilityZone", select_az(index % az_count))
                .prop("CidrBlock", json!(subnet_block.to_string()))
                .prop("MapPublicIpOnLaunch", json!(spec.map_public_ip_on_launch))
                .prop(
                    "Tags",
                    json!([
                        { "Key": "Name", "Value": format!("{}/{}/{}", ctx.stack.id, id, scope) },
                        { "Key": "stackform:subnet-type", "Value": spec.kind.to_string() }
                    ]),
                ),
        )?;
        ctx.insert(
            table_id.clone(),
            TemplateResource::new("AWS::EC2::RouteTable")
                .prop("VpcId", reference(&vpc_id))
                .prop("Tags", ctx.name_tag(&[id, &scope])),
        )?;
        ctx.insert(
            assoc_id,
            TemplateResource::new("AWS::EC2::SubnetRouteTableAssociation")
                .prop("RouteTableId", reference(&table_id))
                .prop("SubnetId", reference(&subnet_id)),
        )?;

        if let (SubnetKind::Public, Some((igw_id, attach_id))) = (spec.kind, &gateway) {
            let mut route = TemplateResource::new("AWS::EC2::Route")
                .prop("RouteTableId", reference(&table_id))
                .prop("DestinationCidrBlock", json!("0.0.0.0/0"))
                .prop("GatewayId", reference(igw_id));
            route.depends_on.push(attach_id.clone());
            ctx.insert(default_route_id(id, &spec.name), route)?;
        }
    }

    Ok(())
}

/// Logical id of a public subnet's default route.
pub fn default_route_id(network: &str, subnet: &str) -> String {
    subnet_logical_id(network, subnet, "DefaultRoute")
}
