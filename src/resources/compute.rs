//! Key pair, launch template and auto-scaling group handlers.

use super::security_group::render_peer_ingress;
use crate::core::error::StackResult;
use crate::core::intrinsics::{get_att, logical_id, reference};
use crate::core::synth::{construct_logical_id, SynthContext};
use crate::core::types::{
    AutoScalingGroup, Construct, ConstructKind, KeyPair, LaunchTemplate, ListenerAction,
    MachineImage, PortRange, TemplateParameter, TemplateResource, AMAZON_LINUX_SSM_PARAMETER,
};
use serde_json::{json, Value};

const SSM_IMAGE_PARAMETER_TYPE: &str = "AWS::SSM::Parameter::Value<AWS::EC2::Image::Id>";

/// Render a key pair with its public key material embedded verbatim.
pub fn render_key_pair(ctx: &mut SynthContext<'_>, id: &str, key: &KeyPair) -> StackResult<()> {
    let resource = TemplateResource::new("AWS::EC2::KeyPair")
        .prop("KeyName", json!(key.key_name))
        .prop("PublicKeyMaterial", json!(key.public_key_material));
    ctx.insert(construct_logical_id(id, ConstructKind::KeyPair), resource)?;
    Ok(())
}

/// Render a launch template. The key name is passed by reference so the
/// key pair is registered before the template.
pub fn render_launch_template(
    ctx: &mut SynthContext<'_>,
    id: &str,
    lt: &LaunchTemplate,
) -> StackResult<()> {
    let sg = ctx.security_group_id(&lt.security_group)?;
    let key = ctx.construct_id(&lt.key_pair, ConstructKind::KeyPair)?;
    let image = image_id(ctx, &lt.machine_image);

    let data = json!({
        "ImageId": image,
        "InstanceType": lt.instance_type.to_string(),
        "KeyName": reference(&key),
        "SecurityGroupIds": [sg],
        "TagSpecifications": [
            { "ResourceType": "instance", "Tags": ctx.name_tag(&[id]) },
            { "ResourceType": "volume", "Tags": ctx.name_tag(&[id]) }
        ]
    });
    let resource = TemplateResource::new("AWS::EC2::LaunchTemplate")
        .prop("LaunchTemplateData", data)
        .prop("LaunchTemplateName", json!(format!("{}{}", ctx.stack.id, id)));

    ctx.insert(construct_logical_id(id, ConstructKind::LaunchTemplate), resource)?;
    Ok(())
}

/// Image id expression; Amazon Linux resolves through a template parameter.
fn image_id(ctx: &mut SynthContext<'_>, image: &MachineImage) -> Value {
    match image {
        MachineImage::Ami(ami) => json!(ami),
        MachineImage::AmazonLinux => {
            let param_id = logical_id(&["SsmParameterValue", AMAZON_LINUX_SSM_PARAMETER, "Parameter"]);
            ctx.parameters
                .entry(param_id.clone())
                .or_insert_with(|| TemplateParameter {
                    parameter_type: SSM_IMAGE_PARAMETER_TYPE.to_string(),
                    default: Some(AMAZON_LINUX_SSM_PARAMETER.to_string()),
                });
            reference(&param_id)
        }
    }
}

/// Render an auto-scaling group and open the target port from every load
/// balancer that forwards to one of its target groups.
pub fn render_auto_scaling_group(
    ctx: &mut SynthContext<'_>,
    id: &str,
    asg: &AutoScalingGroup,
) -> StackResult<()> {
    let lt_id = ctx.construct_id(&asg.launch_template, ConstructKind::LaunchTemplate)?;

    let mut subnets = Vec::with_capacity(asg.subnets.len());
    for subnet in &asg.subnets {
        subnets.push(reference(&ctx.subnet_id(subnet)?));
    }
    let mut target_groups = Vec::with_capacity(asg.target_groups.len());
    for tg in &asg.target_groups {
        target_groups.push(reference(&ctx.construct_id(tg, ConstructKind::TargetGroup)?));
    }

    let mut resource = TemplateResource::new("AWS::AutoScaling::AutoScalingGroup")
        .prop("MaxSize", json!(asg.capacity.max.to_string()))
        .prop("MinSize", json!(asg.capacity.min.to_string()));
    if let Some(desired) = asg.capacity.desired {
        resource = resource.prop("DesiredCapacity", json!(desired.to_string()));
    }
    resource = resource
        .prop("HealthCheckGracePeriod", json!(asg.health_check.grace_secs))
        .prop("HealthCheckType", json!(asg.health_check.kind.to_string()))
        .prop(
            "LaunchTemplate",
            json!({
                "LaunchTemplateId": reference(&lt_id),
                "Version": get_att(&lt_id, "LatestVersionNumber")
            }),
        )
        .prop("Tags", json!([{
            "Key": "Name",
            "PropagateAtLaunch": true,
            "Value": format!("{}/{}", ctx.stack.id, id)
        }]));
    if !target_groups.is_empty() {
        resource = resource.prop("TargetGroupARNs", Value::Array(target_groups));
    }
    resource = resource.prop("VPCZoneIdentifier", Value::Array(subnets));
    ctx.insert(construct_logical_id(id, ConstructKind::AutoScalingGroup), resource)?;

    render_target_connections(ctx, asg)
}

/// Ingress from each forwarding load balancer's group into the instances'
/// group on the target port.
fn render_target_connections(ctx: &mut SynthContext<'_>, asg: &AutoScalingGroup) -> StackResult<()> {
    let instance_sg = match ctx.stack.launch_template(&asg.launch_template) {
        Some(lt) => lt.security_group.clone(),
        None => return Ok(()),
    };

    let mut connections = Vec::new();
    for tg_id in &asg.target_groups {
        let Some(tg) = ctx.stack.target_group(tg_id) else {
            continue;
        };
        for (_, construct) in ctx.stack.of_kind(ConstructKind::Listener) {
            let Construct::Listener(listener) = construct else {
                continue;
            };
            let ListenerAction::Forward { target_group } = &listener.default_action;
            if target_group != tg_id {
                continue;
            }
            if let Some(lb) = ctx.stack.load_balancer(&listener.load_balancer) {
                connections.push((lb.security_group.clone(), tg.port));
            }
        }
    }

    for (lb_sg, port) in connections {
        render_peer_ingress(
            ctx,
            &instance_sg,
            &lb_sg,
            &PortRange::tcp(port),
            "Load balancer to target",
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::StackConfig;
    use crate::core::descriptor::sample_asg_alb_stack;
    use crate::core::keys::StaticKeyProvider;
    use crate::core::synth::synthesize;
    use crate::core::types::{Capacity, Template};

    fn template_with(config: &StackConfig) -> Template {
        let stack =
            sample_asg_alb_stack(config, &StaticKeyProvider("ssh-rsa AAAA user@host".into()))
                .unwrap();
        synthesize(&stack).unwrap()
    }

    #[test]
    fn test_compute_key_pair_verbatim() {
        let t = template_with(&StackConfig::default());
        let kp = &t.resources["KeyPair"];
        assert_eq!(kp.properties["KeyName"], "instanceKey");
        assert_eq!(kp.properties["PublicKeyMaterial"], "ssh-rsa AAAA user@host");
    }

    #[test]
    fn test_compute_launch_template_refs_key() {
        let t = template_with(&StackConfig::default());
        let lt = &t.resources
            [&construct_logical_id("LaunchTemplate", ConstructKind::LaunchTemplate)];
        let data = &lt.properties["LaunchTemplateData"];
        assert_eq!(data["KeyName"], reference("KeyPair"));
        assert_eq!(data["InstanceType"], "t2.micro");
        assert!(data["ImageId"]["Ref"].as_str().unwrap().starts_with("SsmParameterValue"));
    }

    #[test]
    fn test_compute_desired_capacity_optional() {
        let config = StackConfig {
            capacity: Capacity {
                min: 2,
                desired: None,
                max: 5,
            },
            ..StackConfig::default()
        };
        let t = template_with(&config);
        let asg = &t.resources
            [&construct_logical_id("AutoscalingGroup", ConstructKind::AutoScalingGroup)];
        assert_eq!(asg.properties["MinSize"], "2");
        assert_eq!(asg.properties["MaxSize"], "5");
        assert!(asg.properties.get("DesiredCapacity").is_none());
    }

    #[test]
    fn test_compute_asg_registers_with_target_group() {
        let t = template_with(&StackConfig::default());
        let asg = &t.resources
            [&construct_logical_id("AutoscalingGroup", ConstructKind::AutoScalingGroup)];
        assert_eq!(
            asg.properties["TargetGroupARNs"],
            json!([reference(&construct_logical_id(
                "TargetGroup",
                ConstructKind::TargetGroup
            ))])
        );
    }

    #[test]
    fn test_compute_lb_to_instance_connection() {
        let t = template_with(&StackConfig::default());
        let rules: Vec<_> = t
            .resources
            .values()
            .filter(|r| r.resource_type == "AWS::EC2::SecurityGroupIngress")
            .collect();
        assert_eq!(rules.len(), 1);
        let p = &rules[0].properties;
        assert_eq!(p["FromPort"], 80);
        assert_eq!(
            p["GroupId"]["Fn::GetAtt"][0],
            construct_logical_id("InstanceSecurityGroup", ConstructKind::SecurityGroup)
        );
        assert_eq!(
            p["SourceSecurityGroupId"]["Fn::GetAtt"][0],
            construct_logical_id("ElbSecurityGroup", ConstructKind::SecurityGroup)
        );
    }

    #[test]
    fn test_compute_fixed_ami_has_no_parameter() {
        let stack = sample_asg_alb_stack(&StackConfig::default(), &StaticKeyProvider("k".into()))
            .unwrap();
        let mut stack = stack;
        if let Some(Construct::LaunchTemplate(lt)) = stack.constructs.get_mut("LaunchTemplate") {
            lt.machine_image = MachineImage::Ami("ami-0123456789abcdef0".into());
        }
        let t = synthesize(&stack).unwrap();
        assert!(t.parameters.is_empty());
        let lt = &t.resources
            [&construct_logical_id("LaunchTemplate", ConstructKind::LaunchTemplate)];
        assert_eq!(lt.properties["LaunchTemplateData"]["ImageId"], "ami-0123456789abcdef0");
    }
}
