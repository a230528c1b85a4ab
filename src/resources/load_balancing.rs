//! Load balancer, target group and listener handlers.

use super::network::default_route_id;
use crate::core::error::StackResult;
use crate::core::intrinsics::reference;
use crate::core::synth::{construct_logical_id, SynthContext};
use crate::core::types::{
    ConstructKind, ListenerAction, Listener, LoadBalancer, SubnetKind, TargetGroup,
    TemplateResource,
};
use serde_json::{json, Value};

/// Render an application load balancer.
///
/// An internet-facing balancer depends on the default routes of its public
/// subnets so it is not created before the subnets can reach the internet.
pub fn render_load_balancer(
    ctx: &mut SynthContext<'_>,
    id: &str,
    lb: &LoadBalancer,
) -> StackResult<()> {
    let sg = ctx.security_group_id(&lb.security_group)?;

    let mut subnets = Vec::with_capacity(lb.subnets.len());
    let mut depends_on = Vec::new();
    for subnet in &lb.subnets {
        subnets.push(reference(&ctx.subnet_id(subnet)?));
        let is_public = ctx
            .stack
            .network(&subnet.network)
            .and_then(|n| n.subnet(&subnet.subnet))
            .is_some_and(|s| s.kind == SubnetKind::Public);
        if lb.internet_facing && is_public {
            depends_on.push(default_route_id(&subnet.network, &subnet.subnet));
        }
    }

    let scheme = if lb.internet_facing {
        "internet-facing"
    } else {
        "internal"
    };
    let mut resource = TemplateResource::new("AWS::ElasticLoadBalancingV2::LoadBalancer")
        .prop(
            "LoadBalancerAttributes",
            json!([{ "Key": "deletion_protection.enabled", "Value": "false" }]),
        )
        .prop("Scheme", json!(scheme))
        .prop("SecurityGroups", json!([sg]))
        .prop("Subnets", Value::Array(subnets))
        .prop("Type", json!("application"));
    resource.depends_on = depends_on;

    ctx.insert(construct_logical_id(id, ConstructKind::LoadBalancer), resource)?;
    Ok(())
}

/// Render a target group with its health-check policy, verbatim.
pub fn render_target_group(
    ctx: &mut SynthContext<'_>,
    id: &str,
    tg: &TargetGroup,
) -> StackResult<()> {
    let vpc = ctx.construct_id(&tg.network, ConstructKind::Network)?;
    let hc = &tg.health_check;
    let resource = TemplateResource::new("AWS::ElasticLoadBalancingV2::TargetGroup")
        .prop("HealthCheckIntervalSeconds", json!(hc.interval_secs))
        .prop("HealthCheckPath", json!(hc.path))
        .prop("HealthCheckProtocol", json!(tg.protocol.to_string()))
        .prop("HealthCheckTimeoutSeconds", json!(hc.timeout_secs))
        .prop("HealthyThresholdCount", json!(hc.healthy_threshold))
        .prop("Matcher", json!({ "HttpCode": hc.healthy_http_codes }))
        .prop("Port", json!(tg.port))
        .prop("Protocol", json!(tg.protocol.to_string()))
        .prop("TargetType", json!(tg.target_type.to_string()))
        .prop("UnhealthyThresholdCount", json!(hc.unhealthy_threshold))
        .prop("VpcId", reference(&vpc));

    ctx.insert(construct_logical_id(id, ConstructKind::TargetGroup), resource)?;
    Ok(())
}

/// Render a listener forwarding to its single target group.
pub fn render_listener(ctx: &mut SynthContext<'_>, id: &str, listener: &Listener) -> StackResult<()> {
    let lb = ctx.construct_id(&listener.load_balancer, ConstructKind::LoadBalancer)?;
    let ListenerAction::Forward { target_group } = &listener.default_action;
    let tg = ctx.construct_id(target_group, ConstructKind::TargetGroup)?;

    let resource = TemplateResource::new("AWS::ElasticLoadBalancingV2::Listener")
        .prop(
            "DefaultActions",
            json!([{ "TargetGroupArn": reference(&tg), "Type": "forward" }]),
        )
        .prop("LoadBalancerArn", reference(&lb))
        .prop("Port", json!(listener.port))
        .prop("Protocol", json!(listener.protocol.to_string()));

    ctx.insert(construct_logical_id(id, ConstructKind::Listener), resource)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::StackConfig;
    use crate::core::descriptor::sample_asg_alb_stack;
    use crate::core::keys::StaticKeyProvider;
    use crate::core::synth::synthesize;
    use crate::core::types::Stack;

    fn stack() -> Stack {
        sample_asg_alb_stack(&StackConfig::default(), &StaticKeyProvider("k".into())).unwrap()
    }

    #[test]
    fn test_lb_internet_facing_depends_on_routes() {
        let t = synthesize(&stack()).unwrap();
        let lb = &t.resources[&construct_logical_id("Elb", ConstructKind::LoadBalancer)];
        assert_eq!(lb.properties["Scheme"], "internet-facing");
        assert_eq!(lb.properties["Type"], "application");
        assert_eq!(
            lb.depends_on,
            vec![
                default_route_id("Vpc", "Public1"),
                default_route_id("Vpc", "Public2")
            ]
        );
        assert_eq!(lb.properties["Subnets"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_lb_internal_has_no_route_dependency() {
        let mut s = stack();
        if let Some(crate::core::types::Construct::LoadBalancer(lb)) = s.constructs.get_mut("Elb") {
            lb.internet_facing = false;
        }
        let t = synthesize(&s).unwrap();
        let lb = &t.resources[&construct_logical_id("Elb", ConstructKind::LoadBalancer)];
        assert_eq!(lb.properties["Scheme"], "internal");
        assert!(lb.depends_on.is_empty());
    }

    #[test]
    fn test_listener_forwards_to_single_group() {
        let t = synthesize(&stack()).unwrap();
        let l = &t.resources[&construct_logical_id("Listener", ConstructKind::Listener)];
        let actions = l.properties["DefaultActions"].as_array().unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0]["Type"], "forward");
        assert_eq!(
            actions[0]["TargetGroupArn"],
            reference(&construct_logical_id("TargetGroup", ConstructKind::TargetGroup))
        );
        assert_eq!(l.properties["Port"], 80);
        assert_eq!(l.properties["Protocol"], "HTTP");
    }

    #[test]
    fn test_target_group_passes_values_verbatim() {
        let mut s = stack();
        if let Some(crate::core::types::Construct::TargetGroup(tg)) =
            s.constructs.get_mut("TargetGroup")
        {
            tg.health_check.timeout_secs = 60;
            tg.health_check.interval_secs = 5;
        }
        let t = synthesize(&s).unwrap();
        let tg = &t.resources[&construct_logical_id("TargetGroup", ConstructKind::TargetGroup)];
        assert_eq!(tg.properties["HealthCheckTimeoutSeconds"], 60);
        assert_eq!(tg.properties["HealthCheckIntervalSeconds"], 5);
    }
}
