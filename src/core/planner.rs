//! Plan generation: diff a synthesized template against its snapshot.
//!
//! Changes to certain properties cannot be applied in place; the provider
//! replaces the resource instead. Those are planned as `Replace`.

use super::error::StackResult;
use super::hasher::hash_json;
use super::resolver::resource_order;
use super::state::resource_hash;
use super::types::*;
use tracing::debug;

/// Properties whose change forces replacement, per resource type.
fn replacement_properties(resource_type: &str) -> &'static [&'static str] {
    match resource_type {
        "AWS::EC2::VPC" => &["CidrBlock"],
        "AWS::EC2::Subnet" => &["AvailabilityZone", "CidrBlock", "VpcId"],
        "AWS::EC2::SecurityGroup" => &["GroupDescription", "VpcId"],
        "AWS::EC2::KeyPair" => &["KeyName", "PublicKeyMaterial"],
        "AWS::EC2::LaunchTemplate" => &["LaunchTemplateData", "LaunchTemplateName"],
        "AWS::ElasticLoadBalancingV2::LoadBalancer" => &["Scheme"],
        "AWS::ElasticLoadBalancingV2::TargetGroup" => &["Port", "Protocol", "TargetType", "VpcId"],
        _ => &[],
    }
}

/// Generate an execution plan for `template` against an optional snapshot.
///
/// Creates, updates and replacements follow the desired dependency order.
/// Destroys come last, in reverse snapshot order.
pub fn plan(template: &Template, lock: Option<&StackLock>, name: &str) -> StackResult<ExecutionPlan> {
    let execution_order = resource_order(template)?;
    let mut changes = Vec::new();
    let mut to_create = 0u32;
    let mut to_update = 0u32;
    let mut to_replace = 0u32;
    let mut to_destroy = 0u32;
    let mut unchanged = 0u32;

    for id in &execution_order {
        let Some(resource) = template.resources.get(id) else {
            continue;
        };
        let previous = lock.and_then(|l| l.resources.get(id));
        let (action, description) = determine_action(id, resource, previous)?;
        match action {
            PlanAction::Create => to_create += 1,
            PlanAction::Update => to_update += 1,
            PlanAction::Replace => to_replace += 1,
            PlanAction::Destroy => to_destroy += 1,
            PlanAction::NoOp => unchanged += 1,
        }
        changes.push(PlannedChange {
            logical_id: id.clone(),
            resource_type: resource.resource_type.clone(),
            action,
            description,
        });
    }

    if let Some(lock) = lock {
        for (id, previous) in lock.resources.iter().rev() {
            if template.resources.contains_key(id) {
                continue;
            }
            to_destroy += 1;
            changes.push(PlannedChange {
                logical_id: id.clone(),
                resource_type: previous.resource_type.clone(),
                action: PlanAction::Destroy,
                description: format!("{}: destroy {}", id, previous.resource_type),
            });
        }
    }

    debug!(
        stack = name,
        create = to_create,
        update = to_update,
        replace = to_replace,
        destroy = to_destroy,
        "plan computed"
    );

    Ok(ExecutionPlan {
        name: name.to_string(),
        changes,
        execution_order,
        to_create,
        to_update,
        to_replace,
        to_destroy,
        unchanged,
    })
}

/// Action and description for one desired resource.
fn determine_action(
    id: &str,
    resource: &TemplateResource,
    previous: Option<&ResourceLock>,
) -> StackResult<(PlanAction, String)> {
    let Some(previous) = previous else {
        return Ok((
            PlanAction::Create,
            format!("{}: create {}", id, resource.resource_type),
        ));
    };

    if previous.resource_type != resource.resource_type {
        return Ok((
            PlanAction::Replace,
            format!(
                "{}: replace (type {} -> {})",
                id, previous.resource_type, resource.resource_type
            ),
        ));
    }

    let changed = changed_properties(resource, previous);
    if changed.is_empty() {
        // Properties match; DependsOn is the only other part of the body
        if resource_hash(resource)? != previous.hash {
            return Ok((PlanAction::Update, format!("{}: update DependsOn", id)));
        }
        return Ok((PlanAction::NoOp, format!("{}: no changes", id)));
    }

    let forcing: Vec<&str> = replacement_properties(&resource.resource_type)
        .iter()
        .copied()
        .filter(|p| changed.contains(p))
        .collect();
    if forcing.is_empty() {
        Ok((
            PlanAction::Update,
            format!("{}: update {}", id, changed.join(", ")),
        ))
    } else {
        Ok((
            PlanAction::Replace,
            format!("{}: replace ({} requires replacement)", id, forcing.join(", ")),
        ))
    }
}

/// Properties added, removed or changed since the snapshot, sorted.
fn changed_properties<'a>(resource: &'a TemplateResource, previous: &'a ResourceLock) -> Vec<&'a str> {
    let mut changed: Vec<&str> = resource
        .properties
        .iter()
        .filter(|(k, v)| previous.properties.get(*k) != Some(&hash_json(v)))
        .map(|(k, _)| k.as_str())
        .collect();
    changed.extend(
        previous
            .properties
            .keys()
            .filter(|k| !resource.properties.contains_key(*k))
            .map(String::as_str),
    );
    changed.sort_unstable();
    changed.dedup();
    changed
}
