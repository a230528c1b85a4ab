//! Synthesis: render a [`Stack`] into a provider template.
//!
//! Each construct kind is rendered by its handler under
//! [`crate::resources`]. Handlers share a [`SynthContext`] that owns the
//! template under construction and resolves cross-construct references to
//! logical ids.

use super::error::{StackError, StackResult};
use super::intrinsics::{self, get_att, reference};
use super::types::*;
use crate::resources;
use indexmap::IndexMap;
use tracing::{debug, info};

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Shared state while rendering one stack.
#[derive(Debug)]
pub struct SynthContext<'a> {
    pub stack: &'a Stack,
    pub parameters: IndexMap<String, TemplateParameter>,
    pub resources: IndexMap<String, TemplateResource>,
}

impl<'a> SynthContext<'a> {
    pub fn new(stack: &'a Stack) -> Self {
        Self {
            stack,
            parameters: IndexMap::new(),
            resources: IndexMap::new(),
        }
    }

    /// Add a rendered resource.
    ///
    /// Re-inserting an identical resource is a no-op. A different resource
    /// under an existing logical id means two constructs collapsed onto the
    /// same id, which is an error.
    pub fn insert(&mut self, logical_id: String, resource: TemplateResource) -> StackResult<()> {
        match self.resources.get(&logical_id) {
            Some(existing) if *existing == resource => {
                debug!(logical_id = %logical_id, "resource already rendered");
                Ok(())
            }
            Some(existing) => Err(StackError::Config(format!(
                "logical id '{}' is produced by both a {} and a {}; rename one of the constructs",
                logical_id, existing.resource_type, resource.resource_type
            ))),
            None => {
                self.resources.insert(logical_id, resource);
                Ok(())
            }
        }
    }

    /// Logical id of a construct, checking that it exists with the given kind.
    pub fn construct_id(&self, id: &str, kind: ConstructKind) -> StackResult<String> {
        match self.stack.get(id) {
            Some(c) if c.kind() == kind => Ok(construct_logical_id(id, kind)),
            Some(c) => Err(StackError::Reference(format!(
                "'{}' is a {}, expected {}",
                id,
                c.kind(),
                kind
            ))),
            None => Err(StackError::Reference(format!("{} '{}' is not declared", kind, id))),
        }
    }

    /// Logical id of a subnet, checking that the network declares it.
    pub fn subnet_id(&self, subnet: &SubnetRef) -> StackResult<String> {
        let network = self.stack.network(&subnet.network).ok_or_else(|| {
            StackError::Reference(format!("network '{}' is not declared", subnet.network))
        })?;
        if network.subnet(&subnet.subnet).is_none() {
            return Err(StackError::Reference(format!(
                "network '{}' has no subnet '{}'",
                subnet.network, subnet.subnet
            )));
        }
        Ok(subnet_logical_id(&subnet.network, &subnet.subnet, "Subnet"))
    }

    /// `Fn::GetAtt GroupId` of a security group construct.
    pub fn security_group_id(&self, id: &str) -> StackResult<serde_json::Value> {
        let logical = self.construct_id(id, ConstructKind::SecurityGroup)?;
        Ok(get_att(&logical, "GroupId"))
    }

    /// `Name` tag value for a construct path.
    pub fn name_tag(&self, path: &[&str]) -> serde_json::Value {
        let mut full = vec![self.stack.id.as_str()];
        full.extend_from_slice(path);
        serde_json::json!([{ "Key": "Name", "Value": full.join("/") }])
    }
}

/// Logical id of a construct's primary resource.
pub fn construct_logical_id(id: &str, kind: ConstructKind) -> String {
    match kind {
        // Declared as a raw resource, so it keeps its id verbatim.
        ConstructKind::KeyPair => intrinsics::logical_id(&[id]),
        _ => intrinsics::logical_id(&[id, "Resource"]),
    }
}

/// Logical id of one of the resources that make up a subnet.
pub fn subnet_logical_id(network: &str, subnet: &str, part: &str) -> String {
    let scope = format!("{}Subnet", subnet);
    intrinsics::logical_id(&[network, &scope, part])
}

/// Render a stack into a template.
pub fn synthesize(stack: &Stack) -> StackResult<Template> {
    let mut ctx = SynthContext::new(stack);

    for (id, construct) in &stack.constructs {
        debug!(construct = %id, kind = %construct.kind(), "rendering construct");
        render_construct(&mut ctx, id, construct)?;
    }

    let outputs = render_outputs(&ctx)?;

    info!(
        stack = %stack.id,
        resources = ctx.resources.len(),
        parameters = ctx.parameters.len(),
        "synthesized template"
    );

    Ok(Template {
        format_version: TEMPLATE_FORMAT_VERSION.to_string(),
        description: stack.description.clone(),
        parameters: ctx.parameters,
        resources: ctx.resources,
        outputs,
    })
}

/// Dispatch a construct to its resource handler.
fn render_construct(ctx: &mut SynthContext<'_>, id: &str, construct: &Construct) -> StackResult<()> {
    match construct {
        Construct::Network(n) => resources::network::render(ctx, id, n),
        Construct::SecurityGroup(sg) => resources::security_group::render(ctx, id, sg),
        Construct::LoadBalancer(lb) => resources::load_balancing::render_load_balancer(ctx, id, lb),
        Construct::TargetGroup(tg) => resources::load_balancing::render_target_group(ctx, id, tg),
        Construct::Listener(l) => resources::load_balancing::render_listener(ctx, id, l),
        Construct::KeyPair(k) => resources::compute::render_key_pair(ctx, id, k),
        Construct::LaunchTemplate(lt) => resources::compute::render_launch_template(ctx, id, lt),
        Construct::AutoScalingGroup(asg) => resources::compute::render_auto_scaling_group(ctx, id, asg),
    }
}

fn render_outputs(ctx: &SynthContext<'_>) -> StackResult<IndexMap<String, TemplateOutput>> {
    let mut outputs = IndexMap::new();
    for (name, output) in &ctx.stack.outputs {
        let value = match output.attribute {
            OutputAttribute::NetworkId => {
                reference(&ctx.construct_id(&output.construct, ConstructKind::Network)?)
            }
            OutputAttribute::GroupName => reference(
                &ctx.construct_id(&output.construct, ConstructKind::AutoScalingGroup)?,
            ),
            OutputAttribute::DnsName => get_att(
                &ctx.construct_id(&output.construct, ConstructKind::LoadBalancer)?,
                "DNSName",
            ),
        };
        outputs.insert(
            name.clone(),
            TemplateOutput {
                value,
                description: output.description.clone(),
            },
        );
    }
    Ok(outputs)
}

/// Serialize a template as pretty JSON.
pub fn to_json(template: &Template) -> StackResult<String> {
    serde_json::to_string_pretty(template).map_err(|e| StackError::Serialize(e.to_string()))
}

/// Parse a template from JSON.
pub fn from_json(json: &str) -> StackResult<Template> {
    serde_json::from_str(json).map_err(|e| StackError::Serialize(e.to_string()))
}
