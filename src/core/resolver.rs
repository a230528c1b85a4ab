//! Dependency DAG construction and topological ordering.
//!
//! Edges come from construct references (descriptor level) or from
//! `Ref`/`Fn::GetAtt` intrinsics plus explicit `DependsOn` (template level).
//! Order is computed with Kahn's algorithm and alphabetical tie-breaking so
//! the same graph always yields the same order.

use super::error::{StackError, StackResult};
use super::intrinsics::referenced_ids;
use super::types::{Stack, Template};
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap, VecDeque};

/// Topologically sort `nodes`, where `deps[n]` lists the nodes `n` depends on.
pub fn topo_sort(deps: &IndexMap<String, Vec<String>>) -> StackResult<Vec<String>> {
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();

    for id in deps.keys() {
        in_degree.insert(id, 0);
        adjacency.insert(id, Vec::new());
    }

    for (id, targets) in deps {
        let unique: BTreeSet<&str> = targets.iter().map(String::as_str).collect();
        for dep in unique {
            let Some(edges) = adjacency.get_mut(dep) else {
                return Err(StackError::Reference(format!(
                    "'{}' depends on unknown '{}'",
                    id, dep
                )));
            };
            edges.push(id);
            *in_degree.entry(id).or_default() += 1;
        }
    }

    let mut zero_degree: Vec<&str> = in_degree
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(id, _)| *id)
        .collect();
    zero_degree.sort_unstable();
    let mut queue: VecDeque<&str> = zero_degree.into_iter().collect();

    let mut order = Vec::with_capacity(deps.len());
    while let Some(current) = queue.pop_front() {
        order.push(current.to_string());

        let mut next_ready = Vec::new();
        for neighbor in adjacency.get(current).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(neighbor) {
                *degree -= 1;
                if *degree == 0 {
                    next_ready.push(*neighbor);
                }
            }
        }
        next_ready.sort_unstable();
        queue.extend(next_ready);
    }

    if order.len() != deps.len() {
        let ordered: BTreeSet<&str> = order.iter().map(String::as_str).collect();
        let members: Vec<&str> = deps
            .keys()
            .map(String::as_str)
            .filter(|id| !ordered.contains(id))
            .collect();
        return Err(StackError::Cycle(members.join(", ")));
    }

    Ok(order)
}

/// Dependencies of every construct, from its references.
pub fn construct_dependencies(stack: &Stack) -> IndexMap<String, Vec<String>> {
    stack
        .constructs
        .iter()
        .map(|(id, c)| {
            let refs = c
                .references()
                .into_iter()
                .map(|(r, _)| r.to_string())
                .filter(|r| r != id)
                .collect();
            (id.clone(), refs)
        })
        .collect()
}

/// Dependencies of every template resource. References to parameters are
/// not resource dependencies and are dropped.
pub fn resource_dependencies(template: &Template) -> IndexMap<String, Vec<String>> {
    template
        .resources
        .iter()
        .map(|(id, r)| {
            let mut refs: Vec<String> = r
                .properties
                .values()
                .flat_map(referenced_ids)
                .filter(|dep| !template.parameters.contains_key(dep))
                .collect();
            refs.extend(r.depends_on.iter().cloned());
            refs.sort();
            refs.dedup();
            (id.clone(), refs)
        })
        .collect()
}

/// Deterministic construct order.
pub fn construct_order(stack: &Stack) -> StackResult<Vec<String>> {
    topo_sort(&construct_dependencies(stack))
}

/// Deterministic resource creation order.
pub fn resource_order(template: &Template) -> StackResult<Vec<String>> {
    topo_sort(&resource_dependencies(template))
}
