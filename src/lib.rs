//! Stackform: a desired-state descriptor for an application load balancer in
//! front of an auto-scaling group, synthesized to a CloudFormation template.
//!
//! The descriptor only declares. Provisioning, rollback and reconciliation
//! belong to the engine that consumes the template.

pub mod cli;
pub mod core;
pub mod resources;
