//! Resource handlers: render each construct kind into template resources.
//!
//! Each handler:
//! 1. Resolves the construct's references through the shared `SynthContext`
//! 2. Inserts the construct's primary resource under its logical id
//! 3. Inserts any supporting resources (routes, ingress rules, parameters)

pub mod compute;
pub mod load_balancing;
pub mod network;
pub mod security_group;
