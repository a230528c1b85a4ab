//! Core logic: descriptor model, synthesis, validation, resolution, snapshots, planning.

pub mod cidr;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod hasher;
pub mod intrinsics;
pub mod keys;
pub mod planner;
pub mod resolver;
pub mod state;
pub mod synth;
pub mod types;
pub mod validate;
