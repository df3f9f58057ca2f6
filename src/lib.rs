//! devstack: a single-instance AWS development environment as typed declarations.
//!
//! A stack file becomes a declaration graph (VPC, subnets, routing, security
//! group, IAM, EC2 instance, SSM rendezvous parameter), which is ordered and
//! rendered to a Pulumi YAML program plus the instance bootstrap script.
//! Every render is recorded in a BLAKE3 lock and a JSONL event log.

pub mod cli;
pub mod core;
pub mod resources;
pub mod telemetry;
pub mod tripwire;
