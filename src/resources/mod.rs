//! Declaration builders, one module per logical group of the stack.
//!
//! Each builder returns `(logical name, Declaration)` pairs in dependency
//! order. Cross-group wiring happens through typed references to the
//! constants exported here (`network::VPC`, `identity::ROLE`, ...).

pub mod bootstrap;
pub mod compute;
pub mod identity;
pub mod network;
pub mod rendezvous;
pub mod security;
