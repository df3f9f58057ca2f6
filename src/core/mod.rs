//! Core logic: from stack file to rendered program.

pub mod codegen;
pub mod inputs;
pub mod parser;
pub mod planner;
pub mod resolver;
pub mod stack;
pub mod state;
pub mod types;
