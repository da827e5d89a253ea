//! Declarative HTTP tool DSL + runtime.
//!
//! A tool is described once by a [`descriptor::ToolDescriptor`]: its parameters, where each one
//! lands in the outbound request, and how the upstream answer is rendered. This crate validates
//! arguments, builds the request and executes it. It knows nothing about JSON-RPC or transports;
//! that lives in `evolution-mcp-adapter`.

pub mod descriptor;
pub mod reply;
pub mod request;
pub mod runtime;
pub mod semantics;
pub mod template;
pub mod validation;
