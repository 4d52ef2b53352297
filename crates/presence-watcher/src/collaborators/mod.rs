//! Built-in collaborator implementations
//!
//! The watcher is written against the `RouteResolver` and
//! `ProtocolEngine` traits; a deployment binds a real transport stack to
//! them. This module ships the implementations the binary wires up by
//! default: a resolver that derives routes from static proxy
//! configuration, and an in-process loopback engine for local runs.

mod loopback;
mod resolver;

pub use loopback::LoopbackEngine;
pub use resolver::StaticRouteResolver;
