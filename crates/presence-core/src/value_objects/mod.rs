//! Value objects - immutable domain primitives

mod identity;
mod route;

pub use identity::{Identity, IdentityParseError};
pub use route::{Route, RouteList, Transport};
