//! Surface exposed to the controlling host application: module status, action,
//! feedback and variable registries, and the HTTP API serving them.

mod actions;
mod api;
mod feedbacks;
mod registry;
mod status;
mod variables;

pub use api::new_routes;
pub use registry::HostRegistry;
pub use status::{InstanceState, ModuleStatusReporter};
