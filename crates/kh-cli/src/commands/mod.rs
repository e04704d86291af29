//! Subcommand implementations.

mod admin;
mod serve;

pub use admin::{create_superuser, migrate, print_stats, SuperuserArgs};
pub use serve::{run_server, ServeOverrides};
