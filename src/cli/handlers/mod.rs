//! Command handlers, one per subcommand.

pub mod serve;

pub use serve::ServeCommandHandler;
