//! Command handlers, one module per subcommand.
//!
//! Each handler receives the resolved [`CliConfig`](crate::bootstrap::CliConfig)
//! and an [`EventPrinter`](crate::presentation::EventPrinter), composes the
//! engines it needs, and tears them down before returning.

pub mod chat;
pub mod input;
pub mod listen;
pub mod speak;
