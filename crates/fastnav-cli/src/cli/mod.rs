//! CLI subcommand implementations for the fastnav binary.

pub mod browse_cmd;
pub mod extract_cmd;
pub mod output;
