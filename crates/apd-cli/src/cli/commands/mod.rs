//! Command implementations, one file per subcommand.

mod checksum;
mod fetch;
mod list;

pub use checksum::run_checksum;
pub use fetch::run_fetch;
pub use list::run_list;
