//! Command implementations for vw-flash

pub mod checksum;
pub mod flash;
pub mod save;

pub use checksum::checksum_report;
pub use flash::flash;
pub use save::save;
