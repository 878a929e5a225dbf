pub mod connection;
pub mod migrations;
pub mod source;
pub mod status;
pub mod version;

pub use connection::{DatabaseOptions, open_database, open_in_memory};
pub use migrations::{BoxError, Migration, MigrationError, MigrationReceipt, migrate};
pub use source::load_dir;
pub use status::{MigrationStatus, status};
pub use version::{get_version, set_version};
