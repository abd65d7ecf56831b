pub mod config_io;
pub mod recovery;
pub mod vault;

pub use vault::{FsVault, MemoryVault, Vault, VaultError};
