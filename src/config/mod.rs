pub mod loader;
pub mod scan;
pub mod types;
pub mod wordlist;

pub use loader::ConfigLoader;
pub use scan::ScanConfig;
pub use types::GlobalConfig;
pub use wordlist::Wordlist;
