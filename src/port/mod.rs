pub mod provider;

pub use provider::{DataArchive, DataProvider};
