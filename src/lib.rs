// Library for the binary and tests to access modules

pub mod config;
pub mod error;
pub mod format;
pub mod models;
pub mod prefs;
pub mod protocol;
pub mod reconciler;
pub mod render;
pub mod status;
pub mod store;
pub mod transport;
pub mod version;
