pub mod entry;
pub mod scope;
pub mod service;
pub mod trigger;
