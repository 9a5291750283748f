mod catalog;
mod gateway;
pub mod rest;

pub use rest::RancherClient;
