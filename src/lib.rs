pub mod client;
pub mod core;
pub mod dto;
pub mod model;
pub mod service;
pub mod subscription;
