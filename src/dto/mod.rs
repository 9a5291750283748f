pub mod event;
pub mod rancher;
pub mod status;
