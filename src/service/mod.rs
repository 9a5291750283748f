pub mod catalog_service;
pub mod event_filter;
pub mod gateway_service;
pub mod metadata_service;
pub mod queue_service;
pub mod reconciler_service;
pub mod webhook_service;
pub mod worker_service;
