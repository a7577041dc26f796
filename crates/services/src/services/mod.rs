pub mod agent;
pub mod broadcast;
pub mod config;
pub mod task_executor;
pub mod task_store;
