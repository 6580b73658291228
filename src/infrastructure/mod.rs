// Infrastructure: thread-pool setup, project locks, config, report loading.

pub mod concurrency;
pub mod config;
pub mod report_loader;
