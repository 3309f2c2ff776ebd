mod manager;

pub use manager::JobManager;
