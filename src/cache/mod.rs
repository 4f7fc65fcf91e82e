pub mod controller;
pub mod fetcher;
pub mod partition;
pub mod report;
pub mod selector;
