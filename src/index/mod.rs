pub mod posting;
pub mod segment;
pub mod snapshot;
pub mod writer;
