pub mod checkpoint;
pub mod layout;
pub mod segment_file;
