pub mod descriptor;
pub mod sqlite;
pub mod store;
