pub mod adapter;
pub mod join;
pub mod query;
pub mod scorer;
