// hopz/src/lifecycle/mod.rs
pub mod order;
pub mod returns;
