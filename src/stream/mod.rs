pub mod generator;
pub mod mapping;
pub mod profile;
pub mod worker;
