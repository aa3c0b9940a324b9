pub mod database;
pub mod exec;
pub mod profile;
