pub mod analysis;
pub mod profile;
