pub mod click;
pub mod profile;
