pub mod access;
pub mod roles;
