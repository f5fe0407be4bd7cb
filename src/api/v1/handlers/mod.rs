pub mod fallback;
pub mod gateway;
pub mod health;
