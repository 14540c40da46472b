pub mod health;
pub mod rankings;
pub mod ratings;
