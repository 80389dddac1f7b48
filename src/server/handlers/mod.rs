pub mod conversations;
pub mod health;
pub mod locations;
pub mod qa;
