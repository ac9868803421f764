pub mod booking;
pub mod coordinate;
pub mod route;
