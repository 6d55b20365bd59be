pub mod calendar;
pub mod location;
pub mod product;
pub mod window;
