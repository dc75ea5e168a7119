pub mod index;
pub mod proximity;
