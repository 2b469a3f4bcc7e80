pub mod pages;
pub mod stamp;
