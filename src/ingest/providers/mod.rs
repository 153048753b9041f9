pub mod html;
pub mod pages;
pub mod sites;
