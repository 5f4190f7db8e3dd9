pub mod extract;
pub mod web;

pub use web::crawl;
