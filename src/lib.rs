pub mod api;
pub mod compare;
pub mod sitemap;
