pub mod compare;
pub mod handler_utils;
pub mod server;
pub mod sitemap;
