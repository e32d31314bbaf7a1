pub mod aggregate;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod convert;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod fs_util;
pub mod grid;
pub mod layout;
pub mod pipeline;
pub mod polygonize;
pub mod pool;
pub mod raster;
pub mod report;
pub mod site;
pub mod store;
