pub mod config;
pub mod db;
pub mod error;
pub mod grid;
pub mod model;
pub mod parser;
pub mod reconcile;
