//! Domain layer: violation rules, review routing, repository traits

pub mod model;
pub mod repository;
pub mod service;
