//! Makerspace printer status service
//!
//! Keeps a registry of shared 3D printers and answers "what is this printer
//! doing right now" by polling either the vendor cloud or the printers on the
//! local network, reconciling the answer back into the registry.

pub mod app_state;
pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;
