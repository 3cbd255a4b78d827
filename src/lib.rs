pub mod api;
pub mod auth;
pub mod classifier;
pub mod config;
pub mod db;
pub mod domain;
pub mod game;
pub mod models;
pub mod seed;
