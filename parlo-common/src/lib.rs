#![cfg(not(doctest))]

#[macro_use]
extern crate diesel;

pub mod cache;
pub mod db;
pub mod email;
pub mod events;
pub mod models;
pub mod schema;
