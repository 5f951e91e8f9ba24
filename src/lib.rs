//! Quillblog - a small blog engine
//!
//! Posts with tags, reader comments, sharing by e-mail, a sidebar of
//! latest and most commented posts, a sitemap and an Atom feed, plus a
//! JSON admin API for staff.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod theme;
