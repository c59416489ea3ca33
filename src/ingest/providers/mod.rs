// src/ingest/providers/mod.rs
pub mod highlights;
pub mod manual;
pub mod rss;
