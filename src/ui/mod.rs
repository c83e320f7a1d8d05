// src/ui/mod.rs
pub mod render;
