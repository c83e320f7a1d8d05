// src/core/mod.rs
pub mod form;
pub mod report_ast;
pub mod report_input;
pub mod report_parser;
pub mod report_renderer;
pub mod view_state;
