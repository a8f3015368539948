pub mod canonical;
pub mod config;
pub mod errors;
pub mod graph;
pub mod mcp;
pub mod scanner;
pub mod smoke;
pub mod ssot;
