// API surface: serde DTOs plus the line-delimited JSON TCP server.

pub mod dto;
pub mod server;
