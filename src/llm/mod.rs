//! Language model collaborator

mod client;

pub use client::OpenAiCompatClient;
