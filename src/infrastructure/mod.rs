pub mod config;
pub mod config_source;
pub mod db;
pub mod llm_clients;
pub mod logging;
pub mod response;
pub mod security;
