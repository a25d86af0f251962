pub mod config_import;
pub mod export_report;
pub mod exporter;
pub mod generate_report;
pub mod generation;
pub mod master_catalog;
pub mod preview_prompt;
pub mod prompt_builder;
pub mod response_parser;
