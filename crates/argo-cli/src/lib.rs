//! Terminal interface helpers for Argo RAG

mod progress;
mod ui;


pub use progress::{format_batch, format_table_report, print_table_reports, ConsoleObserver};
pub use ui::{display_banner, parse_input, print_answer, print_help, read_question, ReplCommand};

// Re-export core types
pub use argo_core::{Error, Result};
