//! Engine module: CLI, conversion service client, scanner and path helpers

pub mod arg_parser;
pub mod convertapi;
pub mod handlers;
pub mod invoker;
pub mod scanner;
pub mod tools;

// Re-export commonly used items
pub use arg_parser::Cli;
pub use convertapi::ConvertApiClient;
pub use handlers::handle_run;
pub use invoker::{ConversionInvoker, ConversionRequest};
pub use scanner::{MoveRetry, ScanResult, Scanner};
pub use tools::{glob_match, is_os_hidden_file, path_relative_to, should_scan};
