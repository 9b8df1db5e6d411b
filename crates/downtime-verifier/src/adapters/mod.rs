//! Adapters: concrete implementations of the outbound ports.

pub mod bor_rpc;
pub mod calc_output;
pub mod clock;
pub mod heimdall_cli;
pub mod heimdall_rest;
pub mod http;
pub mod shell;

pub use bor_rpc::BorRpcClient;
pub use calc_output::parse_calc_output;
pub use clock::SystemClock;
pub use heimdall_cli::{parse_key_file, HeimdallCliAdmin};
pub use heimdall_rest::HeimdallRestClient;
pub use http::normalize_base_url;
pub use shell::ShellCommandRunner;
