use clap::Parser;
use gosp_runtime::cli::{run_cli, Cli};
use gosp_runtime::logging::{init_logging, LogConfig};
use gosp_runtime::EchoPage;

fn main() -> anyhow::Result<()> {
    let _log_guard = init_logging(&LogConfig::from_env())?;
    run_cli(Cli::parse(), EchoPage)
}
