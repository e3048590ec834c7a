use panoq_core::logging;

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    if let Err(err) = logging::init_logging() {
        eprintln!("panoq: logging disabled: {err}");
    }

    if let Err(err) = Cli::run_from_args().await {
        eprintln!("panoq error: {err:#}");
        std::process::exit(1);
    }
}
