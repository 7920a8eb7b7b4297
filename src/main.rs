//! athq - run named SQL templates against Athena.

use athq::cli::Cli;
use athq::{app, logging};
use tracing::error;

#[tokio::main]
async fn main() {
    // A missing .env is fine; AWS_* may come from the shell.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    logging::init_stderr_logging(cli.verbose);

    if let Err(e) = app::run(cli).await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}
