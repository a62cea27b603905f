mod cli;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let (addr, config) = match cli::run() {
        cli::RunOutcome::Serve(addr, config) => (addr, config),
        cli::RunOutcome::Exit(code) => std::process::exit(code),
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    if let Err(err) = reminderd::serve(addr, config).await {
        tracing::error!(error = %err, "reminderd stopped");
        std::process::exit(1);
    }
}
