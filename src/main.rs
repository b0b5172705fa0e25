mod cli;

use atnd::error::AtndError;
use clap::Parser;
use cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli::execute(cli).await {
        match e.downcast_ref::<AtndError>() {
            Some(err) => {
                tracing::debug!(error = %err, "command failed");
                eprintln!("Error: {}", err.user_message());
            }
            None => eprintln!("Error: {}", e),
        }
        std::process::exit(1);
    }
}
