use assistant_relay_server::config::{self, Cli, Command};
use assistant_relay_server::observability::init_observability;
use assistant_relay_server::{chat, server};
use clap::Parser as _;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::load_dotenv();
    init_observability();

    match Cli::parse().command {
        Command::Serve(args) => server::serve(args).await,
        Command::Chat(args) => chat::run_chat(args).await,
    }
}
