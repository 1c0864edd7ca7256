use clap::{Parser, Subcommand};

mod commands;
mod util;

#[derive(Parser)]
#[command(name = "deskbridge", version, about = "DeskBridge CLI: probe the bridge and replay inbox events")]
struct Cli {
    /// Bridge base URL
    #[arg(long, env = "DESKBRIDGE_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check bridge health and the number of running background tasks
    Health,
    /// Send one inbound event and print the returned panel
    Event(commands::event::EventArgs),
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Health => commands::health::run(&cli.api_url).await,
        Commands::Event(args) => commands::event::run(&cli.api_url, args).await,
    };
    std::process::exit(code);
}
