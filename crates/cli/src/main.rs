use anyhow::Context;
use campus_api_client::HttpPlatformApi;
use campus_core::threads::load_thread;
use campus_core::{
    ChildOrder, ClientConfig, ConversationResolver, Identity, LinkParser, NavigationResolver,
    NonEmptyText, Resolution, UserKey,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "campus")]
#[command(about = "Campus activity links, forum threads and chats")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a link into a navigation intent (offline)
    Parse {
        /// Absolute URL, custom-scheme URL or relative path
        link: String,
    },
    /// Resolve a link to a destination screen
    Resolve {
        link: String,
        /// Key of the signed-in user
        #[arg(long)]
        viewer: String,
    },
    /// Print a forum post with its nested replies
    Thread {
        post_id: String,
        /// Order sibling replies by creation time instead of server order
        #[arg(long)]
        chronological: bool,
    },
    /// Open a chat with a counterpart, reusing an existing conversation
    Chat {
        counterpart: String,
        /// Key of the signed-in user
        #[arg(long)]
        viewer: String,
        /// Message to send once the chat is open
        #[arg(long)]
        message: Option<String>,
    },
}

/// Entry point for the campus CLI.
///
/// # Environment Variables
/// - `CAMPUS_API_URL`: platform API base URL (required by every command except `parse`)
/// - `CAMPUS_LINK_SCHEMES`: comma-separated custom link schemes (default: "campus")
/// - `CAMPUS_TIMEOUT_SECS`: request timeout in seconds (default: 30)
/// - `CAMPUS_API_TOKEN`: bearer token sent with every request
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("campus=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Parse { link } => {
            let parser = LinkParser::new(
                env_value("CAMPUS_LINK_SCHEMES")
                    .unwrap_or_default()
                    .split(','),
            );
            let path = parser.normalize(&link);
            println!("normalised path: {path}");
            let intent = campus_core::links::parse(&path);
            println!("{}", serde_json::to_string_pretty(&intent)?);
            if let Some(path) = intent.to_path() {
                println!("canonical path: {path}");
            }
        }
        Commands::Resolve { link, viewer } => {
            let config = load_config()?;
            let viewer = UserKey::new(viewer).context("invalid viewer key")?;
            let resolver =
                NavigationResolver::new(HttpPlatformApi::new(&config)?, config.link_parser());

            match resolver.resolve_link(&link, &viewer).await? {
                Resolution::Navigate(destination) => {
                    println!("route: {}", destination.route());
                    for (name, value) in destination.params() {
                        println!("  {name} = {value}");
                    }
                }
                Resolution::Unrecognized => println!("unrecognized link, staying put"),
            }
        }
        Commands::Thread {
            post_id,
            chronological,
        } => {
            let config = load_config()?;
            let api = HttpPlatformApi::new(&config)?;
            let order = if chronological {
                ChildOrder::Chronological
            } else {
                ChildOrder::AsReceived
            };

            let thread = load_thread(&api, &post_id, order).await?;
            for (depth, record) in thread.root.walk() {
                println!(
                    "{}{}: {}",
                    "  ".repeat(depth),
                    record.author_name(),
                    record.message()
                );
            }
            if thread.orphans > 0 {
                println!("({} replies had no reachable parent)", thread.orphans);
            }
        }
        Commands::Chat {
            counterpart,
            viewer,
            message,
        } => {
            let config = load_config()?;
            let viewer = UserKey::new(viewer).context("invalid viewer key")?;
            let counterpart = UserKey::new(counterpart).context("invalid counterpart key")?;
            let message = message
                .map(NonEmptyText::new)
                .transpose()
                .context("message is empty")?;

            let resolver = ConversationResolver::new(HttpPlatformApi::new(&config)?);
            let mut session = resolver
                .open_chat(&viewer, Identity::new(counterpart))
                .await;
            match session.state().conversation_id() {
                Some(id) => println!("existing conversation {id}"),
                None => println!("no conversation yet, the first message will start one"),
            }

            if let Some(message) = message {
                let sent = session.send(&message).await?;
                println!("sent to conversation {}", sent.conversation_id);
            }
        }
    }

    Ok(())
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn load_config() -> anyhow::Result<ClientConfig> {
    let config = ClientConfig::from_env_values(
        env_value("CAMPUS_API_URL"),
        env_value("CAMPUS_LINK_SCHEMES"),
        env_value("CAMPUS_TIMEOUT_SECS"),
        env_value("CAMPUS_API_TOKEN"),
    )?;
    tracing::debug!(?config, "configuration resolved");
    Ok(config)
}
