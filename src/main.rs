use clap::{Parser, Subcommand};
use libris_client::gateway::{auth, Gateway, ReqwestTransport};
use libris_client::{ClientConfig, Notification, NotificationFilter, NotificationId, Session};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "libris")]
#[command(about = "Libris notifications from the command line", long_about = None)]
struct Args {
    /// API base URL (overrides LIBRIS_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Bearer token (defaults to LIBRIS_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Refresh token used when the access token expires (defaults to LIBRIS_REFRESH_TOKEN)
    #[arg(long)]
    refresh_token: Option<String>,

    /// Sign in with a username instead of a token
    #[arg(long, requires = "password")]
    username: Option<String>,

    #[arg(long)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List notifications
    List {
        /// Only show this category
        #[arg(long)]
        category: Option<String>,
        /// Only show unread notifications
        #[arg(long)]
        unread: bool,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Mark one notification as read
    Read { id: String },
    /// Mark every notification as read
    ReadAll,
    /// Show the unread counter
    Count,
    /// Delete one notification
    Delete { id: String },
    /// Delete every notification
    Clear,
    /// Keep syncing in the background and print changes
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "libris_client=info,libris=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = ClientConfig::from_env()?;
    if let Some(url) = args.api_url {
        config.base_url = url;
        config.validate()?;
    }

    let refresh_token = args
        .refresh_token
        .or_else(|| std::env::var("LIBRIS_REFRESH_TOKEN").ok());
    let refresh = match refresh_token {
        Some(rt) => {
            let auth_gateway = Gateway::new(ReqwestTransport::new(&config)?);
            Some(auth::refresh_with_token(auth_gateway, rt))
        }
        None => None,
    };

    let session = Session::new(config, refresh)?;

    if let (Some(username), Some(password)) = (&args.username, &args.password) {
        session.login(username, password).await?;
    } else if let Some(token) = args.token.or_else(|| std::env::var("LIBRIS_TOKEN").ok()) {
        session.sign_in(&token);
    } else {
        anyhow::bail!("No credentials: pass --token, set LIBRIS_TOKEN, or use --username/--password");
    }

    let notifications = session.notifications();
    let page_size = session.config().page_size;

    match args.command {
        Command::List {
            category,
            unread,
            page,
        } => {
            let mut filter = NotificationFilter::new().page(page, page_size);
            filter.category = category;
            filter.unread_only = unread;
            let list = notifications.fetch(filter).await?;
            notifications.refresh_unread_count().await?;
            for n in &list {
                print_notification(n);
            }
            println!("{} unread", notifications.unread_count());
        }
        Command::Read { id } => {
            notifications.mark_as_read(&NotificationId::from(id.clone())).await?;
            println!("Marked {} as read", id);
        }
        Command::ReadAll => {
            notifications.mark_all_as_read().await?;
            println!("All notifications marked as read");
        }
        Command::Count => {
            let count = notifications.refresh_unread_count().await?;
            println!("{}", count);
        }
        Command::Delete { id } => {
            notifications.delete(&NotificationId::from(id.clone())).await?;
            println!("Deleted {}", id);
        }
        Command::Clear => {
            notifications.delete_all().await?;
            println!("All notifications deleted");
        }
        Command::Watch => {
            let mut updates = notifications.subscribe();
            let poller = session.start_polling();
            poller.sync_now().await;

            loop {
                tokio::select! {
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let snapshot = updates.borrow_and_update().clone();
                        if snapshot.is_loading {
                            continue;
                        }
                        if let Some(err) = &snapshot.last_error {
                            tracing::warn!("{}", err);
                        }
                        println!("{} notifications, {} unread", snapshot.entities.len(), snapshot.unread_count);
                    }
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Shutdown signal received");
                        break;
                    }
                }
            }

            poller.stop().await;
        }
    }

    Ok(())
}

fn print_notification(n: &Notification) {
    let marker = if n.read { " " } else { "*" };
    println!(
        "{} [{}] {} {} - {}",
        marker,
        n.id,
        n.created_at.format("%Y-%m-%d %H:%M"),
        n.title,
        n.message
    );
}
