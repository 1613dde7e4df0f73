use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    load_settings, AccountRepository, AccountStateEvent, AccountViewModel, AuthRepository,
    AuthStateEvent, AuthViewModel, BlogRepository, BlogViewModel, HttpRemoteApi, Message,
    MessageType, RemoteApi, SessionContext, UiComponentType, ViewModel, ViewStateHandler,
};
use shared::domain::BlogOrdering;
use storage::{prepare_database_url, Storage};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chores", about = "Command-line client for the chores blog service")]
struct Cli {
    /// Base url of the remote API, e.g. http://127.0.0.1:8000/api/
    #[arg(long, global = true)]
    server_url: Option<String>,
    /// Location of the local cache database.
    #[arg(long, global = true)]
    database_url: Option<String>,
    /// Settings file. Defaults to ./chores.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
    /// Searches blog posts, loading up to `pages` pages.
    Search {
        #[arg(default_value = "")]
        query: String,
        #[arg(long, value_parser = parse_ordering)]
        ordering: Option<BlogOrdering>,
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Shows the account properties, or updates them when both flags are set.
    Account {
        #[arg(long, requires = "username")]
        email: Option<String>,
        #[arg(long, requires = "email")]
        username: Option<String>,
    },
    Password {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
        #[arg(long)]
        confirm: String,
    },
    Logout,
}

fn parse_ordering(raw: &str) -> Result<BlogOrdering, String> {
    BlogOrdering::from_query_param(raw).ok_or_else(|| {
        format!(
            "unknown ordering '{raw}', expected one of: -date_updated, date_updated, \
             -author__username, author__username"
        )
    })
}

struct App {
    session: SessionContext,
    storage: Storage,
    remote: Arc<dyn RemoteApi>,
    settings: client_core::ClientSettings,
}

impl App {
    fn auth_view_model(&self) -> AuthViewModel {
        AuthViewModel::new(
            AuthRepository::new(
                Arc::clone(&self.remote),
                self.storage.clone(),
                self.settings.timeouts(),
            ),
            self.session.clone(),
        )
    }

    fn blog_view_model(&self) -> BlogViewModel {
        BlogViewModel::new(
            BlogRepository::new(
                Arc::clone(&self.remote),
                self.storage.clone(),
                self.settings.timeouts(),
                self.settings.page_size,
            ),
            self.session.clone(),
        )
    }

    fn account_view_model(&self) -> AccountViewModel {
        AccountViewModel::new(
            AccountRepository::new(
                Arc::clone(&self.remote),
                self.storage.clone(),
                self.settings.timeouts(),
            ),
            self.session.clone(),
        )
    }

    /// Restores the cached session of the last authenticated account.
    async fn restore_session(&self) -> Result<()> {
        let auth = self.auth_view_model();
        auth.set_state_event(AuthStateEvent::CheckPreviousAuth);
        drain(auth.view_model()).await;
        if self.session.authenticated().is_none() {
            bail!("not logged in, run `chores login` first");
        }
        Ok(())
    }
}

/// Waits for every dispatched job, then prints and acknowledges each queued
/// message in order.
async fn drain<H: ViewStateHandler>(view_model: &ViewModel<H>) {
    view_model.settle().await;
    while let Some(message) = view_model.acknowledge(0) {
        print_message(&message);
    }
}

fn print_message(message: &Message) {
    if message.ui_component_type == UiComponentType::None {
        debug!(text = %message.text, "silent message");
        return;
    }
    match message.message_type {
        MessageType::Error => eprintln!("error: {}", message.text),
        MessageType::Success | MessageType::Info => println!("{}", message.text),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(server_url) = cli.server_url {
        settings.server_url = server_url;
    }
    if let Some(database_url) = cli.database_url {
        settings.database_url = database_url;
    }

    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url)
        .await
        .with_context(|| format!("failed to open cache database '{database_url}'"))?;
    let remote: Arc<dyn RemoteApi> = Arc::new(HttpRemoteApi::new(&settings.server_url)?);
    info!(server_url = %settings.server_url, %database_url, "client ready");

    let app = App {
        session: SessionContext::new(storage.clone()),
        storage,
        remote,
        settings,
    };

    match cli.command {
        Command::Login { email, password } => {
            let auth = app.auth_view_model();
            auth.set_state_event(AuthStateEvent::Login { email, password });
            drain(auth.view_model()).await;
            if let Some(token) = auth.view_state().auth_token {
                println!("logged in as account {}", token.account_pk.0);
            }
        }
        Command::Register {
            email,
            username,
            password,
            confirm_password,
        } => {
            let auth = app.auth_view_model();
            auth.set_state_event(AuthStateEvent::Register {
                email,
                username,
                password,
                confirm_password,
            });
            drain(auth.view_model()).await;
            if let Some(token) = auth.view_state().auth_token {
                println!("registered account {}", token.account_pk.0);
            }
        }
        Command::Search {
            query,
            ordering,
            pages,
        } => {
            app.restore_session().await?;
            let blog = app.blog_view_model();
            match ordering {
                Some(ordering) => blog.set_ordering(ordering).await,
                None => blog.restore_ordering().await,
            }
            blog.set_query(&query);
            blog.load_first_page();
            drain(blog.view_model()).await;
            for _ in 1..pages {
                if !blog.next_page() {
                    break;
                }
                drain(blog.view_model()).await;
            }

            let fields = blog.view_state().blog_fields;
            for post in &fields.posts {
                println!(
                    "{}  {}  by {}  ({})",
                    post.date_updated.format("%Y-%m-%d"),
                    post.title,
                    post.username,
                    post.slug
                );
            }
            println!(
                "{} post(s), page {}{}",
                fields.posts.len(),
                fields.page,
                if fields.is_query_exhausted {
                    ", no more results"
                } else {
                    ""
                }
            );
        }
        Command::Account { email, username } => {
            app.restore_session().await?;
            let account = app.account_view_model();
            let event = match (email, username) {
                (Some(email), Some(username)) => {
                    AccountStateEvent::UpdateAccountProperties { email, username }
                }
                _ => AccountStateEvent::GetAccountProperties,
            };
            account.set_state_event(event);
            drain(account.view_model()).await;
            if let Some(properties) = account.view_state().account_properties {
                println!(
                    "account {}: {} <{}>",
                    properties.pk.0, properties.username, properties.email
                );
            }
        }
        Command::Password {
            current,
            new,
            confirm,
        } => {
            app.restore_session().await?;
            let account = app.account_view_model();
            account.set_state_event(AccountStateEvent::ChangePassword {
                current_password: current,
                new_password: new,
                confirm_new_password: confirm,
            });
            drain(account.view_model()).await;
        }
        Command::Logout => {
            app.restore_session().await?;
            let account = app.account_view_model();
            account.logout().await;
            drain(account.view_model()).await;
        }
    }

    Ok(())
}
