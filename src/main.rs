mod api;
mod auth;
mod catalog;
mod cli;
mod comments;
mod config;
mod error;
mod guard;
mod models;
mod profile;
mod session;
mod storage;
#[cfg(test)]
mod testing;
mod topics;
mod validation;
mod view;

use anyhow::Result;
use clap::Parser;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mdd", about = "Terminal client for the MDD developer community")]
pub struct Args {
    #[arg(short = 'c', long, help = "Run a single command and exit (e.g. -c '/articles')")]
    pub command: Option<String>,

    #[arg(long, env = "MDD_API_URL", help = "Backend base URL")]
    pub api_url: Option<String>,

    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Where the session token and user are kept")]
    pub session_file: Option<PathBuf>,

    #[arg(long, value_name = "MS", help = "HTTP timeout in milliseconds")]
    pub timeout_ms: Option<u64>,

    #[arg(long, help = "Debug output (requests, navigation, settings)")]
    pub debug: bool,
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("mdd=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.debug);

    let mut cfg = if let Some(config_path) = &args.config {
        config::Config::load_from(config_path)?
    } else {
        config::Config::load()?
    };

    if let Some(url) = &args.api_url {
        cfg.api_url = url.clone();
    }
    if let Some(path) = &args.session_file {
        cfg.session_file = path.clone();
    }
    if let Some(timeout) = args.timeout_ms {
        cfg.timeout_ms = timeout;
    }

    if let Err(errors) = cfg.validate() {
        for e in &errors {
            eprintln!("Config error {}", e);
        }
        anyhow::bail!("Invalid configuration ({} error(s))", errors.len());
    }

    let file_store = storage::FileStore::new(&cfg.session_file);
    tracing::debug!(
        api_url = %cfg.api_url,
        timeout_ms = cfg.timeout_ms,
        session_file = %file_store.path().display(),
        sort = cfg.default_sort.as_str(),
        "settings"
    );

    let session = Rc::new(session::SessionStore::open(Box::new(file_store)));
    let transport = api::HttpTransport::new(&cfg.api_url, Duration::from_millis(cfg.timeout_ms));
    let client = Rc::new(api::ApiClient::new(Box::new(transport), session.clone()));

    let ctx = cli::Context {
        session: session.clone(),
        nav: view::Navigator::new(session),
        auth: auth::AuthGateway::new(client.clone()),
        catalog: RefCell::new(catalog::ContentCatalog::new(
            client.clone(),
            cfg.default_sort,
        )),
        topics: RefCell::new(topics::TopicSubscriptionManager::new(client.clone())),
        comments: RefCell::new(comments::CommentThread::new(client.clone())),
        profile: RefCell::new(profile::ProfileManager::new(client)),
        article: RefCell::new(None),
    };

    if let Some(command) = &args.command {
        cli::run_once(&ctx, command)
    } else {
        cli::run_repl(ctx)
    }
}
