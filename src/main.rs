use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};

use libris::services::catalog::{self, Attachment, BookForm, BookQuery};
use libris::{ApiClient, ApiError, ClientConfig, FileCredentialStore, ProfileUpdate, Registration, Session, SessionStore};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("not logged in; run `libris login` first")]
    NotLoggedIn,
    #[error("nothing to update; pass --name, --email or --field")]
    EmptyUpdate,
    #[error("invalid JSON output: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "libris", about = "Mini library catalog client")]
struct Cli {
    /// Backend base URL, including the `/api` prefix.
    #[arg(long, env = "LIBRARY_API_URL")]
    base_url: Option<String>,

    /// Deployment environment selecting the default base URL.
    #[arg(long = "env", env = "LIBRARY_ENV")]
    environment: Option<String>,

    /// Where the session token is kept (default: `$LIBRIS_HOME/token`).
    #[arg(long, env = "LIBRIS_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login(LoginArgs),
    Register(RegisterArgs),
    Logout,
    Whoami,
    Profile(ProfileArgs),
    Books(BooksCommand),
}

#[derive(Args, Debug)]
struct LoginArgs {
    #[arg(long)]
    email: String,
    #[arg(long, env = "LIBRIS_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    email: String,
    #[arg(long, env = "LIBRIS_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long = "field", value_parser = parse_pair)]
    fields: Vec<(String, String)>,
}

#[derive(Args, Debug)]
struct ProfileArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long = "field", value_parser = parse_pair)]
    fields: Vec<(String, String)>,
}

#[derive(Args, Debug)]
struct BooksCommand {
    #[command(subcommand)]
    command: BooksSubcommand,
}

#[derive(Subcommand, Debug)]
enum BooksSubcommand {
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long = "param", value_parser = parse_pair)]
        params: Vec<(String, String)>,
    },
    Get {
        book_id: String,
    },
    Issue {
        book_id: String,
    },
    Return {
        book_id: String,
    },
    Rate {
        book_id: String,
        rating: u8,
    },
    Add(BookFormArgs),
    Update {
        book_id: String,
        #[command(flatten)]
        form: BookFormArgs,
    },
    Delete {
        book_id: String,
    },
}

#[derive(Args, Debug)]
struct BookFormArgs {
    #[arg(long = "field", value_parser = parse_pair)]
    fields: Vec<(String, String)>,

    #[arg(long, help = "Cover image to upload")]
    cover: Option<PathBuf>,

    #[arg(long, default_value = "coverImage")]
    cover_field: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            if let CliError::Api(api) = &e {
                if let Some(message) = api.message() {
                    eprintln!("  {message} ({})", api.error_code());
                }
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = ClientConfig::resolve(cli.base_url.as_deref(), cli.environment.as_deref())?;
    let storage = match cli.token_file {
        Some(path) => FileCredentialStore::new(path),
        None => FileCredentialStore::at_default_path()?,
    };
    let client = ApiClient::from_config(&config)?;
    tracing::debug!(base_url = client.base_url(), "client configured");
    let store = SessionStore::new(client, storage);

    match cli.command {
        Command::Login(args) => {
            let session = store.login(&args.email, &args.password).await?;
            print_session(&session)
        }
        Command::Register(args) => {
            let mut registration = Registration::new(args.email, args.password);
            registration.name = args.name;
            for (key, value) in args.fields {
                registration = registration.field(key, value);
            }
            let session = store.register(&registration).await?;
            print_session(&session)
        }
        Command::Logout => {
            store.logout()?;
            print_json(&json!({ "authenticated": false }))
        }
        Command::Whoami => {
            let session = store.initialize().await;
            if !session.is_authenticated() {
                return Err(CliError::NotLoggedIn);
            }
            print_session(&session)
        }
        Command::Profile(args) => {
            let update = profile_update(args)?;
            require_login(&store).await?;
            let user = store.update_profile(&update).await?;
            print_json(&user)
        }
        Command::Books(books) => run_books(&store, books.command).await,
    }
}

async fn run_books(store: &SessionStore, command: BooksSubcommand) -> Result<(), CliError> {
    store.initialize().await;
    let client = store.client();

    let json = match command {
        BooksSubcommand::List { search, params } => {
            let mut query = BookQuery::new();
            if let Some(search) = search {
                query = query.search(search);
            }
            for (key, value) in params {
                query = query.param(key, value);
            }
            catalog::get_books(client, &query).await?
        }
        BooksSubcommand::Get { book_id } => catalog::get_book_by_id(client, &book_id).await?,
        BooksSubcommand::Issue { book_id } => {
            require_login(store).await?;
            catalog::issue_book(client, &book_id).await?
        }
        BooksSubcommand::Return { book_id } => {
            require_login(store).await?;
            catalog::return_book(client, &book_id).await?
        }
        BooksSubcommand::Rate { book_id, rating } => {
            require_login(store).await?;
            catalog::rate_book(client, &book_id, rating).await?
        }
        BooksSubcommand::Add(form) => {
            require_login(store).await?;
            catalog::add_book(client, book_form(form).await?).await?
        }
        BooksSubcommand::Update { book_id, form } => {
            require_login(store).await?;
            catalog::update_book(client, &book_id, book_form(form).await?).await?
        }
        BooksSubcommand::Delete { book_id } => {
            require_login(store).await?;
            catalog::delete_book(client, &book_id).await?
        }
    };
    print_json(&json)
}

async fn require_login(store: &SessionStore) -> Result<(), CliError> {
    if store.initialize().await.is_authenticated() { Ok(()) } else { Err(CliError::NotLoggedIn) }
}

fn profile_update(args: ProfileArgs) -> Result<ProfileUpdate, CliError> {
    let mut update = ProfileUpdate::new();
    update.name = args.name;
    update.email = args.email;
    for (key, value) in args.fields {
        update = update.field(key, value);
    }
    if update.is_empty() {
        return Err(CliError::EmptyUpdate);
    }
    Ok(update)
}

async fn book_form(args: BookFormArgs) -> Result<BookForm, CliError> {
    let mut form = BookForm::new();
    for (key, value) in args.fields {
        form = form.text(key, value);
    }
    if let Some(path) = args.cover {
        form = form.attach(Attachment::from_path(args.cover_field, &path).await?);
    }
    Ok(form)
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in `{raw}`"));
    }
    Ok((key.to_owned(), value.to_owned()))
}

fn print_session(session: &Session) -> Result<(), CliError> {
    print_json(&json!({
        "authenticated": session.is_authenticated(),
        "user": session.user,
    }))
}

fn print_json(value: &impl serde::Serialize) -> Result<(), CliError> {
    let rendered: Value = serde_json::to_value(value)?;
    println!("{}", serde_json::to_string_pretty(&rendered)?);
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
