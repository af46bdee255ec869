//! Quill - command-line front end for the blog.
//!
//! Drives the same controllers a graphical front end would, printing their
//! state instead of drawing it.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use api::{ApiError, ContentApi, HttpClient};
use clap::{Parser, Subcommand};
use store::{ClientConfig, FileStorage, FileUpload, Registration};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ui::{
    CategoryBrowser, Draft, EditorMode, HomeFeed, LoadState, ManagedPosts, NoticeLevel, Notices,
    PostEditor, PostSummary, PostView, Route, Session, SessionClient,
};

/// Read, write and manage posts on a Quill blog.
#[derive(Parser)]
#[command(name = "quill", about = "Read, write and manage posts on a Quill blog")]
struct Cli {
    /// Path to the config file.
    #[arg(long, env = "QUILL_CONFIG", default_value = "quill.toml")]
    config: PathBuf,

    /// Content API base URL, overriding the config file.
    #[arg(long, env = "QUILL_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List published posts.
    Feed {
        /// Only posts whose title, summary or body contain this text.
        #[arg(long)]
        search: Option<String>,
    },

    /// Browse published posts by category.
    Categories {
        /// Category id to show; all categories when omitted.
        #[arg(long)]
        category: Option<i64>,
    },

    /// Show a single post.
    Show {
        id: i64,

        /// Print the rendered HTML instead of the markdown source.
        #[arg(long)]
        html: bool,
    },

    /// Sign in.
    Login {
        username: String,
        #[arg(env = "QUILL_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and sign in.
    Register {
        username: String,
        #[arg(env = "QUILL_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        nickname: Option<String>,
    },

    /// Sign out.
    Logout,

    /// Show who is signed in.
    Whoami,

    /// List every post, drafts included.
    Mine,

    /// Toggle a post between draft and published.
    Publish { id: i64 },

    /// Delete a post.
    Delete {
        id: i64,

        /// Confirm the deletion. Without it nothing is deleted.
        #[arg(long)]
        yes: bool,
    },

    /// Create a post from a markdown file.
    New {
        #[arg(long)]
        title: String,

        /// Markdown file with the post body.
        #[arg(long)]
        file: PathBuf,

        #[arg(long)]
        summary: Option<String>,

        /// Publish immediately instead of saving a draft.
        #[arg(long)]
        publish: bool,

        #[arg(long)]
        category: Option<i64>,

        /// Image file to upload as the cover.
        #[arg(long)]
        cover: Option<PathBuf>,
    },

    /// Upload a file and print its URL.
    Upload { path: PathBuf },

    /// Create a category.
    NewCategory { name: String },
}

type Client = SessionClient<HttpClient<FileStorage>, FileStorage>;

struct App {
    session: Session<FileStorage>,
    http: HttpClient<FileStorage>,
    client: Client,
    notices: Notices,
}

impl App {
    fn new(config: &ClientConfig) -> Result<Self> {
        let dir = session_dir(config)?;
        tracing::debug!(dir = %dir.display(), "Session storage");
        let storage = FileStorage::new(dir);

        let session = Session::restore(storage.clone());
        let http = HttpClient::new(&config.api, storage).map_err(api_error)?;
        let client = SessionClient::new(http.clone(), session.clone());
        Ok(Self {
            session,
            http,
            client,
            notices: Notices::new(),
        })
    }

    /// Run the route guard for a protected command.
    fn enter(&self, route: Route) -> Result<()> {
        if self.session.router().navigate(route) == Route::Login {
            bail!("You need to sign in first: quill login <username> <password>");
        }
        Ok(())
    }

    fn flush_notices(&self) {
        for notice in self.notices.take() {
            match notice.level {
                NoticeLevel::Alert | NoticeLevel::Warning => eprintln!("! {}", notice.message),
                NoticeLevel::Info | NoticeLevel::Success => println!("{}", notice.message),
            }
        }
    }
}

fn session_dir(config: &ClientConfig) -> Result<PathBuf> {
    if !config.session.dir.is_empty() {
        return Ok(PathBuf::from(&config.session.dir));
    }
    let base = dirs::data_dir().context("No platform data directory; set [session] dir in the config")?;
    Ok(base.join("quill"))
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = ClientConfig::load(&cli.config)
        .with_context(|| format!("Failed to read {}", cli.config.display()))?;
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    Ok(config)
}

fn api_error(e: ApiError) -> anyhow::Error {
    anyhow!(e.user_message())
}

fn submit_error(e: ui::SubmitError) -> anyhow::Error {
    match e {
        ui::SubmitError::Remote(err) => api_error(err),
        other => anyhow!(other.to_string()),
    }
}

fn ready<T>(state: LoadState<T>) -> Result<T> {
    match state {
        LoadState::Ready(value) => Ok(value),
        LoadState::Failed(e) => Err(anyhow!(e.user_message())),
        LoadState::Loading => Err(anyhow!("Nothing was loaded")),
    }
}

fn print_summaries(summaries: &[PostSummary], show_status: bool) {
    if summaries.is_empty() {
        println!("No posts found.");
        return;
    }
    for s in summaries {
        let status = match (show_status, s.is_published) {
            (false, _) => "",
            (true, true) => " [published]",
            (true, false) => " [draft]",
        };
        println!(
            "#{:<4} {}{}\n      {} · {} · {} min",
            s.id,
            s.title,
            status,
            s.category,
            s.date.as_deref().unwrap_or("-"),
            s.read_time
        );
        if let Some(summary) = &s.summary {
            println!("      {summary}");
        }
    }
}

fn read_upload(path: &Path) -> Result<FileUpload> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(FileUpload::new(name, mime_for(path), bytes))
}

fn mime_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let app = App::new(&config)?;

    let result = run(&app, cli.command).await;
    app.flush_notices();
    result
}

async fn run(app: &App, command: Commands) -> Result<()> {
    match command {
        Commands::Feed { search } => {
            let feed = HomeFeed::new(app.client.clone());
            feed.load().await;
            if let Some(query) = search {
                feed.set_query(query);
            }
            print_summaries(&ready(feed.summaries())?, false);
        }

        Commands::Categories { category } => {
            let browser = CategoryBrowser::new(app.client.clone());
            browser.select(category).await;
            let summaries = ready(browser.summaries())?;
            for count in browser.counts() {
                println!("{} ({})", count.label, count.count);
            }
            println!();
            if let Some(selected) = browser.selected_category() {
                println!("Posts in \"{}\":", selected.name);
            }
            print_summaries(&summaries, false);
        }

        Commands::Show { id, html } => {
            let view = PostView::new(app.client.clone());
            view.open(id).await;
            let post = ready(view.state())?;
            println!("{}", post.title);
            if let Some(date) = post.created_date() {
                println!("{} · {} min read", date, view.read_time().unwrap_or(0));
            }
            println!();
            match view.document() {
                Some(doc) if html => println!("{}", doc.to_html()),
                _ => println!("{}", post.content),
            }
        }

        Commands::Login { username, password } => {
            let identity = app
                .session
                .login(&app.http, &username, &password)
                .await
                .map_err(|e| anyhow!(e.user_message()))?;
            println!("Signed in as {}", identity.display_name());
        }

        Commands::Register {
            username,
            password,
            nickname,
        } => {
            let registration = Registration {
                username,
                password,
                nickname,
                avatar: None,
            };
            let identity = app
                .session
                .register(&app.http, &registration)
                .await
                .map_err(|e| anyhow!(e.user_message()))?;
            println!("Registered and signed in as {}", identity.display_name());
        }

        Commands::Logout => {
            app.session.logout();
            println!("Signed out");
        }

        Commands::Whoami => match app.session.identity() {
            Some(identity) => println!("{}", identity.display_name()),
            None => println!("Not signed in"),
        },

        Commands::Mine => {
            app.enter(Route::MyPosts)?;
            let list = ManagedPosts::new(app.client.clone(), app.notices.clone());
            list.load().await;
            print_summaries(&ready(list.summaries())?, true);
        }

        Commands::Publish { id } => {
            app.enter(Route::MyPosts)?;
            let list = ManagedPosts::new(app.client.clone(), app.notices.clone());
            list.load().await;
            ready(list.state())?;
            let post = list.toggle_publish(id).await.map_err(api_error)?;
            let state = if post.is_published { "published" } else { "a draft" };
            println!("\"{}\" is now {}", post.title, state);
        }

        Commands::Delete { id, yes } => {
            app.enter(Route::MyPosts)?;
            let list = ManagedPosts::new(app.client.clone(), app.notices.clone());
            list.load().await;
            ready(list.state())?;
            let confirm = |question: &str| {
                if !yes {
                    eprintln!("{question} Pass --yes to confirm.");
                }
                yes
            };
            if list.delete(id, &confirm).await.map_err(api_error)? {
                println!("Deleted post #{id}");
            }
        }

        Commands::New {
            title,
            file,
            summary,
            publish,
            category,
            cover,
        } => {
            app.enter(Route::Create)?;
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let editor = PostEditor::new(
                app.client.clone(),
                app.session.router().clone(),
                app.notices.clone(),
                EditorMode::Create,
            );
            editor.load().await;
            if let Some(id) = category {
                if !editor.categories().is_empty() && !editor.categories().iter().any(|c| c.id == id) {
                    bail!("No category with id {id}");
                }
            }
            editor.update(|draft: &mut Draft| {
                draft.title = title;
                draft.set_content(content);
                draft.summary = summary.unwrap_or_default();
                draft.category_id = category;
            });
            if let Some(path) = cover {
                let upload = read_upload(&path)?;
                editor.upload_cover(&upload).await.map_err(submit_error)?;
            }
            let post = editor.submit(publish).await.map_err(submit_error)?;
            println!("Saved post #{} \"{}\"", post.id, post.title);
        }

        Commands::Upload { path } => {
            app.enter(Route::Create)?;
            let upload = read_upload(&path)?;
            let uploaded = app.client.upload_file(&upload).await.map_err(api_error)?;
            println!("{}", uploaded.url);
        }

        Commands::NewCategory { name } => {
            app.enter(Route::Create)?;
            let category = app.client.create_category(&name).await.map_err(api_error)?;
            println!("Created category #{} \"{}\"", category.id, category.name);
        }
    }
    Ok(())
}
