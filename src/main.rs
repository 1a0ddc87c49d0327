use std::path::PathBuf;

use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use chordhub::{
    cli::{self, App, ListOptions, Shelf, SongFields},
    config::{self, ClientConfig},
    error, logging,
    service::songs::{DEFAULT_LIST_LIMIT, DEFAULT_SUGGESTION_LIMIT},
    types::ExportFormat,
};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    /// Server URL, overrides CHORDHUB_API_URL
    #[clap(long, global = true)]
    api_url: Option<String>,

    /// Show debug logs on stderr
    #[clap(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Log in to MyChordHub
    Login {
        email: String,
        /// Read from stdin when omitted
        #[clap(long)]
        password: Option<String>,
        /// Page to continue to after logging in
        #[clap(long)]
        redirect: Option<String>,
    },

    /// Create an account
    Register {
        email: String,
        #[clap(long)]
        display_name: String,
        #[clap(long)]
        password: Option<String>,
    },

    /// Log out and forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Manage your profile
    #[command(subcommand)]
    Profile(ProfileCommand),

    /// Confirm your email address with the token from the verification email
    VerifyEmail { token: String },

    /// Send the verification email again
    ResendVerification,

    /// Request a password reset link
    ForgotPassword { email: String },

    /// Set a new password with the token from the reset email
    ResetPassword {
        token: String,
        #[clap(long)]
        password: Option<String>,
    },

    /// Browse, search and edit songs
    #[command(subcommand)]
    Songs(SongsCommand),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Subcommand, Debug, Clone)]
pub enum ProfileCommand {
    /// Update display name, bio or avatar URL
    Update {
        #[clap(long)]
        display_name: Option<String>,
        #[clap(long)]
        bio: Option<String>,
        #[clap(long)]
        avatar_url: Option<String>,
    },

    /// Change your password
    Password {
        #[clap(long)]
        current: Option<String>,
        #[clap(long)]
        new: Option<String>,
    },

    /// Upload an avatar image
    Avatar { file: PathBuf },

    /// Delete your account
    Delete {
        #[clap(long)]
        password: Option<String>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum SongsCommand {
    /// List songs page by page
    List(ListOptions),

    /// Search songs by text and filters
    Search {
        query: String,
        #[command(flatten)]
        options: ListOptions,
    },

    /// Show song details
    Show {
        id: String,
        /// Also print lyrics and chords
        #[clap(long)]
        content: bool,
    },

    /// Print lyrics with chords
    Content { id: String },

    /// Create a song
    Create(SongFields),

    /// Update song details or lyrics
    Update {
        id: String,
        #[command(flatten)]
        fields: SongFields,
    },

    /// Delete a song
    Delete { id: String },

    /// Copy a song into your library
    Duplicate {
        id: String,
        #[clap(long)]
        title: Option<String>,
    },

    /// Rate a song from 1 to 5
    Rate {
        id: String,
        #[clap(value_parser = clap::value_parser!(u8).range(1..=5))]
        score: u8,
        #[clap(long)]
        comment: Option<String>,
    },

    /// Show ratings of a song
    Ratings {
        id: String,
        #[clap(long)]
        page: Option<u32>,
        #[clap(long)]
        size: Option<u32>,
    },

    /// Most popular songs
    Popular {
        #[clap(long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: u32,
    },

    /// Most recently added songs
    Latest {
        #[clap(long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: u32,
    },

    /// Songs recommended for you
    Recommended {
        #[clap(long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: u32,
    },

    /// Search suggestions for a partial query
    Suggest {
        query: String,
        #[clap(long, default_value_t = DEFAULT_SUGGESTION_LIMIT)]
        limit: u32,
    },

    /// Download a song as PDF, text or JSON
    Export {
        id: String,
        #[clap(long, default_value_t = ExportFormat::default())]
        format: ExportFormat,
        /// Defaults to `<id>.<format>` in the current directory
        #[clap(long, short)]
        output: Option<PathBuf>,
    },

    /// Songs you created
    Mine {
        #[clap(long)]
        page: Option<u32>,
        #[clap(long)]
        size: Option<u32>,
    },
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    if let Command::Completions(opt) = &cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(opt.shell, &mut cmd, name, &mut std::io::stdout());
        return;
    }

    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let mut config = ClientConfig::from_env();
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }

    let mut app = match App::init(config).await {
        Ok(app) => app,
        Err(e) => error!("Cannot start chordhub. Err: {}", e),
    };

    run(&mut app, cli.command).await;
    app.report_session();
}

async fn run(app: &mut App, command: Command) {
    match command {
        Command::Login {
            email,
            password,
            redirect,
        } => cli::login(app, email, password, redirect).await,
        Command::Register {
            email,
            display_name,
            password,
        } => cli::register(app, email, display_name, password).await,
        Command::Logout => cli::logout(app).await,
        Command::Whoami => cli::whoami(app).await,
        Command::Profile(cmd) => match cmd {
            ProfileCommand::Update {
                display_name,
                bio,
                avatar_url,
            } => cli::update_profile(app, display_name, bio, avatar_url).await,
            ProfileCommand::Password { current, new } => {
                cli::change_password(app, current, new).await
            }
            ProfileCommand::Avatar { file } => cli::upload_avatar(app, &file).await,
            ProfileCommand::Delete { password } => cli::delete_account(app, password).await,
        },
        Command::VerifyEmail { token } => cli::verify_email(app, token).await,
        Command::ResendVerification => cli::resend_verification(app).await,
        Command::ForgotPassword { email } => cli::forgot_password(app, email).await,
        Command::ResetPassword { token, password } => {
            cli::reset_password(app, token, password).await
        }
        Command::Songs(cmd) => match cmd {
            SongsCommand::List(options) => cli::list_songs(app, None, options).await,
            SongsCommand::Search { query, options } => {
                cli::list_songs(app, Some(query), options).await
            }
            SongsCommand::Show { id, content } => cli::show_song(app, &id, content).await,
            SongsCommand::Content { id } => cli::show_song_content(app, &id).await,
            SongsCommand::Create(fields) => cli::create_song(app, fields).await,
            SongsCommand::Update { id, fields } => cli::update_song(app, &id, fields).await,
            SongsCommand::Delete { id } => cli::delete_song(app, &id).await,
            SongsCommand::Duplicate { id, title } => cli::duplicate_song(app, &id, title).await,
            SongsCommand::Rate { id, score, comment } => {
                cli::rate_song(app, &id, score, comment).await
            }
            SongsCommand::Ratings { id, page, size } => {
                cli::show_ratings(app, &id, page, size).await
            }
            SongsCommand::Popular { limit } => cli::song_shelf(app, Shelf::Popular, limit).await,
            SongsCommand::Latest { limit } => cli::song_shelf(app, Shelf::Latest, limit).await,
            SongsCommand::Recommended { limit } => {
                cli::song_shelf(app, Shelf::Recommended, limit).await
            }
            SongsCommand::Suggest { query, limit } => cli::suggest(app, &query, limit).await,
            SongsCommand::Export { id, format, output } => {
                cli::export_song(app, &id, format, output).await
            }
            SongsCommand::Mine { page, size } => cli::my_songs(app, page, size).await,
        },
        Command::Completions(_) => {}
    }
}
