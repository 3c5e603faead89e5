use std::io::Write;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use cigpt::config::{logging, settings::Config};
use cigpt::modules::auth::model::{AuthSession, Gate, LOGIN_REQUIRED_DETAIL, LOGIN_REQUIRED_TITLE};
use cigpt::modules::session::controller::ChatController;
use cigpt::modules::session::model::{Message, Role};
use cigpt::modules::testimonial::controller::TestimonialFeed;
use cigpt::services::credentials::{CredentialStore, FileStore};
use cigpt::AppState;

#[derive(Parser)]
#[command(name = "cigpt", about = "CI GPT: your Canadian immigration assistant", version)]
struct Cli {
    /// Base URL of the login/signup service
    #[arg(long, global = true)]
    auth_url: Option<String>,
    /// Base URL of the chat backend
    #[arg(long, global = true)]
    chat_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and remember the credential
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Create an account and log in
    Signup {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Forget the stored credential
    Logout,
    /// Show the logged-in user
    Whoami,
    /// List chat sessions
    Sessions {
        /// Show every page instead of the first
        #[arg(long)]
        all: bool,
    },
    /// Start a new chat session
    New,
    /// Print the messages of a session
    History { session_id: String },
    /// Delete a session
    Delete { session_id: String },
    /// Send one message and print the reply
    Send {
        /// Session to send to (defaults to the login session)
        #[arg(short, long)]
        session: Option<String>,
        text: Vec<String>,
    },
    /// Interactive chat
    Chat,
    /// Show what other users say
    Testimonials,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(url) = cli.auth_url {
        config.auth_url = url;
    }
    if let Some(url) = cli.chat_url {
        config.chat_url = url;
    }

    let store = FileStore::new(&config.credentials_path);
    let mut app = AppState::new(config, store).context("failed to build HTTP client")?;

    match cli.command {
        Command::Login { email, password } => {
            app.auth.login(&email, &password).await?;
            println!("Logged in as {}", email);
        }
        Command::Signup { email, password } => {
            app.auth.signup(&email, &password).await?;
            println!("Account created. Logged in as {}", email);
        }
        Command::Logout => {
            app.auth.logout();
            println!("Logged out");
        }
        Command::Whoami => {
            let session = require_login(&app)?;
            println!("{} (user #{})", session.user_email(), session.user.id);
            println!("login session: {}", session.session_id);
        }
        Command::Sessions { all } => {
            let mut chat = controller(&app)?;
            chat.load_sessions().await;
            if all {
                while chat.load_more() > 0 {}
            }
            print_sessions(&chat);
        }
        Command::New => {
            let mut chat = controller(&app)?;
            let session = chat.create_session().await?;
            println!("Created session {}", session.session_id);
            print_transcript(chat.transcript());
        }
        Command::History { session_id } => {
            let mut chat = controller(&app)?;
            chat.select_session(&session_id).await;
            print_transcript(chat.transcript());
        }
        Command::Delete { session_id } => {
            let mut chat = controller(&app)?;
            chat.delete_session(&session_id).await?;
            println!("Deleted session {}", session_id);
        }
        Command::Send { session, text } => {
            let mut chat = controller(&app)?;
            if let Some(id) = session {
                chat.select_session(&id).await;
            }
            let before = chat.transcript().len();
            chat.send_message(&text.join(" ")).await?;
            print_transcript(&chat.transcript()[before..]);
        }
        Command::Chat => {
            let mut chat = controller(&app)?;
            run_repl(&mut chat).await?;
        }
        Command::Testimonials => {
            let mut feed = TestimonialFeed::new();
            feed.load(&app.api).await;
            if let Some(err) = feed.error() {
                bail!("{}", err);
            }
            for t in feed.items() {
                println!("{} {}", "*".repeat(usize::from(t.rating)), t.name);
                println!("  \"{}\"", t.message);
                println!("  {}", t.location);
            }
        }
    }

    Ok(())
}

fn require_login<S: CredentialStore>(app: &AppState<S>) -> Result<AuthSession> {
    match app.auth.gate() {
        Gate::Granted(session) => Ok(session.clone()),
        Gate::Loading => bail!("Loading..."),
        Gate::LoginRequired => bail!(
            "{}\n{}\nRun `cigpt login --email <email> --password <password>` first.",
            LOGIN_REQUIRED_TITLE,
            LOGIN_REQUIRED_DETAIL
        ),
    }
}

fn controller<S: CredentialStore>(app: &AppState<S>) -> Result<ChatController> {
    let session = require_login(app)?;
    Ok(app.chat_controller(&session))
}

fn print_message(message: &Message) {
    let who = match message.role {
        Role::User => "You",
        Role::Bot => "CI GPT",
    };
    println!("[{}] {}: {}", message.timestamp.format("%H:%M"), who, message.content);
}

fn print_transcript(messages: &[Message]) {
    for message in messages {
        print_message(message);
    }
}

fn print_sessions(chat: &ChatController) {
    let sessions = chat.displayed_sessions();
    if sessions.is_empty() {
        println!("No chat sessions yet");
        return;
    }

    for (i, s) in sessions.iter().enumerate() {
        let marker = if chat.selected_session_id() == Some(s.session_id.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{}{:>3}. {} ({})", marker, i + 1, s.title, s.session_id);
        println!("       {}", s.first_message_preview);
    }

    let hidden = chat.sessions().all().len() - sessions.len();
    if hidden > 0 {
        println!("... {} more", hidden);
    }
}

fn session_at(chat: &ChatController, arg: &str) -> Option<String> {
    let index: usize = arg.trim().parse().ok()?;
    chat.displayed_sessions()
        .get(index.checked_sub(1)?)
        .map(|s| s.session_id.clone())
}

const REPL_HELP: &str = "Commands: /new, /sessions, /more, /open <n>, /delete <n>, /help, /quit";

async fn run_repl(chat: &mut ChatController) -> Result<()> {
    chat.load_sessions().await;
    print_transcript(chat.transcript());
    println!("{}", REPL_HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        let (command, arg) = line.split_once(' ').unwrap_or((line, ""));

        match command {
            "" => {}
            "/quit" | "/exit" => break,
            "/help" => println!("{}", REPL_HELP),
            "/sessions" => print_sessions(chat),
            "/more" => {
                chat.load_more();
                print_sessions(chat);
            }
            "/new" => match chat.create_session().await {
                Ok(_) => print_transcript(chat.transcript()),
                Err(e) => println!("Could not create a session: {}", e),
            },
            "/open" => match session_at(chat, arg) {
                Some(id) => {
                    chat.select_session(&id).await;
                    print_transcript(chat.transcript());
                }
                None => println!("No session #{}", arg),
            },
            "/delete" => match session_at(chat, arg) {
                Some(id) => match chat.delete_session(&id).await {
                    Ok(()) => println!("Deleted session {}", id),
                    Err(e) => println!("Could not delete the session: {}", e),
                },
                None => println!("No session #{}", arg),
            },
            _ => {
                let before = chat.transcript().len();
                match chat.send_message(line).await {
                    // The user's own line is already on screen.
                    Ok(()) => print_transcript(&chat.transcript()[before + 1..]),
                    Err(e) => println!("{}", e),
                }
            }
        }
    }

    Ok(())
}
