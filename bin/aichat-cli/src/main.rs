//! aichat – terminal front-end for an `aichat-server`.
//!
//! Drives a [`ChatSession`] from a line editor: free text is sent as a chat
//! turn, slash commands manage conversations, attachments, voice capture,
//! language and the sidebar width.

mod command;

use std::path::PathBuf;
use std::sync::Arc;

use aichat_client::auth::AuthProvider;
use aichat_client::prefs::Preferences;
use aichat_client::sidebar::Nudge;
use aichat_client::voice::{NoMicrophone, SilentMicrophone};
use aichat_client::{
    ChatSession, FileStore, HttpConversationStore, HttpGateway, InputComposer, MemoryStore,
    PlaceholderTranscriber, SendOutcome, SidebarLayout, StaticAuth, VoiceRecorder,
};
use aichat_types::Role;
use clap::Parser;
use crossterm::style::{Color, Stylize};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::warn;

use crate::command::{Command, SidebarCommand, HELP};

#[derive(Debug, Parser)]
#[command(name = "aichat", version, about = "Chat with an aichat-server from the terminal")]
struct Args {
    /// Base URL of the aichat-server.
    #[arg(long, env = "AICHAT_SERVER_URL", default_value = "http://127.0.0.1:3000")]
    server: String,

    /// Sign in as this user id (forwarded in the user header).
    #[arg(long, env = "AICHAT_USER")]
    user: Option<String>,

    /// Header the server reads the user id from.
    #[arg(long, env = "AICHAT_USER_HEADER", default_value = "x-user-id")]
    user_header: String,

    /// Preferences file; defaults to the platform config directory.
    #[arg(long, env = "AICHAT_PREFS")]
    prefs: Option<PathBuf>,

    /// Pretend a microphone is attached.
    #[arg(long)]
    microphone: bool,
}

struct App {
    auth: Arc<StaticAuth>,
    session: ChatSession,
    composer: InputComposer,
    voice: VoiceRecorder,
    sidebar: SidebarLayout,
    prefs: Preferences,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let prefs = open_preferences(args.prefs.as_ref())?;
    let auth = Arc::new(match &args.user {
        Some(user) => StaticAuth::signed_in(user.clone()),
        None => StaticAuth::anonymous(),
    });
    let store = Arc::new(HttpConversationStore::new(&args.server, &args.user_header)?);
    let gateway = Arc::new(HttpGateway::new(&args.server)?);
    let microphone: Arc<dyn aichat_client::Microphone> = if args.microphone {
        Arc::new(SilentMicrophone)
    } else {
        Arc::new(NoMicrophone)
    };

    let mut app = App {
        session: ChatSession::new(auth.clone(), store, gateway),
        auth,
        composer: InputComposer::new(),
        voice: VoiceRecorder::new(microphone, Arc::new(PlaceholderTranscriber)),
        sidebar: SidebarLayout::load(prefs.clone()),
        prefs,
    };

    println!("aichat {} – type /help for commands", env!("CARGO_PKG_VERSION"));
    if app.auth.current_user().is_none() {
        println!("{}", "not signed in; use /login <email> <password>".with(Color::Yellow));
    }

    let mut editor = DefaultEditor::new()?;
    loop {
        let prompt = format!("{} ", ">".with(Color::Green));
        let line = match editor.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        if !line.trim().is_empty() {
            let _ = editor.add_history_entry(line.as_str());
        }

        match command::parse(&line) {
            Ok(Command::Quit) => break,
            Ok(cmd) => app.run(cmd).await,
            Err(msg) => println!("{}", msg.with(Color::Red)),
        }
    }
    Ok(())
}

fn open_preferences(path: Option<&PathBuf>) -> anyhow::Result<Preferences> {
    let path = path.cloned().or_else(FileStore::default_path);
    Ok(match path {
        Some(path) => Preferences::new(Arc::new(FileStore::open(path)?)),
        None => {
            warn!("no config directory; preferences will not be saved");
            Preferences::new(Arc::new(MemoryStore::default()))
        }
    })
}

impl App {
    async fn run(&mut self, cmd: Command) {
        match cmd {
            Command::Message(text) => self.submit(&text).await,
            Command::New => match self.session.new_chat().await {
                Ok(c) => println!("started conversation {}", c.id),
                Err(e) => report(e),
            },
            Command::List => match self.session.list_conversations().await {
                Ok(list) if list.is_empty() => println!("no conversations yet"),
                Ok(list) => {
                    let active = self.session.active_conversation().map(|c| c.id);
                    for c in list {
                        let marker = if active.as_deref() == Some(c.id.as_str()) { "*" } else { " " };
                        println!("{marker} {}  {}  ({})", c.id, c.title, c.updated_at.format("%Y-%m-%d %H:%M"));
                    }
                }
                Err(e) => report(e),
            },
            Command::Open(id) => match self.session.open_conversation(&id).await {
                Ok(c) => {
                    println!("{}", c.title.as_str().bold());
                    for turn in self.session.history() {
                        print_turn(turn.role, &turn.content);
                    }
                }
                Err(e) => report(e),
            },
            Command::Delete(id) => match self.session.delete_conversation(&id).await {
                Ok(()) => println!("deleted {id}"),
                Err(e) => report(e),
            },
            Command::Attach(name) => {
                self.composer.attach(name);
                self.show_draft();
            }
            Command::Detach => {
                self.composer.remove_attachment();
                self.show_draft();
            }
            Command::Voice => self.record_voice().await,
            Command::Lang => {
                let language = self.prefs.language().toggled();
                match self.prefs.set_language(language) {
                    Ok(()) => println!("language: {language}"),
                    Err(e) => report(e),
                }
            }
            Command::Sidebar(cmd) => self.sidebar(cmd),
            Command::Login { email, password } => match self.auth.sign_in(&email, &password).await {
                Ok(user) => println!("signed in as {}", user.id),
                Err(e) => report(e),
            },
            Command::Logout => {
                if let Err(e) = self.auth.sign_out().await {
                    report(e);
                }
                self.session.clear_conversation();
                println!("signed out");
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => {}
        }
    }

    async fn submit(&mut self, text: &str) {
        if !text.trim().is_empty() {
            self.composer.append_transcript(text);
        }
        let Some(message) = self.composer.submit(self.session.is_input_disabled()) else {
            if self.auth.current_user().is_none() {
                println!("{}", "sign in first: /login <email> <password>".with(Color::Yellow));
            }
            return;
        };
        match self.session.send(&message).await {
            SendOutcome::Replied(turn) => print_turn(turn.role, &turn.content),
            SendOutcome::AuthRequired => {
                println!("{}", "sign in first: /login <email> <password>".with(Color::Yellow))
            }
            SendOutcome::Busy => println!("still waiting for the previous reply"),
            SendOutcome::NotStarted(e) => report(e),
            SendOutcome::Detached { conversation_id } => {
                println!("reply saved to conversation {conversation_id}")
            }
            SendOutcome::Failed(e) => {
                warn!(error = %e, "send failed");
                if let Some(turn) = self.session.history().last() {
                    print_turn(turn.role, &turn.content);
                }
            }
        }
    }

    async fn record_voice(&mut self) {
        if let Some(text) = self.voice.press().await {
            self.composer.append_transcript(&text);
            self.show_draft();
            return;
        }
        println!("{}", "recording… (transcribing)".with(Color::DarkGrey));
        match self.voice.release().await {
            Ok(Some(text)) => {
                self.composer.append_transcript(&text);
                self.show_draft();
            }
            Ok(None) => {}
            Err(e) => report(e),
        }
    }

    fn sidebar(&mut self, cmd: SidebarCommand) {
        match cmd {
            SidebarCommand::Show => {}
            SidebarCommand::Wider => {
                self.sidebar.nudge(Nudge::Wider);
            }
            SidebarCommand::Narrower => {
                self.sidebar.nudge(Nudge::Narrower);
            }
            SidebarCommand::Reset => {
                self.sidebar.reset();
            }
            SidebarCommand::Drag(x) => {
                self.sidebar.begin_drag();
                self.sidebar.drag_to(x);
                self.sidebar.end_drag();
            }
            SidebarCommand::DismissHelp => self.sidebar.dismiss_help(),
        }
        println!("sidebar width: {}px", self.sidebar.width());
        if self.sidebar.should_show_help() {
            println!(
                "{}",
                "tip: drag the handle, use wider/narrower, or reset; /sidebar got-it hides this"
                    .with(Color::DarkGrey)
            );
        }
    }

    fn show_draft(&self) {
        let attachment = self
            .composer
            .attachment()
            .map(|name| format!(" [File: {name}]"))
            .unwrap_or_default();
        println!("draft: {}{}  (empty line sends)", self.composer.draft(), attachment);
    }
}

fn print_turn(role: Role, content: &str) {
    match role {
        Role::User => println!("{} {}", "you:".with(Color::Green), content),
        Role::Assistant => println!("{} {}", "assistant:".with(Color::Cyan), content),
    }
}

fn report(e: aichat_client::ClientError) {
    println!("{}", e.to_string().with(Color::Red));
}
