//! REPL command parsing.

#[derive(Debug, Clone, PartialEq)]
pub enum SidebarCommand {
    Show,
    Wider,
    Narrower,
    Reset,
    /// Simulate dragging the handle to a pointer x-coordinate and releasing.
    Drag(f64),
    DismissHelp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Free text; an empty line submits whatever is pending in the composer.
    Message(String),
    New,
    List,
    Open(String),
    Delete(String),
    Attach(String),
    Detach,
    Voice,
    Lang,
    Sidebar(SidebarCommand),
    Login { email: String, password: String },
    Logout,
    Help,
    Quit,
}

pub fn parse(line: &str) -> Result<Command, String> {
    let Some(rest) = line.trim_start().strip_prefix('/') else {
        return Ok(Command::Message(line.to_owned()));
    };
    let mut words = rest.split_whitespace();
    let name = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();

    let one_arg = |usage: &str| match args.as_slice() {
        [arg] => Ok(arg.to_string()),
        _ => Err(format!("usage: {usage}")),
    };

    match name {
        "new" => Ok(Command::New),
        "list" => Ok(Command::List),
        "open" => one_arg("/open <id>").map(Command::Open),
        "delete" => one_arg("/delete <id>").map(Command::Delete),
        "attach" if !args.is_empty() => Ok(Command::Attach(args.join(" "))),
        "attach" => Err("usage: /attach <file name>".into()),
        "detach" => Ok(Command::Detach),
        "voice" => Ok(Command::Voice),
        "lang" => Ok(Command::Lang),
        "sidebar" => parse_sidebar(&args).map(Command::Sidebar),
        "login" => match args.as_slice() {
            [email, password] => Ok(Command::Login {
                email: email.to_string(),
                password: password.to_string(),
            }),
            _ => Err("usage: /login <email> <password>".into()),
        },
        "logout" => Ok(Command::Logout),
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command '/{other}', try /help")),
    }
}

fn parse_sidebar(args: &[&str]) -> Result<SidebarCommand, String> {
    match args {
        [] => Ok(SidebarCommand::Show),
        ["wider"] | ["right"] => Ok(SidebarCommand::Wider),
        ["narrower"] | ["left"] => Ok(SidebarCommand::Narrower),
        ["reset"] => Ok(SidebarCommand::Reset),
        ["got-it"] => Ok(SidebarCommand::DismissHelp),
        ["drag", x] => x
            .parse()
            .map(SidebarCommand::Drag)
            .map_err(|_| format!("'{x}' is not a number")),
        _ => Err("usage: /sidebar [wider|narrower|reset|got-it|drag <x>]".into()),
    }
}

pub const HELP: &str = "\
commands:
  <text>                 send a message (an empty line sends the pending draft)
  /new                   start a new conversation
  /list                  list your conversations
  /open <id>             open a conversation
  /delete <id>           delete a conversation
  /attach <file name>    attach a file (only its name is sent)
  /detach                drop the pending attachment
  /voice                 record a voice message
  /lang                  switch language (en/so)
  /sidebar [...]         show or resize the sidebar: wider, narrower, reset, got-it, drag <x>
  /login <email> <pw>    sign in
  /logout                sign out
  /quit                  exit";
