//! Terminal front end
//!
//! A login prompt, then three tabs (Trails, Chat, Profile) switched with
//! `:trails`, `:chat` and `:profile`. Notices go through the injected
//! `Notifier`; everything else is written to the output stream.

use crate::app::App;
use crate::runtime::{ChatError, ChatSnapshot, ChatUpdate, Notifier};
use crate::state_machine::{Notice, TransitionError};
use crate::trails::Trail;
use std::io::{self, Write};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::broadcast::{self, error::RecvError};

pub const VERSION_LINE: &str = "SkillUp Plus 2030+ | Version 1.0";

/// Shown on the profile until scores are tracked
const SCORE_PLACEHOLDER: &str = "12,500 points";

const LOGIN_HELP: &str = "Commands: login <email>, register <email>, forgot, quit";
const TRAILS_HELP: &str = "Commands: continue <n>, details <n>, :chat, :profile, :quit";
const PROFILE_HELP: &str = "Commands: logout, :trails, :chat, :quit";

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("Terminal I/O failed: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Trails,
    Chat,
    Profile,
}

impl Tab {
    fn prompt(self) -> &'static str {
        match self {
            Tab::Trails => "trails> ",
            Tab::Chat => "chat> ",
            Tab::Profile => "profile> ",
        }
    }
}

/// What a view hands back to the shell loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Next {
    Switch(Tab),
    SignedOut,
    Quit,
}

/// Tab switching works the same from every signed-in view.
fn tab_command(line: &str) -> Option<Next> {
    match line.trim() {
        ":trails" => Some(Next::Switch(Tab::Trails)),
        ":chat" => Some(Next::Switch(Tab::Chat)),
        ":profile" => Some(Next::Switch(Tab::Profile)),
        ":quit" => Some(Next::Quit),
        _ => None,
    }
}

fn split_command(line: &str) -> (&str, &str) {
    let line = line.trim();
    match line.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (line, ""),
    }
}

fn progress_bar(pct: u8) -> String {
    let filled = usize::from(pct.min(100)) / 5;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(20 - filled))
}

pub struct Shell<R, W> {
    app: App,
    input: Lines<R>,
    out: W,
    notifier: Arc<dyn Notifier>,
}

impl<R, W> Shell<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(app: App, input: R, out: W, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            app,
            input: input.lines(),
            out,
            notifier,
        }
    }

    /// Run until `quit` or end of input. The app comes back on every path so
    /// the caller can shut it down.
    pub async fn run(mut self) -> (App, Result<(), ShellError>) {
        let result = self.drive().await;
        (self.app, result)
    }

    async fn drive(&mut self) -> Result<(), ShellError> {
        writeln!(self.out, "{VERSION_LINE}")?;

        loop {
            let next = if self.app.is_signed_in() {
                self.tabs(Tab::Trails).await?
            } else {
                self.login_view().await?
            };
            if next == Next::Quit {
                return Ok(());
            }
        }
    }

    async fn tabs(&mut self, mut tab: Tab) -> Result<Next, ShellError> {
        loop {
            let next = match tab {
                Tab::Trails => self.trails_view().await?,
                Tab::Chat => self.chat_view().await?,
                Tab::Profile => self.profile_view().await?,
            };
            match next {
                Next::Switch(_) if !self.app.is_signed_in() => return Ok(Next::SignedOut),
                Next::Switch(to) => tab = to,
                other => return Ok(other),
            }
        }
    }

    /// `None` at end of input. A line that is not valid UTF-8 is refused and
    /// the prompt repeats.
    async fn read_line(&mut self, prompt: &str) -> Result<Option<String>, ShellError> {
        loop {
            write!(self.out, "{prompt}")?;
            self.out.flush()?;
            match self.input.next_line().await {
                Ok(line) => return Ok(line),
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    tracing::warn!(error = %e, "Discarded unreadable input line");
                    self.notifier.notify(&Notice::error(
                        "Invalid input",
                        "That line is not valid text. Try again.",
                    ));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn login_view(&mut self) -> Result<Next, ShellError> {
        writeln!(self.out, "{LOGIN_HELP}")?;

        loop {
            let Some(line) = self.read_line("login> ").await? else {
                return Ok(Next::Quit);
            };
            let (cmd, email) = split_command(&line);

            match cmd {
                "" => {}
                "quit" | ":quit" => return Ok(Next::Quit),
                "forgot" => self
                    .notifier
                    .notify(&Notice::info("Oops!", "This feature is under development.")),
                "login" | "register" if !email.is_empty() => {
                    let Some(password) = self.read_line("password: ").await? else {
                        return Ok(Next::Quit);
                    };
                    let identity = self.app.identity();
                    let result = if cmd == "login" {
                        identity.sign_in(email, &password).await
                    } else {
                        identity.register(email, &password).await
                    };

                    match result {
                        Ok(session) => {
                            if cmd == "register" {
                                self.notifier.notify(&Notice::info(
                                    "Success",
                                    "Account registered and signed in.",
                                ));
                            }
                            writeln!(self.out, "Signed in as {}", session.email)?;
                            return Ok(Next::Switch(Tab::Trails));
                        }
                        Err(e) => {
                            tracing::info!(error = %e, cmd, "Authentication refused");
                            let title = if cmd == "login" {
                                "Login failed"
                            } else {
                                "Registration failed"
                            };
                            self.notifier.notify(&Notice::error(title, e.to_string()));
                        }
                    }
                }
                _ => writeln!(self.out, "{LOGIN_HELP}")?,
            }
        }
    }

    async fn trails_view(&mut self) -> Result<Next, ShellError> {
        writeln!(self.out, "== My Trails 2030+ ==")?;

        let trails = match self.app.trails().list_trails().await {
            Ok(trails) => trails,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load trails");
                self.notifier
                    .notify(&Notice::error("Error", "Could not load trails."));
                Vec::new()
            }
        };

        if trails.is_empty() {
            writeln!(
                self.out,
                "No trails found. Check the document store or your sign-in."
            )?;
        }
        for (n, trail) in trails.iter().enumerate() {
            self.render_trail(n + 1, trail)?;
        }

        loop {
            let Some(line) = self.read_line(Tab::Trails.prompt()).await? else {
                return Ok(Next::Quit);
            };
            if let Some(next) = tab_command(&line) {
                return Ok(next);
            }

            let (cmd, arg) = split_command(&line);
            let picked = arg
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| trails.get(i));

            match (cmd, picked) {
                ("", _) => {}
                ("continue", Some(trail)) => self.notifier.notify(&Notice::info(
                    "Action",
                    format!(
                        "You chose CONTINUE on trail: {} (ID: {})",
                        trail.title, trail.id
                    ),
                )),
                ("details", Some(trail)) => self.notifier.notify(&Notice::info(
                    "Action",
                    format!(
                        "You chose DETAILS on trail: {} (ID: {})",
                        trail.title, trail.id
                    ),
                )),
                _ => writeln!(self.out, "{TRAILS_HELP}")?,
            }
        }
    }

    fn render_trail(&mut self, n: usize, trail: &Trail) -> io::Result<()> {
        writeln!(self.out, "{n}. {}", trail.title)?;
        if !trail.description.is_empty() {
            writeln!(self.out, "   {}", trail.description)?;
        }
        writeln!(
            self.out,
            "   Progress: {}% {}",
            trail.progress,
            progress_bar(trail.progress)
        )
    }

    /// The conversation exists only while this view runs; leaving the tab
    /// drops the handle, which unmounts it.
    async fn chat_view(&mut self) -> Result<Next, ShellError> {
        writeln!(self.out, "== AI Chat 2030+ ==")?;
        let chat = self.app.mount_chat(self.notifier.clone());
        let mut updates = chat.subscribe();
        let ChatSnapshot {
            state,
            conversation,
        } = chat.snapshot();
        tracing::debug!(state = state.name(), turns = conversation.len(), "Chat view mounted");
        writeln!(self.out, "Mentor: {}", conversation.persona().content())?;

        loop {
            let Some(line) = self.read_line(Tab::Chat.prompt()).await? else {
                return Ok(Next::Quit);
            };
            if let Some(next) = tab_command(&line) {
                chat.unmount();
                return Ok(next);
            }

            match chat.submit(line).await {
                Ok(()) => {
                    if !self.follow_reply(&mut updates).await? {
                        return Ok(Next::Switch(Tab::Chat));
                    }
                }
                Err(ChatError::Rejected(TransitionError::EmptyInput)) => {}
                // Notices for the rest were raised by the runtime
                Err(e) => tracing::debug!(error = %e, "Submit refused"),
            }
        }
    }

    /// Render updates until the view is idle again. `false` when the runtime
    /// is gone.
    async fn follow_reply(
        &mut self,
        updates: &mut broadcast::Receiver<ChatUpdate>,
    ) -> Result<bool, ShellError> {
        loop {
            match updates.recv().await {
                Ok(ChatUpdate::TurnAppended { turn }) => {
                    if !turn.is_user() {
                        writeln!(self.out, "Mentor: {}", turn.content())?;
                    }
                }
                Ok(ChatUpdate::StateChanged { state }) if state.is_busy() => {
                    writeln!(self.out, "Mentor is typing...")?;
                }
                Ok(ChatUpdate::StateChanged { .. }) => return Ok(true),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Chat updates lagged");
                }
                Err(RecvError::Closed) => {
                    tracing::warn!("Chat runtime stopped");
                    return Ok(false);
                }
            }
        }
    }

    async fn profile_view(&mut self) -> Result<Next, ShellError> {
        let email = self
            .app
            .identity()
            .current_user()
            .borrow()
            .as_ref()
            .map(|s| s.email.clone());

        writeln!(self.out, "== Profile ==")?;
        writeln!(self.out, "{}", email.as_deref().unwrap_or("Not signed in"))?;
        writeln!(self.out, "Current score: {SCORE_PLACEHOLDER}")?;
        writeln!(self.out, "{VERSION_LINE}")?;

        loop {
            let Some(line) = self.read_line(Tab::Profile.prompt()).await? else {
                return Ok(Next::Quit);
            };
            if let Some(next) = tab_command(&line) {
                return Ok(next);
            }

            match line.trim() {
                "" => {}
                "logout" => {
                    let Some(answer) = self.read_line("Sign out? [y/N] ").await? else {
                        return Ok(Next::Quit);
                    };
                    if !answer.trim().eq_ignore_ascii_case("y") {
                        continue;
                    }
                    match self.app.identity().sign_out().await {
                        Ok(()) => {
                            writeln!(self.out, "Signed out.")?;
                            return Ok(Next::SignedOut);
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Sign-out failed");
                            self.notifier
                                .notify(&Notice::error("Error", "Could not sign out. Try again."));
                        }
                    }
                }
                _ => writeln!(self.out, "{PROFILE_HELP}")?,
            }
        }
    }
}
