//! Interactive shell: rustyline editor with history and slash-command
//! completion, conversation persistence, and the slash-command surface.

use std::borrow::Cow;
use std::path::PathBuf;

use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::FileHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

use taskforge_core::{Coordinator, ExecutionState};
use taskforge_memory::{ConversationStore, Role};
use taskforge_tasks::TodoStatus;

/// Approximate context window handed to the model each turn; older messages
/// are trimmed first.
const MAX_CONTEXT_TOKENS: usize = 24_000;

const SLASH_COMMANDS: &[&str] = &[
    "/help", "/h", "/status", "/debug", "/todo", "/do", "/do all", "/do next", "/pause",
    "/resume", "/stop", "/cancel", "/history", "/session", "/session list", "/session new",
    "/session load", "/gemini", "/claude", "/chatgpt", "/mistral", "/exit", "/quit", "/q",
];

struct ReplHelper {
    commands: Vec<String>,
}

impl Helper for ReplHelper {}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        if !line.starts_with('/') {
            return Ok((0, Vec::new()));
        }

        let candidates = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.clone(),
                replacement: cmd.clone(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        None
    }
}

impl Highlighter for ReplHelper {
    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        _default: bool,
    ) -> Cow<'b, str> {
        Cow::Borrowed(prompt)
    }
}

impl Validator for ReplHelper {}

#[derive(Debug, PartialEq)]
enum DoCommand {
    All,
    Next,
    Until(u64),
    Range(u64, u64),
    Single(u64),
}

fn parse_do_args(args: &str) -> Result<DoCommand, String> {
    let args = args.trim();

    if args.is_empty() || args == "all" {
        return Ok(DoCommand::All);
    }
    if args == "next" {
        return Ok(DoCommand::Next);
    }
    if let Some(id_text) = args.strip_prefix("until") {
        let id = id_text
            .trim()
            .parse()
            .map_err(|_| "Usage: /do until <id>".to_string())?;
        return Ok(DoCommand::Until(id));
    }
    if let Some((start_text, end_text)) = args.split_once('-') {
        let start = start_text
            .trim()
            .parse()
            .map_err(|_| "Usage: /do <start>-<end>".to_string())?;
        let end = end_text
            .trim()
            .parse()
            .map_err(|_| "Usage: /do <start>-<end>".to_string())?;
        return Ok(DoCommand::Range(start, end));
    }

    args.parse()
        .map(DoCommand::Single)
        .map_err(|_| "Usage: /do [all|next|until <id>|<start>-<end>|<id>]".to_string())
}

pub struct Repl {
    coordinator: Coordinator,
    conversation: ConversationStore,
    editor: Editor<ReplHelper, FileHistory>,
    history_path: PathBuf,
    running: bool,
    use_colors: bool,
}

impl Repl {
    pub fn new(coordinator: Coordinator, state_dir: PathBuf) -> anyhow::Result<Self> {
        let mut editor = Editor::new()?;
        editor.set_helper(Some(ReplHelper {
            commands: SLASH_COMMANDS.iter().map(|c| c.to_string()).collect(),
        }));

        let history_path = state_dir.join("history");
        // no history yet on first launch
        let _ = editor.load_history(&history_path);

        let use_colors = std::env::var("TERM")
            .map(|term| !term.is_empty() && term != "dumb")
            .unwrap_or(false);

        Ok(Self {
            coordinator,
            conversation: ConversationStore::new(state_dir.join("conversations")),
            editor,
            history_path,
            running: true,
            use_colors,
        })
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        self.show_welcome();
        tracing::info!("interactive shell started");

        while self.running {
            let prompt = self.prompt();
            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let input = line.trim().to_string();
                    if input.is_empty() {
                        continue;
                    }
                    let _ = self.editor.add_history_entry(&input);
                    self.handle_command(&input).await;
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => {
                    println!("Goodbye!");
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }

        let _ = self.editor.save_history(&self.history_path);
        self.conversation.save_to_disk()?;
        tracing::info!("interactive shell ended");
        Ok(())
    }

    async fn handle_command(&mut self, input: &str) {
        tracing::debug!(input, "handling command");

        if let Some(command) = input.strip_prefix('/') {
            self.handle_slash_command(command).await;
            return;
        }

        self.print_colored(&format!("Processing: {}", input), "36");
        println!();

        self.conversation.add_user_message(input);
        self.conversation.trim_to_token_budget(MAX_CONTEXT_TOKENS);
        let history = self.conversation.history();

        match self.coordinator.run_with_history(input, &history).await {
            Ok(Some(reply)) if !reply.is_empty() => {
                let provider = self.coordinator.provider_name();
                self.conversation.add_assistant_message(reply, provider);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, "turn abandoned");
                self.print_colored(&format!("Error: {}", e), "31");
                println!();
            }
        }
    }

    async fn handle_slash_command(&mut self, command: &str) {
        match command {
            "help" | "h" => self.show_help(),
            "status" => self.show_status(),
            "debug" => self.show_debug(),
            "todo" => self.show_todo_list(),
            "pause" => self.coordinator.pause_execution(),
            "resume" => self.coordinator.resume_execution(),
            "stop" => self.coordinator.stop_execution(),
            "cancel" => self.coordinator.cancel_execution(),
            "history" => self.show_conversation_history(),
            "exit" | "quit" | "q" => self.running = false,
            "gemini" | "claude" | "chatgpt" | "mistral" => {
                self.switch_provider(command).await;
            }
            _ if command == "do" || command.starts_with("do ") => {
                self.handle_do_command(command[2..].trim_start()).await;
            }
            _ if command == "session" || command.starts_with("session ") => {
                self.handle_session_command(command[7..].trim_start());
            }
            other => {
                self.print_colored(&format!("Unknown command: /{}", other), "33");
                println!("\nType '/help' for available commands.");
            }
        }
    }

    async fn handle_do_command(&mut self, args: &str) {
        match parse_do_args(args) {
            Ok(DoCommand::All) => self.coordinator.execute_all().await,
            Ok(DoCommand::Next) => {
                self.coordinator.execute_next().await;
            }
            Ok(DoCommand::Until(id)) => self.coordinator.execute_until(id).await,
            Ok(DoCommand::Range(start, end)) => {
                self.coordinator.execute_range(start, end).await
            }
            Ok(DoCommand::Single(id)) => match self.coordinator.execute_single(id).await {
                Ok(title) => {
                    self.print_colored(&format!("Completed: {}", title), "32");
                    println!();
                }
                Err(e) => {
                    self.print_colored(&format!("Do error: {}", e), "31");
                    println!();
                }
            },
            Err(usage) => {
                self.print_colored(&usage, "33");
                println!();
            }
        }
    }

    async fn switch_provider(&mut self, name: &str) {
        // flush the session so a crash mid-switch loses nothing
        if let Err(e) = self.conversation.save_to_disk() {
            tracing::warn!(error = %e, "failed to flush session before provider switch");
        }

        match self.coordinator.set_provider(name) {
            Ok(()) => {
                self.print_colored(&format!("Switched to provider: {}", name), "32");
                if !self.conversation.is_empty() {
                    print!(
                        " (maintaining conversation context with {} messages)",
                        self.conversation.message_count()
                    );
                }
                println!();
            }
            Err(e) => {
                self.print_colored(&format!("Error switching provider: {}", e), "31");
                println!();
            }
        }
    }

    fn handle_session_command(&mut self, args: &str) {
        let args = args.trim();

        if args.is_empty() || args == "list" {
            let sessions = self.conversation.available_sessions();
            self.print_colored("=== Available Conversation Sessions ===", "34");
            println!();
            if sessions.is_empty() {
                self.print_colored("No saved sessions found.", "33");
                println!();
                return;
            }
            for (index, session) in sessions.iter().take(10).enumerate() {
                print!("  {}. {}", index + 1, session);
                if session == self.conversation.session_id() {
                    self.print_colored(" (current)", "32");
                }
                println!();
            }
            if sessions.len() > 10 {
                println!("  ... and {} more", sessions.len() - 10);
            }
        } else if args == "new" {
            match self.conversation.start_new_session() {
                Ok(()) => {
                    self.print_colored(
                        &format!(
                            "Started new conversation session: {}",
                            self.conversation.session_id()
                        ),
                        "32",
                    );
                    println!();
                }
                Err(e) => {
                    self.print_colored(&format!("Session error: {}", e), "31");
                    println!();
                }
            }
        } else if let Some(session_id) = args.strip_prefix("load") {
            let session_id = session_id.trim();
            if session_id.is_empty() {
                self.print_colored("Usage: /session load <session_id>", "33");
                println!();
                return;
            }
            match self.conversation.load_session(session_id) {
                Ok(()) => {
                    self.print_colored(
                        &format!(
                            "Loaded session: {} ({} messages)",
                            session_id,
                            self.conversation.message_count()
                        ),
                        "32",
                    );
                    println!();
                }
                Err(e) => {
                    self.print_colored(&format!("Failed to load session: {}", e), "31");
                    println!();
                }
            }
        } else {
            self.print_colored("Unknown session command. Usage:", "33");
            println!();
            println!("  /session           - List available sessions");
            println!("  /session new       - Start a new session");
            println!("  /session load <id> - Load a specific session");
        }
    }

    fn show_welcome(&self) {
        self.print_colored("taskforge - AI-mediated command execution assistant", "34");
        println!();
        self.print_colored("Chat mode enabled with todo tool integration", "32");
        println!();
        println!("Type '/help' for commands, '/exit' to quit.");
        println!();
    }

    fn show_help(&self) {
        println!("\nAvailable commands:");
        println!("  /gemini, /claude, /chatgpt, /mistral  - Switch LLM provider");
        println!("  /todo                                 - Show todo list");
        println!("  /do [all|next|until N|N-M|N]          - Execute todos");
        println!("  /pause                                - Pause execution");
        println!("  /resume                               - Resume paused execution");
        println!("  /stop                                 - Stop execution");
        println!("  /cancel                               - Cancel execution");
        println!("  /status                               - Show system status");
        println!("  /debug                                - Show debug information");
        println!("  /history                              - Show conversation history");
        println!("  /session [list|new|load <id>]         - Manage sessions");
        println!("  /help, /h                             - Show this help");
        println!("  /exit, /quit, /q                      - Exit");
        println!("\nOr just type your request naturally:");
        println!("  \"create a hello world Python script\"");
        println!("  \"add unit tests for the calculator\"");
        println!();
    }

    fn show_status(&self) {
        println!("\n=== System Status ===");
        println!(
            "Mode: {}",
            if self.coordinator.chat_mode() {
                "chat with todo tool integration"
            } else {
                "plan"
            }
        );
        println!(
            "Provider: {} ({})",
            self.coordinator.provider_name(),
            self.coordinator.model_name()
        );
        println!("Session: {}", self.conversation.session_id());
        println!("Policy: {}/policy.json", crate::STATE_DIR);
        println!("Debug log: {}/debug.log", crate::STATE_DIR);

        let state = self.coordinator.execution_state();
        print!("Execution: ");
        match state {
            ExecutionState::Stopped => {
                self.print_colored(state.as_str(), "37");
                println!("\nUse /do to start running todos");
            }
            ExecutionState::Running => {
                self.print_colored(state.as_str(), "32");
                println!("\nUse /pause, /stop, or /cancel to control");
            }
            ExecutionState::Paused => {
                self.print_colored(state.as_str(), "33");
                println!("\nUse /resume to continue or /stop to stop");
            }
            ExecutionState::Cancelled => {
                self.print_colored(state.as_str(), "31");
                println!("\nUse /do to start a new execution");
            }
        }
        println!();
    }

    fn show_debug(&self) {
        println!("\n=== Debug Information ===");
        println!("Debug log: {}/debug.log", crate::STATE_DIR);
        println!("Policy file: {}/policy.json", crate::STATE_DIR);
        println!("History file: {}/history", crate::STATE_DIR);
        println!(
            "Conversations: {}/conversations/ ({} stored)",
            crate::STATE_DIR,
            self.conversation.available_sessions().len()
        );
        println!();
    }

    fn show_todo_list(&self) {
        let todos = self.coordinator.todos().list(true);

        println!("\n=== Todo List ===");
        if todos.is_empty() {
            println!("No todos yet.");
        } else {
            for todo in todos {
                let (icon, color) = match todo.status {
                    TodoStatus::Pending => ("⏳", "33"),
                    TodoStatus::InProgress => ("🔄", "36"),
                    TodoStatus::Completed => ("✅", "32"),
                };
                self.print_colored(&format!("{} {}: {}", icon, todo.id, todo.title), color);
                println!();
                if !todo.description.is_empty() {
                    println!("   {}", todo.description);
                }
            }
        }
        println!();
    }

    fn show_conversation_history(&self) {
        let history = self.conversation.history();

        if history.is_empty() {
            self.print_colored("No conversation history available.", "33");
            println!();
            return;
        }

        self.print_colored("=== Conversation History ===", "34");
        println!(" (Session: {})", self.conversation.session_id());

        let tail_start = history.len().saturating_sub(5);
        for (index, msg) in history.iter().enumerate() {
            match msg.role {
                Role::User => self.print_colored("User", "36"),
                Role::Assistant => {
                    self.print_colored("Assistant", "32");
                    if let Some(provider) = &msg.provider {
                        print!(" ({})", provider);
                    }
                }
                Role::System => self.print_colored("System", "35"),
            }
            println!(": {}", msg.content);
            if index >= tail_start || history.len() <= 10 {
                println!("  {}", msg.timestamp);
            }
            println!();
        }

        println!("Total messages: {}", history.len());
    }

    fn prompt(&self) -> String {
        if self.use_colors {
            "\x1b[1;35mtaskforge>\x1b[0m ".to_string()
        } else {
            "taskforge> ".to_string()
        }
    }

    fn print_colored(&self, text: &str, color: &str) {
        if self.use_colors {
            print!("\x1b[{}m{}\x1b[0m", color, text);
        } else {
            print!("{}", text);
        }
    }
}
