//! The coordinator: binds policy, todos, model client and executors, owns
//! the execution state machine, and routes each operation to the right
//! executor.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use taskforge_executor::{CommandResult, CommandRunner, ExecutorError, FileWriter};
use taskforge_memory::Message;
use taskforge_policy::{CrudOp, PolicyEngine, FILE_TOOL};
use taskforge_tasks::{TodoItem, TodoStatus, TodoStore};

use crate::controls::{ExecutionControls, ExecutionState};
use crate::error::CoreError;
use crate::model_client::ModelBackend;
use crate::routing;
use crate::types::Operation;

const PAUSE_POLL_MS: u64 = 100;

/// Blocking confirmation input. The REPL supplies a stdin-backed
/// implementation; tests script it.
pub trait Prompter: Send {
    fn confirm(&mut self, question: &str) -> std::io::Result<String>;
}

pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn confirm(&mut self, question: &str) -> std::io::Result<String> {
        print!("{}", question);
        std::io::stdout().flush()?;
        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        Ok(input.trim().to_string())
    }
}

/// Map a user-facing provider name to the internal adapter name.
pub fn resolve_provider_name(friendly: &str) -> &str {
    match friendly {
        "claude" => "anthropic",
        "chatgpt" => "openai",
        other => other,
    }
}

pub struct Coordinator {
    policy: PolicyEngine,
    pub(crate) todos: TodoStore,
    model: Box<dyn ModelBackend>,
    file_writer: FileWriter,
    runner: CommandRunner,
    controls: Arc<ExecutionControls>,
    prompter: Box<dyn Prompter>,
    chat_mode: bool,
    always_approve: bool,
    autonomous_execution: bool,
}

impl Coordinator {
    pub fn new(
        model: Box<dyn ModelBackend>,
        policy: PolicyEngine,
        prompter: Box<dyn Prompter>,
    ) -> Self {
        let workdir = policy.workdir().to_path_buf();
        Self {
            policy,
            todos: TodoStore::new(),
            model,
            file_writer: FileWriter::new(),
            runner: CommandRunner::new(workdir),
            controls: Arc::new(ExecutionControls::new()),
            prompter,
            chat_mode: true,
            always_approve: false,
            autonomous_execution: true,
        }
    }

    pub fn todos(&self) -> &TodoStore {
        &self.todos
    }

    pub fn todos_mut(&mut self) -> &mut TodoStore {
        &mut self.todos
    }

    pub fn policy(&self) -> &PolicyEngine {
        &self.policy
    }

    pub fn controls(&self) -> Arc<ExecutionControls> {
        Arc::clone(&self.controls)
    }

    pub fn execution_state(&self) -> ExecutionState {
        self.controls.state()
    }

    pub fn provider_name(&self) -> String {
        self.model.provider_name()
    }

    pub fn model_name(&self) -> String {
        self.model.model_name()
    }

    pub fn chat_mode(&self) -> bool {
        self.chat_mode
    }

    pub fn set_chat_mode(&mut self, enabled: bool) {
        self.chat_mode = enabled;
    }

    pub fn always_approve(&self) -> bool {
        self.always_approve
    }

    pub fn set_autonomous_execution(&mut self, enabled: bool) {
        self.autonomous_execution = enabled;
    }

    pub(crate) fn autonomous_execution(&self) -> bool {
        self.autonomous_execution
    }

    /// Switch the model backend mid-session. The conversation history lives
    /// with the caller and is unaffected.
    pub fn set_provider(&mut self, friendly_name: &str) -> Result<(), CoreError> {
        let internal = resolve_provider_name(friendly_name);
        self.model.set_provider(internal, None)?;
        Ok(())
    }

    /// One user turn. In chat mode returns the interpreted reply for the
    /// caller to store; in plan mode runs the confirmation flow and returns
    /// `None`.
    pub async fn run(&mut self, user_text: &str) -> Result<Option<String>, CoreError> {
        if self.chat_mode {
            let reply = self.model.chat(user_text).await?;
            let interpreted = self.interpret_response(&reply).await;
            println!("{}", interpreted.text);
            if interpreted.mutated {
                self.suggest_execution();
            }
            return Ok(Some(interpreted.text));
        }

        if let Err(e) = self.plan_and_apply(user_text, true).await {
            self.report_error(&e);
        }
        Ok(None)
    }

    /// Like [`Coordinator::run`], threading the session history through the
    /// model call.
    pub async fn run_with_history(
        &mut self,
        user_text: &str,
        history: &[Message],
    ) -> Result<Option<String>, CoreError> {
        if !self.chat_mode {
            return self.run(user_text).await;
        }

        let reply = self.model.chat_with_history(history).await?;
        let interpreted = self.interpret_response(&reply).await;
        println!("{}", interpreted.text);
        if interpreted.mutated {
            self.suggest_execution();
        }
        Ok(Some(interpreted.text))
    }

    /// Plan-mode pipeline: plan, validate, policy-check, dry-run, confirm,
    /// apply.
    async fn plan_and_apply(
        &mut self,
        prompt: &str,
        require_confirmation: bool,
    ) -> Result<(), CoreError> {
        let plan = self.model.plan(prompt).await?;
        println!("Model proposed: {} {}", plan.command, plan.path);

        if plan.path.is_empty() {
            return Err(CoreError::Parse {
                provider: self.model.provider_name(),
                message: "model returned an empty file path".to_string(),
            });
        }
        if plan.command != "WriteFile" {
            return Err(CoreError::Parse {
                provider: self.model.provider_name(),
                message: format!("unsupported command: {}", plan.command),
            });
        }

        let operation = Operation::WriteFile {
            path: plan.path,
            content: plan.content,
            request_execution: plan.request_execution,
        };
        self.perform(operation, require_confirmation).await
    }

    /// Execute a validated operation: policy gate, then the executor for its
    /// variant. Confirmation applies to file writes only.
    async fn perform(
        &mut self,
        operation: Operation,
        require_confirmation: bool,
    ) -> Result<(), CoreError> {
        self.check_operation(&operation)?;
        tracing::debug!(operation = %operation.summary(), "performing operation");

        match operation {
            Operation::WriteFile { path, content, .. } => {
                let dry_run = self.file_writer.dry_run(&path, &content);
                if !dry_run.success {
                    return Err(CoreError::Io(format!(
                        "Dry run failed: {}",
                        dry_run.error_message
                    )));
                }
                println!("{}", dry_run.description);

                if require_confirmation && !self.always_approve && !self.confirm_apply()? {
                    println!("Operation cancelled by user.");
                    return Ok(());
                }

                let applied = self.file_writer.apply(&path, &content);
                if !applied.success {
                    return Err(CoreError::Io(applied.error_message));
                }

                println!("{}", applied.description);
                if !applied.context.working_directory_after.is_empty() {
                    tracing::debug!(
                        cwd = %applied.context.working_directory_after,
                        "apply finished"
                    );
                }
                Ok(())
            }
            Operation::ShellCommand {
                command,
                working_directory,
                ..
            } => {
                println!("Shell command: {}", command);
                let result = self
                    .runner
                    .execute(
                        &command,
                        working_directory.as_deref().map(std::path::Path::new),
                        None,
                    )
                    .await
                    .map_err(|e| match e {
                        ExecutorError::Blocked(reason) => CoreError::PolicyDenial(reason),
                        other => CoreError::Io(other.to_string()),
                    })?;

                display_command_result(&result);
                if !result.success {
                    return Err(CoreError::Io(format!(
                        "Command failed with exit code {}",
                        result.exit_code
                    )));
                }
                Ok(())
            }
        }
    }

    /// Policy gate shared by both operation variants.
    fn check_operation(&self, operation: &Operation) -> Result<(), CoreError> {
        match operation {
            Operation::WriteFile { path, content, .. } => {
                if !self.policy.allowed(FILE_TOOL, CrudOp::Create, path) {
                    return Err(CoreError::PolicyDenial(format!(
                        "File path '{}' is not allowed.",
                        path
                    )));
                }
                if !self.policy.file_size_allowed(content.len() as u64) {
                    return Err(CoreError::PolicyDenial(format!(
                        "File content exceeds the configured size limit ({} bytes).",
                        content.len()
                    )));
                }
                Ok(())
            }
            Operation::ShellCommand { command, .. } => {
                let verdict = self.policy.command_allowed(command);
                tracing::debug!(command = %command, allowed = verdict.is_allowed(), "policy verdict");
                if !verdict.is_allowed() {
                    return Err(CoreError::PolicyDenial(format!(
                        "{} (command: {})",
                        verdict.reason(),
                        command
                    )));
                }
                Ok(())
            }
        }
    }

    /// `a`/`A` arms always-approve and confirms; `y`/`Y` confirms once;
    /// anything else cancels.
    fn confirm_apply(&mut self) -> Result<bool, CoreError> {
        let input = self
            .prompter
            .confirm("Apply this change? [y)es/n)o/a)lways]: ")?;

        match input.chars().next() {
            Some('a') | Some('A') => {
                self.always_approve = true;
                println!("Always approve mode enabled. Future changes apply automatically.");
                Ok(true)
            }
            Some('y') | Some('Y') => Ok(true),
            _ => Ok(false),
        }
    }

    // --- todo execution -------------------------------------------------

    pub async fn execute_all(&mut self) {
        let queue = self.todos.execution_queue();
        self.run_batch(queue).await;
    }

    pub async fn execute_until(&mut self, stop_id: u64) {
        let queue = self.todos.until(stop_id);
        if queue.is_empty() {
            println!("No todos to execute until ID {}.", stop_id);
            return;
        }
        self.run_batch(queue).await;
    }

    pub async fn execute_range(&mut self, start_id: u64, end_id: u64) {
        let queue = self.todos.range(start_id, end_id);
        if queue.is_empty() {
            println!("No todos found in range [{}, {}].", start_id, end_id);
            return;
        }
        self.run_batch(queue).await;
    }

    /// Execute the next pending todo. Returns its title on success.
    pub async fn execute_next(&mut self) -> Option<String> {
        let Some(item) = self.todos.next_pending().cloned() else {
            println!("No pending todos to execute.");
            return None;
        };

        println!("Executing next todo: {}", item.title);
        self.todos.mark_in_progress(item.id);
        match self.execute_item(&item).await {
            Ok(()) => {
                self.todos.mark_completed(item.id);
                println!("Completed: {}", item.title);
                Some(item.title)
            }
            Err(e) => {
                self.report_error(&e);
                println!("Failed: {}", item.title);
                None
            }
        }
    }

    /// Execute one specific pending todo by id. Completion is conditional on
    /// executor success.
    pub async fn execute_single(&mut self, id: u64) -> Result<String, CoreError> {
        let item = match self.todos.get(id) {
            Some(item) if item.status == TodoStatus::Pending => item.clone(),
            _ => {
                return Err(CoreError::InvalidArgument(format!(
                    "Todo ID {} not found or not pending",
                    id
                )))
            }
        };

        self.todos.mark_in_progress(item.id);
        match self.execute_item(&item).await {
            Ok(()) => {
                self.todos.mark_completed(item.id);
                Ok(item.title)
            }
            Err(e) => Err(e),
        }
    }

    /// The batch loop. Stops on the first item failure; remaining items stay
    /// pending. Control flags are observed between items and inside the
    /// pause wait.
    async fn run_batch(&mut self, items: Vec<TodoItem>) {
        if items.is_empty() {
            println!("No pending todos to execute.");
            return;
        }

        self.controls.begin_run();
        println!("Executing {} todo(s)...", items.len());
        println!("Use /pause, /stop, or /cancel to control execution.");

        for item in items {
            if self.wait_or_stop().await {
                println!("Execution interrupted. Remaining todos are still pending.");
                break;
            }

            println!("--- Executing: {} ---", item.title);
            self.todos.mark_in_progress(item.id);

            match self.execute_item(&item).await {
                Ok(()) => {
                    self.todos.mark_completed(item.id);
                    println!("Completed: {}", item.title);
                }
                Err(e) => {
                    // the failed item stays in-progress so it is visible
                    self.report_error(&e);
                    println!("Failed: {}", item.title);
                    break;
                }
            }
        }

        self.controls.finish_run();
    }

    /// Poll the control flags; true means the loop must exit. Inside a pause
    /// the wait re-evaluates on a short bounded sleep.
    async fn wait_or_stop(&self) -> bool {
        loop {
            if self.controls.should_stop() {
                return true;
            }
            if !self.controls.should_pause() {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(PAUSE_POLL_MS)).await;
        }
    }

    /// Route one todo to the right executor.
    pub(crate) async fn execute_item(&mut self, item: &TodoItem) -> Result<(), CoreError> {
        let prompt = item.prompt_text();
        let as_shell = routing::is_shell_item(&prompt);
        tracing::debug!(todo = item.id, as_shell, prompt = %prompt, "routing todo");

        if as_shell {
            self.execute_item_as_command(&prompt).await
        } else {
            self.plan_and_apply(&prompt, false).await
        }
    }

    async fn execute_item_as_command(&mut self, prompt: &str) -> Result<(), CoreError> {
        let command = routing::extract_command(prompt);
        if command.is_empty() {
            return Err(CoreError::InvalidArgument(format!(
                "Could not determine a command from: {}",
                prompt
            )));
        }

        let operation = Operation::ShellCommand {
            command,
            working_directory: None,
            description: prompt.to_string(),
            request_execution: true,
        };
        self.perform(operation, false).await
    }

    // --- control --------------------------------------------------------

    pub fn pause_execution(&self) {
        if self.controls.request_pause() {
            println!("Execution paused. Use /resume to continue or /stop to stop.");
        } else {
            println!("No execution in progress to pause.");
        }
    }

    pub fn resume_execution(&self) {
        if self.controls.request_resume() {
            println!("Execution resumed.");
        } else {
            println!("No paused execution to resume.");
        }
    }

    pub fn stop_execution(&self) {
        if self.controls.request_stop() {
            println!("Execution stopped. Remaining todos are still pending.");
        } else {
            println!("No execution in progress to stop.");
        }
    }

    pub fn cancel_execution(&self) {
        if self.controls.request_cancel() {
            println!("Execution cancelled. Remaining todos are still pending.");
        } else {
            println!("No execution in progress to cancel.");
        }
    }

    // --- reporting ------------------------------------------------------

    pub(crate) fn suggest_execution(&self) {
        let pending = self.todos.count_pending();
        if pending > 0 {
            println!(
                "Suggestion: you have {} pending todo(s). Use '/do next' to execute the next one, or '/do all' for everything.",
                pending
            );
        }
    }

    fn report_error(&self, error: &CoreError) {
        match error {
            // the Display form already carries the "Policy Denied" prefix
            CoreError::PolicyDenial(_) => println!("{}", error),
            other => println!("Error: {}", other),
        }
    }
}

fn display_command_result(result: &CommandResult) {
    if result.success {
        println!("Command succeeded (exit code: {})", result.exit_code);
        if !result.stdout.is_empty() {
            println!("Output:\n{}", result.stdout);
        }
    } else {
        println!("Command failed (exit code: {})", result.exit_code);
        if !result.stderr.is_empty() {
            println!("Error output:\n{}", result.stderr);
        }
        if !result.stdout.is_empty() {
            println!("Standard output:\n{}", result.stdout);
        }
    }
    if !result.working_directory_after.is_empty() {
        println!("Working directory: {}", result.working_directory_after);
    }
}
