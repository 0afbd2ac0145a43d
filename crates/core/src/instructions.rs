//! Policy-aware system instructions for plan and chat mode.

use taskforge_policy::{CrudOp, PolicyEngine, COMMAND_TOOL, FILE_TOOL};

/// Instruction for plan mode: the model must answer with exactly one JSON
/// command object, constrained by the active policy.
pub fn plan_instruction(policy: &PolicyEngine) -> String {
    let mut prompt = String::from(
        "You are an assistant that converts user requests into a single, specific JSON command. \
         Respond with a JSON object only; no conversational text and no markdown fences.\n\n\
         You can use TWO types of commands:\n\
         1. \"WriteFile\" - for creating or editing files\n\
         2. \"BashCommand\" - for executing shell commands\n\n",
    );

    push_policy_constraints(&mut prompt, policy);

    prompt.push_str(
        "JSON FORMAT:\n\n\
         For WriteFile commands:\n\
         {\"command\": \"WriteFile\", \"path\": \"relative/path/to/file\", \"content\": \"file content\"}\n\n\
         For BashCommand commands:\n\
         {\"command\": \"BashCommand\", \"bash_command\": \"the shell command\", \"description\": \"what it does\"}\n\n\
         For BashCommand, 'bash_command' must be the EXACT command to execute, not a description.",
    );

    prompt
}

/// Instruction for chat mode: conversational, with the named todo operations
/// the response interpreter recognizes.
pub fn chat_instruction(policy: &PolicyEngine) -> String {
    let mut prompt = String::from(
        "You are taskforge, an assistant that manages a todo list while chatting. \
         You are in CHAT MODE: converse naturally AND queue work as todos.\n\n",
    );

    push_policy_constraints(&mut prompt, policy);

    prompt.push_str(
        "AVAILABLE TOOLS (use the literal call syntax in your reply for them to take effect):\n\
         - add_todo(\"title\", \"description\"): queue a todo\n\
         - <TODO_SEPARATOR> blocks with Title:/Description: lines, for content containing quotes or newlines\n\
         - list_todos(): render the current todo list\n\
         - mark_complete(id): mark a todo done\n\
         - delete_todo(id): remove a todo\n\
         - execute_next() / execute_all() / execute_todo(id): run queued todos autonomously\n\
         - request_user_approval(\"reason\"): pause and hand control back to the user\n\n\
         GUIDELINES:\n\
         - For bash todos use EXACT commands ('python3 src/app.py', not 'run the Python app')\n\
         - For 'create and execute' requests queue two todos: the file write, then the exact command\n\
         - Use request_user_approval when an operation may be risky or the intent is unclear\n\
         - The user drives execution with /do commands; never emit /do yourself\n",
    );

    prompt
}

fn push_policy_constraints(prompt: &mut String, policy: &PolicyEngine) {
    let allowed_dirs = policy.allowed_directories(FILE_TOOL, CrudOp::Create);
    if !allowed_dirs.is_empty() {
        prompt.push_str("POLICY CONSTRAINTS:\n\nFILE OPERATIONS:\n");
        prompt.push_str(&format!(
            "- Files may ONLY be created in: {}\n",
            allowed_dirs.join(", ")
        ));
        prompt.push_str(
            "- Files in other directories are NOT allowed; suggest an alternative inside an allowed directory\n\n",
        );
    }

    if let Some(command_policy) = policy.operation_policy(COMMAND_TOOL, CrudOp::Create) {
        prompt.push_str("SHELL COMMANDS:\n");
        if !command_policy.allowed_commands.is_empty() {
            prompt.push_str(&format!(
                "- Allowed commands: {}\n",
                command_policy.allowed_commands.join(", ")
            ));
        }
        if !command_policy.blocked_commands.is_empty() {
            prompt.push_str(&format!(
                "- Blocked commands: {}\n",
                command_policy.blocked_commands.join(", ")
            ));
        }
        prompt.push_str("- Commands run with a persistent working directory\n\n");
    }
}
