//! The response interpreter: scans assistant text for the recognized
//! tool-invocation expressions, applies their side effects, and rewrites the
//! text into human-readable acknowledgements.
//!
//! Named expressions are matched with a small regex set and rewritten to a
//! fixpoint: after every substitution the scan restarts from the beginning
//! of the modified text so overlapping rewrites compose. The
//! `<TODO_SEPARATOR>` block is parsed with explicit string scanning because
//! its payload may contain quotes and newlines.

use regex::Regex;

use taskforge_tasks::TodoStatus;

use crate::coordinator::Coordinator;

const SEPARATOR: &str = "<TODO_SEPARATOR>";

struct Patterns {
    add_todo: Regex,
    list_todos: Regex,
    mark_complete: Regex,
    delete_todo: Regex,
    execute_next: Regex,
    execute_all: Regex,
    execute_todo: Regex,
    request_approval: Regex,
}

impl Patterns {
    fn new() -> Self {
        Self {
            add_todo: Regex::new(
                r#"add_todo\s*\(\s*['"](.*?)['"]\s*,\s*['"](.*?)['"]\s*\)"#,
            )
            .expect("add_todo pattern"),
            list_todos: Regex::new(r"list_todos\s*\(\s*\)").expect("list_todos pattern"),
            mark_complete: Regex::new(r"mark_complete\s*\(\s*(\d+)\s*\)")
                .expect("mark_complete pattern"),
            delete_todo: Regex::new(r"delete_todo\s*\(\s*(\d+)\s*\)")
                .expect("delete_todo pattern"),
            execute_next: Regex::new(r"execute_next\s*\(\s*\)").expect("execute_next pattern"),
            execute_all: Regex::new(r"execute_all\s*\(\s*\)").expect("execute_all pattern"),
            execute_todo: Regex::new(r"execute_todo\s*\(\s*(\d+)\s*\)")
                .expect("execute_todo pattern"),
            request_approval: Regex::new(
                r#"request_user_approval\s*\(\s*['"](.*?)['"]\s*\)"#,
            )
            .expect("request_user_approval pattern"),
        }
    }
}

/// Result of one interpretation pass: the rewritten text, and whether any
/// recognized operation actually ran.
pub struct Interpreted {
    pub text: String,
    pub mutated: bool,
}

impl Coordinator {
    /// Rewrite `text`, executing every recognized operation along the way.
    pub async fn interpret_response(&mut self, text: &str) -> Interpreted {
        let patterns = Patterns::new();
        let mut output = text.to_string();
        let mut mutated = false;

        // add_todo("title", "description")
        loop {
            let Some(captures) = patterns.add_todo.captures(&output) else {
                break;
            };
            let whole = captures.get(0).expect("match range").range();
            let title = captures[1].to_string();
            let description = captures[2].to_string();

            let replacement = match self.todos.add(&title, &description) {
                Ok(id) => {
                    tracing::debug!(id, title = %title, "todo added from response");
                    format!("**Added:** {}", title)
                }
                Err(e) => format!("**Error:** {}", e),
            };
            output.replace_range(whole, &replacement);
            mutated = true;
        }

        output = self.process_separator_blocks(&output, &mut mutated);

        // list_todos()
        loop {
            let Some(found) = patterns.list_todos.find(&output) else {
                break;
            };
            let range = found.range();
            let rendered = self.render_todo_list();
            output.replace_range(range, &rendered);
        }

        // mark_complete(id)
        loop {
            let Some(captures) = patterns.mark_complete.captures(&output) else {
                break;
            };
            let whole = captures.get(0).expect("match range").range();
            let id: u64 = captures[1].parse().unwrap_or(0);

            let replacement = if self.todos.mark_completed(id) {
                format!("**Completed:** Todo {}", id)
            } else {
                format!("**Error:** Todo {} not found", id)
            };
            output.replace_range(whole, &replacement);
            mutated = true;
        }

        // delete_todo(id)
        loop {
            let Some(captures) = patterns.delete_todo.captures(&output) else {
                break;
            };
            let whole = captures.get(0).expect("match range").range();
            let id: u64 = captures[1].parse().unwrap_or(0);

            let replacement = if self.todos.delete(id) {
                format!("**Deleted:** Todo {}", id)
            } else {
                format!("**Error:** Todo {} not found", id)
            };
            output.replace_range(whole, &replacement);
            mutated = true;
        }

        // execute_next()
        loop {
            let Some(found) = patterns.execute_next.find(&output) else {
                break;
            };
            let range = found.range();
            let replacement = self.autonomous_execute_next().await;
            output.replace_range(range, &replacement);
            mutated = true;
        }

        // execute_all()
        loop {
            let Some(found) = patterns.execute_all.find(&output) else {
                break;
            };
            let range = found.range();
            let replacement = self.autonomous_execute_all().await;
            output.replace_range(range, &replacement);
            mutated = true;
        }

        // execute_todo(id)
        loop {
            let Some(captures) = patterns.execute_todo.captures(&output) else {
                break;
            };
            let whole = captures.get(0).expect("match range").range();
            let id: u64 = captures[1].parse().unwrap_or(0);
            let replacement = self.autonomous_execute_todo(id).await;
            output.replace_range(whole, &replacement);
            mutated = true;
        }

        // request_user_approval("reason")
        loop {
            let Some(captures) = patterns.request_approval.captures(&output) else {
                break;
            };
            let whole = captures.get(0).expect("match range").range();
            let reason = captures[1].to_string();
            let replacement = format!(
                "**Requesting User Approval:** {}\n\nPaused here for your approval. Review the pending todos and use /do commands when ready.",
                reason
            );
            output.replace_range(whole, &replacement);
            mutated = true;
        }

        Interpreted {
            text: output,
            mutated,
        }
    }

    /// Scan for `<TODO_SEPARATOR>` blocks carrying `Title:` and
    /// `Description:` fields. Hand-rolled because the payload may contain
    /// quotes and newlines that defeat the expression patterns.
    fn process_separator_blocks(&mut self, text: &str, mutated: &mut bool) -> String {
        let mut output = text.to_string();
        let mut pos = 0;

        while let Some(found) = output[pos..].find(SEPARATOR) {
            let block_start = pos + found;
            let content_start = block_start + SEPARATOR.len();

            let Some(newline) = output[content_start..].find('\n') else {
                break;
            };
            let body_start = content_start + newline + 1;

            let closing = format!("\n{}", SEPARATOR);
            let Some(end) = output[body_start..].find(&closing) else {
                break;
            };
            let body_end = body_start + end;
            let block_end = body_end + closing.len();

            let body = &output[body_start..body_end];
            let title_pos = body.find("Title:");
            let desc_pos = body.find("Description:");

            match (title_pos, desc_pos) {
                (Some(title_pos), Some(desc_pos)) if title_pos < desc_pos => {
                    let title_text = &body[title_pos + "Title:".len()..];
                    let title = title_text
                        .lines()
                        .next()
                        .unwrap_or("")
                        .trim()
                        .to_string();
                    let description = body[desc_pos + "Description:".len()..].trim().to_string();

                    let replacement = match self.todos.add(&title, &description) {
                        Ok(id) => {
                            tracing::debug!(id, title = %title, "todo added from separator block");
                            format!("**Added:** {}", title)
                        }
                        Err(e) => format!("**Error:** {}", e),
                    };
                    output.replace_range(block_start..block_end, &replacement);
                    pos = block_start + replacement.len();
                    *mutated = true;
                }
                _ => {
                    // malformed block: leave it alone and continue past it
                    pos = block_end;
                }
            }
        }

        output
    }

    fn render_todo_list(&self) -> String {
        let todos = self.todos.list(true);
        let mut rendered = String::from("\n**Current Todos:**\n");

        if todos.is_empty() {
            rendered.push_str("- No todos yet\n");
            return rendered;
        }

        for todo in todos {
            let icon = match todo.status {
                TodoStatus::Pending => "⏳",
                TodoStatus::InProgress => "🔄",
                TodoStatus::Completed => "✅",
            };
            rendered.push_str(&format!("- {} {}: {}\n", icon, todo.id, todo.title));
            if !todo.description.is_empty() {
                rendered.push_str(&format!("  {}\n", todo.description));
            }
        }

        rendered
    }

    async fn autonomous_execute_next(&mut self) -> String {
        if !self.autonomous_execution() {
            return "**Autonomous execution is disabled**".to_string();
        }

        let Some(item) = self.todos.next_pending().cloned() else {
            return "**No pending todos to execute**".to_string();
        };

        self.todos.mark_in_progress(item.id);
        match self.execute_item(&item).await {
            Ok(()) => {
                self.todos.mark_completed(item.id);
                format!("**Executed:** {}", item.title)
            }
            Err(e) => format!("**Failed:** {} - {}", item.title, e),
        }
    }

    async fn autonomous_execute_all(&mut self) -> String {
        if !self.autonomous_execution() {
            return "**Autonomous execution is disabled**".to_string();
        }

        let queue = self.todos.execution_queue();
        let mut executed = 0usize;

        for item in queue {
            self.todos.mark_in_progress(item.id);
            match self.execute_item(&item).await {
                Ok(()) => {
                    self.todos.mark_completed(item.id);
                    executed += 1;
                }
                Err(e) => {
                    return format!(
                        "**Executed {} pending todos, then failed:** {} - {}",
                        executed, item.title, e
                    );
                }
            }
        }

        format!("**Executed {} pending todos**", executed)
    }

    async fn autonomous_execute_todo(&mut self, id: u64) -> String {
        if !self.autonomous_execution() {
            return "**Autonomous execution is disabled**".to_string();
        }

        let item = match self.todos.get(id) {
            Some(item) if item.status == TodoStatus::Pending => item.clone(),
            _ => return format!("**Error:** Todo {} not found or not pending", id),
        };

        self.todos.mark_in_progress(item.id);
        match self.execute_item(&item).await {
            Ok(()) => {
                self.todos.mark_completed(item.id);
                format!("**Executed:** {}", item.title)
            }
            Err(e) => format!("**Failed:** {} - {}", item.title, e),
        }
    }
}
