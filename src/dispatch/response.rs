//! Response formatting
//!
//! Decides how command output reaches the channel and renders the help block,
//! the verbose transcript and the audit line.

use std::path::{Path, PathBuf};

use crate::tools::{ResponseMode, ToolDefinition};

use super::builder::substitute_email;

/// Output longer than this many characters is uploaded as a file
pub const FILE_THRESHOLD: usize = 3500;

/// Audit lines are cut to this many characters
pub const AUDIT_LIMIT: usize = 1000;

/// How the output of one command is delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Posted to the whole channel
    Inline { text: String },
    /// Posted to the invoking user only, after the `ephemeral` notice
    Ephemeral { text: String },
    /// Written to `file_name` and uploaded to the channel
    File { file_name: String, contents: String },
}

impl Delivery {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Inline { .. } => "inline",
            Self::Ephemeral { .. } => "ephemeral",
            Self::File { .. } => "file",
        }
    }
}

/// Help text for a tool: name, allowed channels, description, help and parameters
pub fn help_block(tool: &ToolDefinition, allowed_channels: &[String]) -> String {
    let parameters: String = tool
        .parameters
        .iter()
        .map(|p| format!("\n{}: [{}{}]", p.name, p.allowed.join("|"), p.description))
        .collect();
    format!(
        "``` ====> {} [Allowed In: {}] <====\n{}\n{}{}```",
        tool.name,
        allowed_channels.join(", "),
        tool.description,
        tool.help,
        parameters
    )
}

/// Verbose record of a run: tool metadata, the command, then raw output
pub fn transcript(tool: &ToolDefinition, email: &str, display_command: &str, output: &str) -> String {
    let mut text = String::new();
    text.push_str(&format!(" ----> Param Name:        {}\n", tool.name));
    text.push_str(&format!(" ----> Param Description: {}\n", tool.description));
    text.push_str(&format!(" ----> Param Log:         {}\n", tool.log));
    text.push_str(&format!(" ----> Param Help:        {}\n", tool.help));
    text.push_str(&format!(" ----> Param Trigger:     {}\n", tool.trigger));
    text.push_str(&format!(" ----> Param Location:    {}\n", tool.location));
    let command = substitute_email(&tool.command_line(), email);
    text.push_str(&format!(" ----> Param Command:     {}\n", command));
    text.push_str(&format!(" ----> Param Ephemeral:   {}\n", tool.ephemeral));
    text.push_str(&format!(" ----> Param Response:    {}\n", tool.response.as_str()));
    text.push_str(&format!(" ----> Command:\n{}\n", display_command));
    text.push_str(output);
    text
}

/// Choose the delivery for `output`
pub fn plan(tool: &ToolDefinition, output: &str, transcript: &str, timestamp: &str) -> Delivery {
    let oversized = output.chars().count() > FILE_THRESHOLD;
    let text = match tool.response {
        ResponseMode::File => {
            return Delivery::File {
                file_name: output_file_name(timestamp),
                contents: transcript.to_string(),
            };
        }
        ResponseMode::Code => format!("```{}```", output),
        ResponseMode::Text => output.to_string(),
    };
    if oversized {
        Delivery::File {
            file_name: output_file_name(timestamp),
            contents: text,
        }
    } else if tool.ephemeral {
        Delivery::Ephemeral { text }
    } else {
        Delivery::Inline { text }
    }
}

pub fn output_file_name(timestamp: &str) -> String {
    format!("{}.txt", timestamp)
}

pub fn log_file_name(timestamp: &str) -> String {
    format!("chatops-log-{}.txt", timestamp)
}

/// Full path for a transcript file
pub fn file_path(dir: &Path, file_name: &str) -> PathBuf {
    dir.join(file_name)
}

/// Cut `text` to `limit` characters, the last three becoming `...`
pub fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let keep = if limit > 3 { limit - 3 } else { limit };
    let mut cut: String = text.chars().take(keep).collect();
    cut.push_str("...");
    cut
}

/// Line posted to the log channel
pub fn audit_line(app_name: &str, user_id: &str, channel: &str, text: &str) -> String {
    let cleaned = truncate(&text.replace('`', ""), AUDIT_LIMIT);
    format!("{} <@{}> <#{}> - {}", app_name, user_id, channel, cleaned)
}
