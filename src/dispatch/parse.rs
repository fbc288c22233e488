//! Command line recognition and routing
//!
//! A line is `<trigger> <tool> [arg...]`. The trigger is matched without case;
//! argument tokens get chat markup undone before validation.

use regex::Regex;

use crate::tools::{EXIT_WORD, ToolCatalog, ToolDefinition};

/// One inbound chat message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub text: String,
    pub channel: String,
    pub user: String,
    pub timestamp: String,
}

impl Invocation {
    pub fn new(
        text: impl Into<String>,
        channel: impl Into<String>,
        user: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            channel: channel.into(),
            user: user.into(),
            timestamp: timestamp.into(),
        }
    }
}

/// A recognized command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Second word, selects the tool
    pub tool_word: String,
    /// Normalized words after the tool word
    pub args: Vec<String>,
}

/// Where a command line goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route<'a> {
    Tool(&'a ToolDefinition),
    Exit(ExitRequest),
    Unrecognized(String),
}

/// Operator kill-switch parsed from `exit [code]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitRequest {
    /// `exit 0`
    Success,
    /// `exit <anything else>`
    Failure,
    /// `exit` with no code, or with extra words
    Farewell,
}

impl ExitRequest {
    pub fn code(&self) -> i32 {
        match self {
            Self::Success | Self::Farewell => 0,
            Self::Failure => 1,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Success => "exiting: success",
            Self::Failure => "exiting: failure",
            Self::Farewell => "My battery is low and it's getting dark.",
        }
    }
}

/// Recognizes lines addressed to the bot
#[derive(Debug, Clone)]
pub struct TriggerMatcher {
    pattern: Regex,
}

impl TriggerMatcher {
    pub fn new(trigger: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!("(?i)^{} .", regex::escape(trigger)))?;
        Ok(Self { pattern })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Split a matching line into tool word and normalized arguments
    pub fn parse(&self, text: &str) -> Option<CommandLine> {
        if !self.is_match(text) {
            return None;
        }
        let mut words = text.split_whitespace();
        words.next()?;
        let tool_word = words.next()?.to_string();
        let args = words.map(normalize_token).collect();
        Some(CommandLine { tool_word, args })
    }
}

/// Undo chat formatting: unwrap `<http...>` links and straighten smart quotes
pub fn normalize_token(token: &str) -> String {
    let unwrapped = match token.find("<http") {
        Some(start) => match token[start..].rfind('>') {
            Some(end) if end > 0 => format!(
                "{}{}{}",
                &token[..start],
                &token[start + 1..start + end],
                &token[start + end + 1..]
            ),
            _ => token.to_string(),
        },
        None => token.to_string(),
    };
    unwrapped
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}

/// Resolve the tool word against the catalog
pub fn route<'a>(catalog: &'a ToolCatalog, line: &CommandLine) -> Route<'a> {
    if let Some(tool) = catalog.lookup_tool(&line.tool_word) {
        return Route::Tool(tool);
    }
    if line.tool_word == EXIT_WORD {
        let request = match line.args.as_slice() {
            [code] if code == "0" => ExitRequest::Success,
            [_] => ExitRequest::Failure,
            _ => ExitRequest::Farewell,
        };
        return Route::Exit(request);
    }
    Route::Unrecognized(line.tool_word.clone())
}
