//! Chat commands.

use std::fmt;

/// Commands understood by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    /// Acknowledge and explain usage.
    Start,
    /// Request a manual cycle.
    Make,
    /// Report orchestrator status.
    Status,
}

impl BotCommand {
    /// Parse the leading command of a message.
    ///
    /// Accepts `/make`, `/make@some_bot` and trailing arguments; anything
    /// else is not a command.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        let name = word.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);

        match name.to_ascii_lowercase().as_str() {
            "start" | "help" => Some(Self::Start),
            "make" => Some(Self::Make),
            "status" => Some(Self::Status),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Make => "make",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for BotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(BotCommand::parse("/start"), Some(BotCommand::Start));
        assert_eq!(BotCommand::parse("/make"), Some(BotCommand::Make));
        assert_eq!(BotCommand::parse("  /status  "), Some(BotCommand::Status));
        assert_eq!(BotCommand::parse("/MAKE now please"), Some(BotCommand::Make));
    }

    #[test]
    fn test_parse_addressed_command() {
        assert_eq!(BotCommand::parse("/make@clipcast_bot"), Some(BotCommand::Make));
    }

    #[test]
    fn test_parse_rejects_other_text() {
        assert_eq!(BotCommand::parse("make"), None);
        assert_eq!(BotCommand::parse("/upload"), None);
        assert_eq!(BotCommand::parse(""), None);
        assert_eq!(BotCommand::parse("/"), None);
    }
}
