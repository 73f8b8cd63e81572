use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::api_connection::endpoints::RecipeId;

#[derive(Parser, Debug)]
#[command(author, version, about = "Chat with the recipe assistant from the terminal", long_about = None)]
pub struct Cli {
    /// API base URL (overrides RECIPE_CHAT_API_URL)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Per-request timeout in seconds (overrides RECIPE_CHAT_TIMEOUT_SECS)
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start an interactive conversation
    Chat {
        /// Write the conversation history as JSON here on exit
        #[arg(long)]
        transcript: Option<PathBuf>,
    },
    /// List recipes
    Recipes {
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        difficulty: Option<String>,
    },
    /// Show one recipe
    Recipe { id: RecipeId },
    /// Recipes that use the given ingredients
    Search {
        #[arg(required = true)]
        ingredients: Vec<String>,
        /// Dietary restriction, may be repeated
        #[arg(long = "restriction")]
        restrictions: Vec<String>,
    },
    /// Substitutes for an ingredient in a recipe
    Substitutions { id: RecipeId, ingredient: String },
    /// Per-serving nutrition for a recipe
    Nutrition { id: RecipeId },
    /// Check a recipe against a diet
    Diet { id: RecipeId, diet_type: String },
    /// Recipes carrying a tag
    Tag { tag: String },
    /// Daily nutrient needs for a body profile
    DailyNeeds {
        #[arg(long, default_value_t = 60.0)]
        weight: f64,
        #[arg(long, default_value_t = 170.0)]
        height: f64,
        #[arg(long, default_value_t = 30)]
        age: u32,
        #[arg(long, default_value = "female")]
        gender: String,
        #[arg(long, default_value = "moderate")]
        activity_level: String,
    },
    /// Dump a conversation's server-side history
    History { conversation_id: String },
    /// Check that the API is up
    Health,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

/// A line typed during `chat`: either a message or a `:`-prefixed command.
/// A message that itself starts with `:` is written with a doubled `::`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Message(String),
    /// `:expand N`, 1-based card number.
    Toggle(usize),
    /// `:ask N`, 1-based index into the quick questions.
    Ask(usize),
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_chat_input(line: &str) -> ChatInput {
    let trimmed = line.trim();
    let message = line.trim_end_matches(|c| c == '\r' || c == '\n');
    let Some(command) = trimmed.strip_prefix(':') else {
        return ChatInput::Message(message.to_string());
    };
    if command.starts_with(':') {
        return ChatInput::Message(message.trim_start().replacen("::", ":", 1));
    }

    let mut parts = command.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("q" | "quit" | "exit"), None) => ChatInput::Quit,
        (Some("h" | "help"), None) => ChatInput::Help,
        (Some("e" | "expand"), Some(n)) => match parse_index(n, parts.next()) {
            Some(n) => ChatInput::Toggle(n),
            None => ChatInput::Unknown(trimmed.to_string()),
        },
        (Some("a" | "ask"), Some(n)) => match parse_index(n, parts.next()) {
            Some(n) => ChatInput::Ask(n),
            None => ChatInput::Unknown(trimmed.to_string()),
        },
        _ => ChatInput::Unknown(trimmed.to_string()),
    }
}

fn parse_index(arg: &str, extra: Option<&str>) -> Option<usize> {
    if extra.is_some() {
        return None;
    }
    arg.parse::<usize>().ok().filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat_input() {
        assert_eq!(
            parse_chat_input("我有番茄和鸡蛋\n"),
            ChatInput::Message("我有番茄和鸡蛋".to_string())
        );
        assert_eq!(parse_chat_input(":quit"), ChatInput::Quit);
        assert_eq!(parse_chat_input("  :q "), ChatInput::Quit);
        assert_eq!(parse_chat_input(":expand 2"), ChatInput::Toggle(2));
        assert_eq!(parse_chat_input(":e 0"), ChatInput::Unknown(":e 0".to_string()));
        assert_eq!(parse_chat_input(":help"), ChatInput::Help);
        assert_eq!(parse_chat_input(":dance"), ChatInput::Unknown(":dance".to_string()));
    }

    #[test]
    fn test_ask_selects_quick_question() {
        assert_eq!(parse_chat_input(":ask 1"), ChatInput::Ask(1));
        assert_eq!(parse_chat_input(" :a 4\n"), ChatInput::Ask(4));
        assert_eq!(parse_chat_input(":ask 0"), ChatInput::Unknown(":ask 0".to_string()));
        assert_eq!(parse_chat_input(":ask x"), ChatInput::Unknown(":ask x".to_string()));
        assert_eq!(parse_chat_input(":ask"), ChatInput::Unknown(":ask".to_string()));
    }

    #[test]
    fn test_double_colon_sends_literal_colon() {
        assert_eq!(
            parse_chat_input("::) 我有鸡蛋\n"),
            ChatInput::Message(":) 我有鸡蛋".to_string())
        );
        assert_eq!(parse_chat_input("  ::quit"), ChatInput::Message(":quit".to_string()));
        assert_eq!(parse_chat_input("::"), ChatInput::Message(":".to_string()));
    }

    #[test]
    fn test_cli_parses_search() {
        let cli = Cli::try_parse_from([
            "recipe-chat",
            "--base-url",
            "http://localhost:9000",
            "search",
            "番茄",
            "鸡蛋",
            "--restriction",
            "素食",
        ])
        .unwrap();
        assert_eq!(cli.base_url.as_deref(), Some("http://localhost:9000"));
        match cli.command {
            Command::Search {
                ingredients,
                restrictions,
            } => {
                assert_eq!(ingredients, vec!["番茄", "鸡蛋"]);
                assert_eq!(restrictions, vec!["素食"]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_verifies() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
