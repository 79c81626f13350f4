//! Text → command classification. Pure: no transport or storage types.

use url::Url;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Save { url: String },
    Random,
    Help,
    Start,
    Unknown,
}

pub fn interpret(text: &str) -> Command {
    let text = text.trim();
    if text.is_empty() {
        return Command::Unknown;
    }

    if let Some(name) = command_name(text) {
        return match name.as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "rnd" => Command::Random,
            _ => Command::Unknown,
        };
    }

    if is_url(text) {
        return Command::Save {
            url: text.to_string(),
        };
    }

    Command::Unknown
}

/// Name of a bare `/command` (optionally `/command@botname`), lowercased.
/// Commands with arguments are not part of the grammar.
fn command_name(text: &str) -> Option<String> {
    let rest = text.strip_prefix('/')?;
    if rest.contains(char::is_whitespace) {
        return Some(String::new());
    }
    let name = rest.split('@').next().unwrap_or("");
    Some(name.to_lowercase())
}

/// Absolute URL with a host. `mailto:` and friends don't count.
fn is_url(text: &str) -> bool {
    if text.contains(char::is_whitespace) {
        return false;
    }
    Url::parse(text)
        .map(|u| u.host_str().is_some_and(|h| !h.is_empty()))
        .unwrap_or(false)
}
