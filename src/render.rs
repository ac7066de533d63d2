//! Terminal rendering of replies, tool results and chat listings.

use crate::tools::github::GitHubResult;
use crate::tools::wikipedia::WikipediaResult;
use crate::tools::{ToolOutput, ToolRegistry};
use crate::types::{AgentResponse, ChatRecord, Role, StoredMessage};
use colored::Colorize;
use std::fmt::Write;

/// Longest web client body shown inline.
const MAX_BODY_PREVIEW: usize = 800;

fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

pub fn render_reply(response: &AgentResponse) -> String {
    let mut out = format!("{} {}\n", "aloo>".cyan().bold(), response.text);
    if let Some(output) = &response.tool_output {
        out.push_str(&render_tool_output(output));
    }
    out
}

/// Compact card for a tool result.
pub fn render_tool_output(output: &ToolOutput) -> String {
    let mut out = String::new();
    let header = format!("[{}]", output.tool_name()).dimmed();

    match output {
        ToolOutput::Weather(w) => {
            let _ = writeln!(out, "  {} Weather in {} ({})", header, w.location.bold(), w.country);
            let _ = writeln!(
                out,
                "    {}°C, feels like {}°C, {}",
                w.temperature, w.feels_like, w.description
            );
            let _ = writeln!(
                out,
                "    humidity {}%  wind {} m/s  pressure {} hPa",
                w.humidity, w.wind_speed, w.pressure
            );
        }
        ToolOutput::Github(GitHubResult::RepositorySearch {
            total_count,
            repositories,
        }) => {
            let _ = writeln!(out, "  {} {} repositories", header, total_count);
            for repo in repositories {
                let _ = writeln!(
                    out,
                    "    {} ★{} {}",
                    repo.full_name.bold(),
                    repo.stars,
                    repo.language.as_deref().unwrap_or("")
                );
            }
        }
        ToolOutput::Github(GitHubResult::Repository(repo)) => {
            let _ = writeln!(
                out,
                "  {} {} ★{} forks {}",
                header,
                repo.full_name.bold(),
                repo.stars,
                repo.forks
            );
            if let Some(desc) = &repo.description {
                let _ = writeln!(out, "    {}", desc);
            }
            if !repo.topics.is_empty() {
                let _ = writeln!(out, "    topics: {}", repo.topics.join(", "));
            }
            let _ = writeln!(out, "    {}", repo.url.underline());
        }
        ToolOutput::Github(GitHubResult::UserSearch { total_count, users }) => {
            let _ = writeln!(out, "  {} {} users", header, total_count);
            for user in users {
                let _ = writeln!(out, "    {} {}", user.login.bold(), user.url.dimmed());
            }
        }
        ToolOutput::Github(GitHubResult::User(user)) => {
            let _ = writeln!(
                out,
                "  {} {} ({})",
                header,
                user.login.bold(),
                user.name.as_deref().unwrap_or("no name")
            );
            let _ = writeln!(
                out,
                "    repos {}  followers {}  following {}",
                user.public_repos, user.followers, user.following
            );
        }
        ToolOutput::Wikipedia(WikipediaResult::Found(article)) => {
            let _ = writeln!(out, "  {} {}", header, article.title.bold());
            let _ = writeln!(out, "    {}", article.summary);
            let _ = writeln!(out, "    {}", article.url.underline());
        }
        ToolOutput::Wikipedia(WikipediaResult::NotFound { message, .. }) => {
            let _ = writeln!(out, "  {} {}", header, message);
        }
        ToolOutput::Giphy(result) => {
            if result.gifs.is_empty() {
                let _ = writeln!(out, "  {} no {}s for \"{}\"", header, result.kind, result.query);
            }
            for gif in &result.gifs {
                let _ = writeln!(out, "  {} {} {}", header, gif.title, gif.gif_url.underline());
            }
        }
        ToolOutput::Webclient(x) => {
            let status = format!("{} {}", x.status, x.status_text);
            let status = if x.is_success() { status.green() } else { status.red() };
            let _ = writeln!(
                out,
                "  {} {} {} -> {} ({} ms)",
                header, x.method, x.url, status, x.response_time
            );
            if let Some(err) = &x.error {
                let _ = writeln!(out, "    {}", err.red());
            }
            if !x.data.is_null() {
                let body = match &x.data {
                    serde_json::Value::String(s) => s.clone(),
                    other => serde_json::to_string_pretty(other).unwrap_or_default(),
                };
                let _ = writeln!(out, "    {}", preview(&body, MAX_BODY_PREVIEW));
            }
        }
    }
    out
}

/// Tool catalog with credential status.
pub fn render_tool_catalog(registry: &ToolRegistry) -> String {
    let mut out = String::new();
    for tool in registry.iter() {
        let desc = tool.descriptor();
        let status = if tool.is_configured() {
            "ready".green()
        } else {
            "not configured".yellow()
        };
        let _ = writeln!(out, "{} [{}]", desc.name.bold(), status);
        let _ = writeln!(out, "  {}", desc.description);
        for (name, note) in desc.parameters {
            let _ = writeln!(out, "    {}: {}", name, note.dimmed());
        }
    }
    out
}

pub fn render_chat_list(chats: &[ChatRecord]) -> String {
    if chats.is_empty() {
        return format!("{}\n", "No chats yet.".dimmed());
    }
    let mut out = String::new();
    for chat in chats {
        let _ = writeln!(
            out,
            "{}  {}  {} ({} messages)",
            chat.id.dimmed(),
            chat.updated_at.format("%Y-%m-%d %H:%M"),
            chat.title.bold(),
            chat.messages.len()
        );
    }
    out
}

fn render_message(message: &StoredMessage) -> String {
    let label = match message.role {
        Role::User => "you>".green().bold(),
        Role::Bot => "aloo>".cyan().bold(),
    };
    let mut out = format!("{} {}\n", label, message.text);
    if let Some(output) = &message.tool_output {
        out.push_str(&render_tool_output(output));
    }
    out
}

pub fn render_chat(chat: &ChatRecord) -> String {
    let mut out = format!("{}\n\n", chat.title.bold().underline());
    for message in &chat.messages {
        out.push_str(&render_message(message));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::webclient::HttpExchange;
    use crate::tools::weather::{Coordinates, WeatherReport};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn weather() -> ToolOutput {
        ToolOutput::Weather(WeatherReport {
            location: "Paris".into(),
            country: "FR".into(),
            coordinates: Coordinates { lat: 48.85, lon: 2.35 },
            temperature: 18,
            feels_like: 17,
            description: "light rain".into(),
            humidity: 60,
            wind_speed: 3.5,
            pressure: 1012,
            icon: "10d".into(),
            full_location_name: "Paris, France".into(),
        })
    }

    #[test]
    fn reply_includes_tool_card() {
        let text = render_reply(&AgentResponse {
            text: "It's 18°C in Paris.".into(),
            tool_output: Some(weather()),
        });
        assert!(text.contains("It's 18°C in Paris."));
        assert!(text.contains("18°C, feels like 17°C, light rain"));
    }

    #[test]
    fn webclient_body_is_previewed() {
        let exchange = ToolOutput::Webclient(HttpExchange {
            status: 0,
            status_text: "Timeout".into(),
            data: json!("x".repeat(2000)),
            headers: BTreeMap::new(),
            response_time: 100,
            error: Some("Request timed out after 100ms".into()),
            url: "https://example.com/".into(),
            method: "GET".into(),
            truncated: false,
        });
        let text = render_tool_output(&exchange);
        assert!(text.contains("Request timed out after 100ms"));
        assert!(text.contains(&format!("{}…", "x".repeat(MAX_BODY_PREVIEW))));
        assert!(!text.contains(&"x".repeat(MAX_BODY_PREVIEW + 1)));
    }

    #[test]
    fn empty_chat_list_has_placeholder() {
        assert!(render_chat_list(&[]).contains("No chats yet."));
    }
}
