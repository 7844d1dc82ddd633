//! Terminal presentation: markup to ANSI, status lists, skins and hub updates.

use chrono::{DateTime, Local};
use mcdash_client::{HubSnapshot, HubUpdate, StatusReport};
use mcdash_net::format::{spans, strip};
use mcdash_net::{LogLine, PlayerDetail, SessionEvent, SkinBlock};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// Render markup with 24-bit ANSI colors.
pub fn ansi(text: &str) -> String {
    let mut out = String::new();
    for span in spans(text) {
        if span.text.is_empty() {
            continue;
        }
        let styled = span.bold || span.color.is_some();
        if span.bold {
            out.push_str(BOLD);
        }
        if let Some(color) = span.color {
            let [r, g, b] = color.rgb();
            out.push_str(&format!("\x1b[38;2;{r};{g};{b}m"));
        }
        out.push_str(&span.text);
        if styled {
            out.push_str(RESET);
        }
    }
    out
}

/// Markup as ANSI when `color` is set, otherwise with the codes removed.
pub fn markup(text: &str, color: bool) -> String {
    if color {
        ansi(text)
    } else {
        strip(text)
    }
}

fn dim(text: &str, color: bool) -> String {
    if color {
        format!("{DIM}{text}{RESET}")
    } else {
        text.to_string()
    }
}

pub fn status_lines(report: &StatusReport, color: bool) -> Vec<String> {
    let Some(status) = report.status() else {
        return vec!["Server offline".to_string()];
    };
    let mut lines = vec![format!("Players: {}", status.player_count_label())];
    for player in status.display_players() {
        let id = dim(&format!("#{}", player.id), color);
        lines.push(format!("  {} {id}", markup(&player.name, color)));
    }
    lines
}

/// 8x8 skin thumbnail, two terminal cells per pixel.
pub fn skin_lines(skin: &SkinBlock) -> Vec<String> {
    skin.rows()
        .map(|row| {
            let mut line = String::new();
            for [r, g, b] in row {
                line.push_str(&format!("\x1b[48;2;{r};{g};{b}m  "));
            }
            line.push_str(RESET);
            line
        })
        .collect()
}

/// Player header lines. The skin thumbnail needs color and is left out without it.
pub fn player_lines(detail: &PlayerDetail, online: bool, color: bool) -> Vec<String> {
    let mut lines = vec![markup(&detail.display, color)];
    if detail.show_account_name() {
        lines.push(format!("  account: {}", detail.name));
    }
    if let Some(version) = &detail.version {
        lines.push(format!("  version: {version}"));
    }
    lines.push(if online { "  online" } else { "  offline" }.to_string());
    if let Some(skin) = detail.skin.as_ref().filter(|_| color) {
        lines.extend(skin_lines(skin));
    }
    lines
}

pub fn log_line(line: &LogLine, at: DateTime<Local>, color: bool) -> String {
    let stamp = at.format("%H:%M:%S");
    let prefix = match &line.command {
        Some(command) => format!("[{stamp}] {command} >"),
        None => format!("[{stamp}]"),
    };
    format!("{} {}", dim(&prefix, color), markup(&line.text, color))
}

/// One line describing a hub update, or `None` for updates not worth printing.
pub fn update_line(update: &HubUpdate, at: DateTime<Local>, color: bool) -> Option<String> {
    let text = match update {
        HubUpdate::Connected => "connected to hub".to_string(),
        HubUpdate::Disconnected { reason } => format!("disconnected: {reason}"),
        HubUpdate::CommandSent { .. } => return None,
        HubUpdate::CommandsExpired(ids) => format!("{} command(s) got no result", ids.len()),
        HubUpdate::Session(event) => match event {
            SessionEvent::LogAppended(line) => return Some(log_line(line, at, color)),
            SessionEvent::WorldAdded { world, .. } => format!("+ world {}", world.name),
            SessionEvent::WorldRemoved { world: Some(world), .. } => {
                format!("- world {}", world.name)
            }
            SessionEvent::PlayerAdded { player, .. } => format!("+ {}", markup(&player.label(), color)),
            SessionEvent::PlayerRemoved {
                player: Some(player),
                ..
            } => format!("- {}", markup(&player.label(), color)),
            SessionEvent::CommandCompleted {
                command_id,
                success: false,
                command,
                ..
            } => format!(
                "command {} failed",
                command
                    .as_ref()
                    .map(|c| c.text.clone())
                    .unwrap_or_else(|| format!("#{command_id}"))
            ),
            SessionEvent::CommandCompleted { output: Some(line), .. } => {
                return Some(log_line(line, at, color));
            }
            _ => return None,
        },
    };
    Some(format!("{} {text}", dim("*", color)))
}

pub fn world_lines(snapshot: &HubSnapshot, color: bool) -> Vec<String> {
    if snapshot.worlds.is_empty() {
        return vec!["no worlds".to_string()];
    }
    snapshot
        .worlds
        .iter()
        .map(|world| {
            let parent = world
                .parent
                .and_then(|id| snapshot.worlds.iter().find(|w| w.id == id))
                .map(|p| format!(" (in {})", markup(&p.name, color)))
                .unwrap_or_default();
            let count = snapshot
                .players
                .iter()
                .filter(|p| p.world == Some(world.id))
                .count();
            format!(
                "  {} dim {}{parent}: {count} player(s)",
                markup(&world.name, color),
                world.dimension
            )
        })
        .collect()
}

pub fn player_list_lines(snapshot: &HubSnapshot, color: bool) -> Vec<String> {
    if snapshot.players.is_empty() {
        return vec!["no players".to_string()];
    }
    snapshot
        .players
        .iter()
        .map(|player| {
            let world = player
                .world
                .and_then(|id| snapshot.worlds.iter().find(|w| w.id == id))
                .map(|w| markup(&w.name, color))
                .unwrap_or_else(|| "?".to_string());
            format!("  {} in {world}", markup(&player.label(), color))
        })
        .collect()
}

pub fn pending_lines(snapshot: &HubSnapshot) -> Vec<String> {
    if snapshot.pending.is_empty() {
        return vec!["no pending commands".to_string()];
    }
    snapshot
        .pending
        .iter()
        .map(|(id, text)| format!("  #{id} {text}"))
        .collect()
}

/// A line typed at the console prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Empty,
    Worlds,
    Players,
    Pending,
    Quit,
    Command(String),
}

impl Input {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "" => Input::Empty,
            "/worlds" => Input::Worlds,
            "/players" => Input::Players,
            "/pending" => Input::Pending,
            "/quit" | "/exit" => Input::Quit,
            other => Input::Command(other.trim_start_matches('/').to_string()),
        }
    }
}
