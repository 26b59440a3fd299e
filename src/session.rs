//! Interactive remote-control session.
//!
//! A session first selects one instance from the registry, then reads one
//! command per line and executes it against that instance until `exit`,
//! `quit`, `disconnect` or end of input. Command failures are printed and the
//! session carries on; only a failure to read input ends it with an error.
//!
//! ## Commands
//!
//! | Input                              | Admin call            |
//! |------------------------------------|-----------------------|
//! | `chat <message>`                   | `POST /chat`          |
//! | `players`, `playerlist`            | `GET /player/list`    |
//! | `count`, `playercount`             | `GET /player/count`   |
//! | `banlist`                          | `GET /player/banlist` |
//! | `kick <unique_id>`                 | `POST /player/kick`   |
//! | `ban <unique_id> [hours] [reason]` | `POST /player/ban`    |
//! | `unban <unique_id>`                | `POST /player/unban`  |
//! | `version`                          | `GET /version`        |
//! | `housing`                          | `GET /housing/list`   |

use std::io::Write;

use thiserror::Error;
use tokio::io::AsyncBufRead;
use tracing::{debug, info};

use crate::client::{AdminClient, ClientError};
use crate::config::{InstanceRecord, Registry};
use crate::console::Console;
use crate::envelope::{display_field, Payload};
use crate::error::Error;
use crate::validate::ValidationError;

/// One parsed line of operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    Help,
    Chat { message: String },
    Players,
    PlayerCount,
    BanList,
    Kick { unique_id: String },
    /// `hours <= 0` means no expiry.
    Ban {
        unique_id: String,
        hours: i64,
        reason: String,
    },
    Unban { unique_id: String },
    Version,
    Housing,
    Unknown(String),
}

impl Command {
    /// Parse a line. `None` for blank input; `Some(Err(_))` when a known
    /// command is missing its required argument.
    ///
    /// The command word is case-insensitive. A non-numeric `hours` argument
    /// to `ban` is ignored rather than rejected.
    pub fn parse(line: &str) -> Option<Result<Self, ValidationError>> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let word = parts.first()?.to_lowercase();

        let cmd = match word.as_str() {
            "exit" | "quit" | "disconnect" => Ok(Command::Exit),
            "help" => Ok(Command::Help),
            "chat" if parts.len() < 2 => Err(usage("chat <message>")),
            "chat" => Ok(Command::Chat {
                message: parts[1..].join(" "),
            }),
            "players" | "playerlist" => Ok(Command::Players),
            "count" | "playercount" => Ok(Command::PlayerCount),
            "banlist" => Ok(Command::BanList),
            "kick" => arg(&parts, "kick <unique_id>").map(|unique_id| Command::Kick { unique_id }),
            "ban" => arg(&parts, "ban <unique_id> [hours] [reason]").map(|unique_id| {
                Command::Ban {
                    unique_id,
                    hours: parts.get(2).and_then(|h| h.parse().ok()).unwrap_or(0),
                    reason: parts.get(3..).map(|r| r.join(" ")).unwrap_or_default(),
                }
            }),
            "unban" => {
                arg(&parts, "unban <unique_id>").map(|unique_id| Command::Unban { unique_id })
            }
            "version" => Ok(Command::Version),
            "housing" => Ok(Command::Housing),
            _ => Ok(Command::Unknown(word)),
        };
        Some(cmd)
    }
}

fn usage(text: &str) -> ValidationError {
    ValidationError::new(format!("usage: {text}"))
}

fn arg(parts: &[&str], usage_text: &str) -> Result<String, ValidationError> {
    parts
        .get(1)
        .map(|s| (*s).to_string())
        .ok_or_else(|| usage(usage_text))
}

/// Failure of a single session command. Printed, never fatal.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Usage(#[from] ValidationError),
    #[error("{context}: {source}")]
    Client {
        context: &'static str,
        #[source]
        source: ClientError,
    },
    /// The call succeeded but the payload does not have the expected shape.
    #[error("unexpected {0} format")]
    Shape(&'static str),
}

fn failed(context: &'static str) -> impl FnOnce(ClientError) -> CommandError {
    move |source| CommandError::Client { context, source }
}

/// Lines for a player or ban list payload. Missing or malformed data renders
/// as `empty` rather than as an error.
pub fn render_player_list(payload: &Payload, heading: &str, empty: &str) -> Vec<String> {
    let Some(entries) = payload.entries() else {
        return vec![empty.to_string()];
    };
    let mut lines = vec![format!("{heading} ({}):", entries.len())];
    for player in entries.values().filter_map(|v| v.as_object()) {
        lines.push(format!(
            "  - {} (ID: {})",
            display_field(player.get("name")),
            display_field(player.get("unique_id"))
        ));
    }
    lines
}

/// Lines for a housing payload keyed by house name.
pub fn render_housing(payload: &Payload) -> Vec<String> {
    let Some(entries) = payload.entries() else {
        return vec!["No housing data available".to_string()];
    };
    let mut lines = vec![format!("Housing list ({} entries):", entries.len())];
    for (house, data) in entries {
        if let Some(data) = data.as_object() {
            lines.push(format!(
                "  - {house} (Owner: {}, Expires: {})",
                display_field(data.get("owner_unique_id")),
                display_field(data.get("expire_time"))
            ));
        }
    }
    lines
}

/// `Players online: N` from `data.num_players`.
pub fn render_player_count(payload: &Payload) -> Result<String, CommandError> {
    if payload.as_mapping().is_none() {
        return Err(CommandError::Shape("response"));
    }
    payload
        .count_field("num_players")
        .map(|n| format!("Players online: {n}"))
        .ok_or(CommandError::Shape("player count"))
}

/// `Server version: V` from `data.version`.
pub fn render_version(payload: &Payload) -> Result<String, CommandError> {
    if payload.as_mapping().is_none() {
        return Err(CommandError::Shape("response"));
    }
    payload
        .str_field("version")
        .map(|v| format!("Server version: {v}"))
        .ok_or(CommandError::Shape("version"))
}

const HELP: &[&str] = &[
    "Available commands:",
    "  chat <message>        Send a chat message to the server",
    "  players, playerlist   Get list of online players",
    "  count, playercount    Get number of online players",
    "  banlist               Get list of banned players",
    "  kick <unique_id>      Kick a player by unique ID",
    "  ban <unique_id> [hours] [reason]  Ban a player",
    "  unban <unique_id>     Unban a player by unique ID",
    "  version               Get server version",
    "  housing               Get housing list",
    "  help                  Show this help message",
    "  exit                  Disconnect and end the session",
];

/// A session bound to one instance.
pub struct Session<'a, R, W> {
    console: &'a mut Console<R, W>,
    client: &'a AdminClient,
    name: String,
    instance: InstanceRecord,
}

impl<'a, R, W> Session<'a, R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(
        console: &'a mut Console<R, W>,
        client: &'a AdminClient,
        name: String,
        instance: InstanceRecord,
    ) -> Self {
        Self {
            console,
            client,
            name,
            instance,
        }
    }

    /// Read and execute commands until exit or end of input.
    pub async fn run(&mut self) -> Result<(), Error> {
        info!("Connected to '{}' at {}", self.name, self.instance.endpoint());
        self.console.say(format!(
            "Connected to instance '{}' ({})",
            self.name,
            self.instance.endpoint()
        ));
        self.console
            .say("Type 'help' for available commands or 'exit' to disconnect.");
        self.console.blank();

        loop {
            self.console.print(format!("{}> ", self.name));
            let Some(line) = self.console.read_line().await? else {
                self.console.blank();
                return Ok(());
            };

            let cmd = match Command::parse(&line) {
                None => continue,
                Some(Err(e)) => {
                    self.console.say(format!("Error: {e}"));
                    continue;
                }
                Some(Ok(cmd)) => cmd,
            };

            if cmd == Command::Exit {
                self.console
                    .say(format!("Disconnected from instance '{}'", self.name));
                return Ok(());
            }

            debug!("Executing {:?}", cmd);
            if let Err(e) = self.execute(cmd).await {
                self.console.say(format!("Error: {e}"));
            }
        }
    }

    fn say_all(&mut self, lines: Vec<String>) {
        for line in lines {
            self.console.say(line);
        }
    }

    /// Execute one command and render its result.
    pub async fn execute(&mut self, cmd: Command) -> Result<(), CommandError> {
        let client = self.client;
        let instance = &self.instance;

        match cmd {
            Command::Exit => {}
            Command::Help => {
                for line in HELP {
                    self.console.say(line);
                }
                self.console.blank();
            }
            Command::Chat { message } => {
                self.console.say(format!("Sending message: {message}"));
                let env = client
                    .send_chat(instance, &message)
                    .await
                    .map_err(failed("failed to send chat message"))?;
                self.console
                    .say(format!("✓ Message sent successfully: {}", env.message));
            }
            Command::Players => {
                let env = client
                    .player_list(instance)
                    .await
                    .map_err(failed("failed to get player list"))?;
                let lines = render_player_list(&env.data, "Online players", "No players online");
                self.say_all(lines);
            }
            Command::PlayerCount => {
                let env = client
                    .player_count(instance)
                    .await
                    .map_err(failed("failed to get player count"))?;
                let line = render_player_count(&env.data)?;
                self.console.say(line);
            }
            Command::BanList => {
                let env = client
                    .ban_list(instance)
                    .await
                    .map_err(failed("failed to get ban list"))?;
                let lines = render_player_list(&env.data, "Banned players", "No banned players");
                self.say_all(lines);
            }
            Command::Kick { unique_id } => {
                self.console
                    .say(format!("Kicking player with ID: {unique_id}"));
                let env = client
                    .kick(instance, &unique_id)
                    .await
                    .map_err(failed("failed to kick player"))?;
                self.console
                    .say(format!("✓ Player kicked successfully: {}", env.message));
            }
            Command::Ban {
                unique_id,
                hours,
                reason,
            } => {
                let mut line = format!("Banning player with ID: {unique_id}");
                if hours > 0 {
                    line.push_str(&format!(" for {hours} hours"));
                }
                if !reason.is_empty() {
                    line.push_str(&format!(" (reason: {reason})"));
                }
                self.console.say(line);
                let env = client
                    .ban(instance, &unique_id, hours, &reason)
                    .await
                    .map_err(failed("failed to ban player"))?;
                self.console
                    .say(format!("✓ Player banned successfully: {}", env.message));
            }
            Command::Unban { unique_id } => {
                self.console
                    .say(format!("Unbanning player with ID: {unique_id}"));
                let env = client
                    .unban(instance, &unique_id)
                    .await
                    .map_err(failed("failed to unban player"))?;
                self.console
                    .say(format!("✓ Player unbanned successfully: {}", env.message));
            }
            Command::Version => {
                let env = client
                    .version(instance)
                    .await
                    .map_err(failed("failed to get version"))?;
                let line = render_version(&env.data)?;
                self.console.say(line);
            }
            Command::Housing => {
                let env = client
                    .housing_list(instance)
                    .await
                    .map_err(failed("failed to get housing list"))?;
                let lines = render_housing(&env.data);
                self.say_all(lines);
            }
            Command::Unknown(word) => {
                self.console.say(format!("Unknown command: {word}"));
                self.console.say("Type 'help' for available commands.");
            }
        }
        Ok(())
    }
}

/// List instances and read a 1-based choice. `Ok(None)` at end of input.
async fn select_instance<R, W>(
    console: &mut Console<R, W>,
    registry: &Registry,
) -> Result<Option<String>, Error>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let names = registry.sorted_names();

    console.say("=== Available Instances ===");
    for (i, name) in names.iter().enumerate() {
        if let Some(rec) = registry.get(name) {
            console.say(format!("[{}] {} ({})", i + 1, name, rec.endpoint()));
        }
    }
    console.blank();

    console.print("Select instance to connect to: ");
    let Some(input) = console.read_line().await? else {
        console.blank();
        return Ok(None);
    };

    match input.parse::<usize>() {
        Ok(n) if (1..=names.len()).contains(&n) => Ok(Some(names[n - 1].clone())),
        _ => Err(ValidationError::new(format!("invalid choice: {input}")).into()),
    }
}

/// Entry point for `mtctl connect`.
///
/// With `preselected`, binds straight to that instance; otherwise lists the
/// registry and asks. An empty registry prints a hint and returns.
pub async fn connect<R, W>(
    console: &mut Console<R, W>,
    registry: &Registry,
    client: &AdminClient,
    preselected: Option<&str>,
) -> Result<(), Error>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    if registry.is_empty() {
        console.say("No instances configured. Use 'configure' command to add instances.");
        return Ok(());
    }

    let name = match preselected {
        Some(name) => name.to_string(),
        None => match select_instance(console, registry).await? {
            Some(name) => name,
            None => return Ok(()),
        },
    };

    let instance = registry
        .get(&name)
        .cloned()
        .ok_or_else(|| ValidationError::new(format!("unknown instance: '{name}'")))?;

    Session::new(console, client, name, instance).run().await
}
