//! Interactive registry editor behind `mtctl configure`.
//!
//! Menu loop over add / edit / delete / exit. Every field is prompted with a
//! three-attempt budget; running out aborts the operation without touching
//! the registry. A successful mutation is saved immediately. If the save
//! fails the in-memory change is kept and a warning is printed, so memory and
//! disk can differ until the next successful save.

use std::io::Write;
use std::path::Path;

use tokio::io::AsyncBufRead;
use tracing::{info, warn};

use crate::config::{InstanceRecord, Registry};
use crate::console::{prompt_with_retry, Console, Field, InputError, PromptError, MAX_ATTEMPTS};
use crate::error::Error;
use crate::validate::{self, mask_secret, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuChoice {
    Add,
    Edit,
    Delete,
    Exit,
}

impl MenuChoice {
    fn parse(input: &str) -> Option<Self> {
        match input.parse::<u32>().ok()? {
            1 => Some(MenuChoice::Add),
            2 => Some(MenuChoice::Edit),
            3 => Some(MenuChoice::Delete),
            0 => Some(MenuChoice::Exit),
            _ => None,
        }
    }
}

/// Run the menu loop until the operator exits or input ends.
pub async fn run<R, W>(
    console: &mut Console<R, W>,
    registry: &mut Registry,
    path: &Path,
) -> Result<(), Error>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    loop {
        show_menu(console, registry);

        console.print("Enter your choice: ");
        let Some(input) = console.read_line().await? else {
            console.blank();
            return Ok(());
        };

        let (action, outcome) = match MenuChoice::parse(&input) {
            Some(MenuChoice::Exit) => {
                console.say("Goodbye!");
                return Ok(());
            }
            Some(MenuChoice::Add) => ("adding", add_instance(console, registry).await),
            Some(MenuChoice::Edit) if registry.is_empty() => {
                console.say("No instances available to edit.");
                console.blank();
                continue;
            }
            Some(MenuChoice::Edit) => ("editing", edit_instance(console, registry).await),
            Some(MenuChoice::Delete) if registry.is_empty() => {
                console.say("No instances available to delete.");
                console.blank();
                continue;
            }
            Some(MenuChoice::Delete) => ("deleting", delete_instance(console, registry).await),
            None => {
                console.say("Invalid choice. Please try again.");
                console.blank();
                continue;
            }
        };

        match outcome {
            Ok(true) => persist(console, registry, path),
            Ok(false) => {}
            Err(Error::Input(InputError::Closed)) => {
                console.blank();
                return Ok(());
            }
            Err(e @ Error::Input(_)) => return Err(e),
            Err(e) => console.say(format!("Error {action} instance: {e}")),
        }
        console.blank();
    }
}

fn persist<R, W>(console: &mut Console<R, W>, registry: &Registry, path: &Path)
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    match registry.save(path) {
        Ok(()) => info!("Registry saved to {}", path.display()),
        Err(e) => {
            warn!("Registry save failed: {}", e);
            console.say(format!("Warning: Failed to save configuration: {e}"));
        }
    }
}

fn list_instances<R, W>(console: &mut Console<R, W>, registry: &Registry, numbered: bool)
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    for (i, name) in registry.sorted_names().iter().enumerate() {
        let Some(rec) = registry.get(name) else {
            continue;
        };
        if numbered {
            console.say(format!("[{}] {} ({})", i + 1, name, rec.endpoint()));
        } else {
            console.say(format!("  - {} ({})", name, rec.endpoint()));
        }
    }
}

fn show_menu<R, W>(console: &mut Console<R, W>, registry: &Registry)
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    console.say("=== Motor Town Server Configuration ===");
    console.blank();

    if !registry.is_empty() {
        console.say("Instances:");
        list_instances(console, registry, false);
        console.blank();
    }

    console.say("[1] Add Instance");
    if !registry.is_empty() {
        console.say("[2] Edit Instance");
        console.say("[3] Delete Instance");
    }
    console.say("[0] Exit");
    console.blank();
}

fn show_record<R, W>(console: &mut Console<R, W>, record: &InstanceRecord)
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    console.say(format!("  Address: {}", record.address));
    console.say(format!("  Port: {}", record.port));
    console.say(format!("  Secret: {}", mask_secret(&record.secret)));
}

/// Prompt for address, port and secret. With `existing`, each prompt offers
/// the current value as its default.
async fn prompt_record<R, W>(
    console: &mut Console<R, W>,
    existing: Option<&InstanceRecord>,
) -> Result<InstanceRecord, PromptError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let port_default = existing.map(|r| r.port.to_string());

    let mut address_field = Field::new("Enter server address");
    let mut port_field = Field::new("Enter server port");
    let mut secret_field = Field::new("Enter server secret").secret();
    if let (Some(rec), Some(port)) = (existing, port_default.as_deref()) {
        address_field = address_field.with_default(&rec.address);
        port_field = port_field.with_default(port);
        secret_field = secret_field.with_default(&rec.secret);
    }

    let address =
        prompt_with_retry(console, address_field, MAX_ATTEMPTS, validate::validate_address)
            .await?;
    let port = prompt_with_retry(console, port_field, MAX_ATTEMPTS, validate::validate_port).await?;
    let secret =
        prompt_with_retry(console, secret_field, MAX_ATTEMPTS, validate::validate_secret).await?;

    Ok(InstanceRecord {
        address,
        port,
        secret,
    })
}

/// List instances and read a 1-based choice.
async fn pick_instance<R, W>(
    console: &mut Console<R, W>,
    registry: &Registry,
    verb: &str,
) -> Result<String, Error>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let names = registry.sorted_names();
    console.say("Available instances:");
    list_instances(console, registry, true);
    console.blank();

    let input = console
        .ask(&format!("Enter instance number to {verb}: "))
        .await?;
    match input.parse::<usize>() {
        Ok(n) if (1..=names.len()).contains(&n) => Ok(names[n - 1].clone()),
        _ => Err(ValidationError::new(format!("invalid choice: {input}")).into()),
    }
}

/// Returns whether the registry changed.
async fn add_instance<R, W>(
    console: &mut Console<R, W>,
    registry: &mut Registry,
) -> Result<bool, Error>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    console.blank();
    console.say("=== Add New Instance ===");

    let name = prompt_with_retry(
        console,
        Field::new("Enter instance name"),
        MAX_ATTEMPTS,
        validate::validate_name,
    )
    .await?;

    if registry.get(&name).is_some() {
        return Err(ValidationError::new(format!("instance '{name}' already exists")).into());
    }

    let record = prompt_record(console, None).await?;

    console.say(format!("Instance '{name}' added successfully!"));
    show_record(console, &record);
    registry.add_or_replace(name, record);
    Ok(true)
}

async fn edit_instance<R, W>(
    console: &mut Console<R, W>,
    registry: &mut Registry,
) -> Result<bool, Error>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    console.blank();
    console.say("=== Edit Instance ===");

    let name = pick_instance(console, registry, "edit").await?;
    let existing = registry
        .get(&name)
        .cloned()
        .ok_or_else(|| ValidationError::new(format!("unknown instance: '{name}'")))?;

    console.blank();
    console.say(format!("Editing instance '{name}'"));
    console.say(format!("Current: {}", existing.endpoint()));
    console.say("Enter new values (press Enter to keep current value):");

    let record = prompt_record(console, Some(&existing)).await?;

    console.say(format!("Instance '{name}' updated successfully!"));
    show_record(console, &record);
    registry.add_or_replace(name, record);
    Ok(true)
}

async fn delete_instance<R, W>(
    console: &mut Console<R, W>,
    registry: &mut Registry,
) -> Result<bool, Error>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    console.blank();
    console.say("=== Delete Instance ===");

    let name = pick_instance(console, registry, "delete").await?;

    let answer = console
        .ask(&format!(
            "Are you sure you want to delete instance '{name}'? (y/N): "
        ))
        .await?
        .to_lowercase();
    if answer != "y" && answer != "yes" {
        console.say("Deletion cancelled.");
        return Ok(false);
    }

    if !registry.delete(&name) {
        return Err(ValidationError::new(format!("failed to delete instance '{name}'")).into());
    }
    console.say(format!("Instance '{name}' deleted successfully!"));
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::{scripted, transcript};
    use std::path::PathBuf;

    fn record(address: &str, port: u16, secret: &str) -> InstanceRecord {
        InstanceRecord {
            address: address.into(),
            port,
            secret: secret.into(),
        }
    }

    fn with_main() -> Registry {
        let mut reg = Registry::new();
        reg.add_or_replace("main", record("10.0.0.5", 8080, "hunter2"));
        reg
    }

    async fn drive(input: &str, registry: &mut Registry, path: &Path) -> String {
        let mut console = scripted(input);
        run(&mut console, registry, path).await.unwrap();
        transcript(console)
    }

    fn registry_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("instances.toml")
    }

    #[tokio::test]
    async fn add_persists_and_masks_secret() {
        let dir = tempfile::tempdir().unwrap();
        let path = registry_path(&dir);
        let mut reg = Registry::new();

        let out = drive("1\nmain\n10.0.0.5\n8080\nhunter2\n0\n", &mut reg, &path).await;

        assert_eq!(reg.get("main"), Some(&record("10.0.0.5", 8080, "hunter2")));
        assert_eq!(Registry::load(&path).unwrap(), reg);
        assert!(out.contains("Instance 'main' added successfully!"));
        assert!(out.contains("  Secret: hu*****"));
        assert!(!out.contains("hunter2"));
        assert!(out.contains("Goodbye!"));
    }

    #[tokio::test]
    async fn add_retries_then_accepts() {
        let dir = tempfile::tempdir().unwrap();
        let path = registry_path(&dir);
        let mut reg = Registry::new();

        let out = drive(
            "1\nMain\nmain\n1.2.3\n10.0.0.5\n8080\npw\n0\n",
            &mut reg,
            &path,
        )
        .await;

        assert!(out.contains("Please try again (2/3 attempts remaining)."));
        assert_eq!(reg.get("main"), Some(&record("10.0.0.5", 8080, "pw")));
    }

    #[tokio::test]
    async fn add_exhaustion_aborts_without_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let path = registry_path(&dir);
        let mut reg = Registry::new();

        let out = drive("1\nmain\nx\ny\nz\n0\n", &mut reg, &path).await;

        assert!(reg.is_empty());
        assert!(!path.exists());
        assert!(out.contains("Error adding instance: maximum attempts reached (3/3)"));
    }

    #[tokio::test]
    async fn add_refuses_existing_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = registry_path(&dir);
        let mut reg = with_main();

        let out = drive("1\nmain\n0\n", &mut reg, &path).await;

        assert!(out.contains("Error adding instance: instance 'main' already exists"));
        assert_eq!(reg, with_main());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn edit_and_delete_hidden_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = registry_path(&dir);

        let out = drive("2\n3\n0\n", &mut Registry::new(), &path).await;
        assert!(!out.contains("[2] Edit Instance"));
        assert!(!out.contains("[3] Delete Instance"));
        assert!(out.contains("No instances available to edit."));
        assert!(out.contains("No instances available to delete."));

        let out = drive("0\n", &mut with_main(), &path).await;
        assert!(out.contains("  - main (10.0.0.5:8080)"));
        assert!(out.contains("[2] Edit Instance"));
        assert!(out.contains("[3] Delete Instance"));
    }

    #[tokio::test]
    async fn edit_reuses_defaults_on_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = registry_path(&dir);
        let mut reg = with_main();

        let out = drive("2\n1\n\n9000\n\n0\n", &mut reg, &path).await;

        assert_eq!(reg.get("main"), Some(&record("10.0.0.5", 9000, "hunter2")));
        assert_eq!(Registry::load(&path).unwrap(), reg);
        assert!(out.contains("Enter server address [10.0.0.5]: "));
        assert!(out.contains("Enter server port [8080]: "));
        assert!(out.contains("Enter server secret [hu*****]: "));
        assert!(!out.contains("hunter2"));
    }

    #[tokio::test]
    async fn edit_validates_defaulted_fields_too() {
        let dir = tempfile::tempdir().unwrap();
        let path = registry_path(&dir);
        let mut reg = with_main();

        let out = drive("2\n1\n\n99999\n-1\nport\n0\n", &mut reg, &path).await;

        assert_eq!(reg, with_main());
        assert!(!path.exists());
        assert!(out.contains("Error editing instance: maximum attempts reached (3/3)"));
    }

    #[tokio::test]
    async fn edit_rejects_bad_selection() {
        let dir = tempfile::tempdir().unwrap();
        let path = registry_path(&dir);
        let out = drive("2\n5\n0\n", &mut with_main(), &path).await;
        assert!(out.contains("Error editing instance: invalid choice: 5"));
    }

    #[tokio::test]
    async fn delete_requires_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let path = registry_path(&dir);
        let mut reg = with_main();

        let out = drive("3\n1\nn\n0\n", &mut reg, &path).await;
        assert!(out.contains("Deletion cancelled."));
        assert_eq!(reg, with_main());
        assert!(!path.exists());

        let out = drive("3\n1\nYES\n0\n", &mut reg, &path).await;
        assert!(out.contains("Instance 'main' deleted successfully!"));
        assert!(reg.is_empty());
        assert!(Registry::load(&path).unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_failure_warns_and_keeps_memory_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("instances.toml");
        let mut reg = Registry::new();

        let out = drive("1\nmain\n10.0.0.5\n8080\npw\n0\n", &mut reg, &path).await;

        assert!(out.contains("Warning: Failed to save configuration"));
        assert!(reg.get("main").is_some());
    }

    #[tokio::test]
    async fn invalid_choices_loop() {
        let dir = tempfile::tempdir().unwrap();
        let path = registry_path(&dir);
        let out = drive("9\nabc\n0\n", &mut Registry::new(), &path).await;
        assert_eq!(out.matches("Invalid choice. Please try again.").count(), 2);
        assert!(out.contains("Goodbye!"));
    }

    #[tokio::test]
    async fn end_of_input_exits_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = registry_path(&dir);
        let mut reg = Registry::new();

        drive("", &mut reg, &path).await;
        drive("1\nmain\n10.0.0.5\n", &mut reg, &path).await;

        assert!(reg.is_empty());
        assert!(!path.exists());
    }
}
