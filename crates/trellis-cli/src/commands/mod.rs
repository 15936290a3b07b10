pub mod export;
pub mod import;
pub mod ingest;
pub mod list;
pub mod section;
pub mod task;

use dialoguer::Confirm;

/// Asks before a destructive action unless `force` is set.
pub(crate) fn confirm(force: bool, prompt: String) -> bool {
    if force {
        return true;
    }
    let confirmed = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .unwrap_or(false);
    if !confirmed {
        println!("Deletion cancelled.");
    }
    confirmed
}
