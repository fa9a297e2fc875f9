use chrono::Utc;
use clap::Subcommand;
use nudge_core::storage::{flag_key, FlagKind};
use nudge_core::{JsonFileFlagStore, PersistenceGate, PromptKind};

#[derive(Subcommand)]
pub enum FlagsAction {
    /// Show persisted flags for every prompt
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove the flags of one prompt so it can trigger again
    Clear {
        /// Prompt name: star, sponsor or pwa
        #[arg(long)]
        prompt: PromptKind,
    },
    /// Mark a prompt as dismissed
    Dismiss {
        #[arg(long)]
        prompt: PromptKind,
    },
}

pub fn run(action: FlagsAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        FlagsAction::Show { json } => {
            let store = JsonFileFlagStore::open_default()?;
            let flags = store.load_all()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&flags)?);
                return Ok(());
            }
            for prompt in PromptKind::ALL {
                let set: Vec<String> = FlagKind::ALL
                    .iter()
                    .filter_map(|&kind| {
                        flags
                            .get(&flag_key(prompt.as_str(), kind))
                            .map(|at| format!("{}={}", kind.suffix(), at.to_rfc3339()))
                    })
                    .collect();
                if set.is_empty() {
                    println!("{prompt}: -");
                } else {
                    println!("{prompt}: {}", set.join(" "));
                }
            }
        }
        FlagsAction::Clear { prompt } => {
            let mut gate = gate_for(prompt)?;
            gate.clear()?;
            println!("cleared {prompt}");
        }
        FlagsAction::Dismiss { prompt } => {
            let mut gate = gate_for(prompt)?;
            if !gate.record(FlagKind::Dismissed, Utc::now()) {
                return Err(format!("could not persist dismissal of {prompt}").into());
            }
            println!("dismissed {prompt}");
        }
    }
    Ok(())
}

fn gate_for(prompt: PromptKind) -> Result<PersistenceGate, Box<dyn std::error::Error>> {
    let store = JsonFileFlagStore::open_default()?;
    Ok(PersistenceGate::new(prompt.as_str(), Box::new(store)))
}
