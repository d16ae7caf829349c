#![no_main]

use daysince_interactions::{parse_interaction, InteractionKind};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(interaction) = parse_interaction(data) {
        match interaction.kind {
            InteractionKind::Command => {
                if let Some(command) = &interaction.command {
                    assert!(!command.name.trim().is_empty());
                }
                assert!(!interaction.id.trim().is_empty());
                assert!(!interaction.token.trim().is_empty());
            }
            InteractionKind::Heartbeat | InteractionKind::Other(_) => {
                assert!(interaction.command.is_none());
            }
        }
    }
});
