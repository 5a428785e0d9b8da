// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! midir backend.
//!
//! A cross-platform implementation of the `MidiOutput` trait, letting an
//! external synth or DAW voice the recorder's notes.

use anyhow::{anyhow, Result};
use midir::{MidiOutput as MidirClient, MidiOutputConnection};
use tracing::debug;

use super::MidiOutput;

const CLIENT_NAME: &str = "KEYREC";

/// midir output connected to one port.
pub struct MidirOutput {
    connection: MidiOutputConnection,
    port_name: String,
}

impl MidirOutput {
    /// Connect to the output port at `port_index`.
    ///
    /// # Returns
    /// * `Ok(MidirOutput)` on success
    /// * `Err` if the client could not be created or the port does not exist
    pub fn new(port_index: usize) -> Result<Self> {
        let client = MidirClient::new(CLIENT_NAME)
            .map_err(|e| anyhow!("Failed to create MIDI client: {}", e))?;

        let ports = client.ports();
        let port = ports.get(port_index).ok_or_else(|| {
            anyhow!(
                "MIDI output {} not found (only {} available)",
                port_index,
                ports.len()
            )
        })?;
        let port_name = client
            .port_name(port)
            .unwrap_or_else(|_| format!("Unknown {}", port_index));

        let connection = client
            .connect(port, "KEYREC Output")
            .map_err(|e| anyhow!("Failed to connect to MIDI output {}: {}", port_index, e))?;

        debug!(port = %port_name, "connected MIDI output");
        Ok(Self {
            connection,
            port_name,
        })
    }

    /// Connect to the first port whose name contains `name` (case-insensitive).
    pub fn new_by_name(name: &str) -> Result<Self> {
        let needle = name.to_lowercase();
        let index = list_outputs()
            .into_iter()
            .find(|(_, n)| n.to_lowercase().contains(&needle))
            .map(|(i, _)| i)
            .ok_or_else(|| anyhow!("No MIDI output matching '{}' found", name))?;

        Self::new(index)
    }

    /// Name of the connected port
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl MidiOutput for MidirOutput {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        self.connection
            .send(message)
            .map_err(|e| anyhow!("Failed to send MIDI message: {}", e))
    }
}

/// List all available MIDI outputs as (index, name) pairs.
///
/// Returns an empty list when no MIDI client can be created.
pub fn list_outputs() -> Vec<(usize, String)> {
    let Ok(client) = MidirClient::new(CLIENT_NAME) else {
        return Vec::new();
    };

    client
        .ports()
        .iter()
        .enumerate()
        .map(|(i, port)| {
            let name = client
                .port_name(port)
                .unwrap_or_else(|_| format!("Unknown {}", i));
            (i, name)
        })
        .collect()
}

/// Print all available MIDI outputs to stdout.
pub fn print_outputs() {
    let outputs = list_outputs();
    if outputs.is_empty() {
        println!("No MIDI outputs found.");
    } else {
        println!("Available MIDI outputs:");
        for (i, name) in outputs {
            println!("  {}: {}", i, name);
        }
    }
}
