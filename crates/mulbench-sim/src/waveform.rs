//! Waveform capture and VCD export
//!
//! Builds per-signal change lists from a simulation trace and writes them as
//! a Value Change Dump.

use crate::simulator::{SimulationResult, SimulationState};
use indexmap::IndexMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Change list of one signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub name: String,
    pub width: usize,
    /// (time in ps, value) for every change, starting with the initial value
    pub changes: Vec<(u64, Vec<u8>)>,
}

#[derive(Debug, Clone, Default)]
pub struct Waveform {
    pub scope: String,
    pub signals: Vec<Signal>,
    pub end_time_ps: u64,
}

impl Waveform {
    pub fn from_simulation_states(
        scope: &str,
        states: &[SimulationState],
        widths: &IndexMap<String, usize>,
    ) -> Self {
        let mut signals: Vec<Signal> = widths
            .iter()
            .map(|(name, width)| Signal {
                name: name.clone(),
                width: *width,
                changes: Vec::new(),
            })
            .collect();

        for state in states {
            for signal in &mut signals {
                let Some(value) = state.signals.get(&signal.name) else {
                    continue;
                };
                if signal.changes.last().map(|(_, v)| v) != Some(value) {
                    signal.changes.push((state.time_ps, value.clone()));
                }
            }
        }

        Waveform {
            scope: scope.to_string(),
            signals,
            end_time_ps: states.last().map_or(0, |s| s.time_ps),
        }
    }

    pub fn signal(&self, name: &str) -> Option<&Signal> {
        self.signals.iter().find(|s| s.name == name)
    }

    pub fn export_vcd(&self, path: &Path) -> SimulationResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_vcd(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn write_vcd<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "$version mulbench $end")?;
        writeln!(out, "$timescale 1ps $end")?;
        writeln!(out, "$scope module {} $end", self.scope)?;
        for (index, signal) in self.signals.iter().enumerate() {
            writeln!(
                out,
                "$var wire {} {} {} $end",
                signal.width,
                vcd_identifier(index),
                signal.name
            )?;
        }
        writeln!(out, "$upscope $end")?;
        writeln!(out, "$enddefinitions $end")?;

        // Merge all change lists into time order
        let mut timeline: Vec<(u64, usize, &[u8])> = self
            .signals
            .iter()
            .enumerate()
            .flat_map(|(index, signal)| {
                signal
                    .changes
                    .iter()
                    .map(move |(time, value)| (*time, index, value.as_slice()))
            })
            .collect();
        timeline.sort_by_key(|(time, index, _)| (*time, *index));

        let mut current_time = None;
        for (time, index, value) in timeline {
            if current_time != Some(time) {
                writeln!(out, "#{time}")?;
                current_time = Some(time);
            }
            let signal = &self.signals[index];
            let id = vcd_identifier(index);
            if signal.width == 1 {
                writeln!(out, "{}{}", value.first().map_or(0, |b| b & 1), id)?;
            } else {
                writeln!(out, "b{} {}", to_binary(value, signal.width), id)?;
            }
        }
        if current_time != Some(self.end_time_ps) {
            writeln!(out, "#{}", self.end_time_ps)?;
        }
        Ok(())
    }

    pub fn print_summary(&self) {
        println!(
            "Waveform '{}': {} signals, {} ps",
            self.scope,
            self.signals.len(),
            self.end_time_ps
        );
        for signal in &self.signals {
            println!(
                "  {:<10} width={:<3} changes={}",
                signal.name,
                signal.width,
                signal.changes.len()
            );
        }
    }
}

/// Short printable identifier codes, base 94 starting at '!'
fn vcd_identifier(mut index: usize) -> String {
    let mut id = String::new();
    loop {
        id.push((b'!' + (index % 94) as u8) as char);
        index /= 94;
        if index == 0 {
            break;
        }
        index -= 1;
    }
    id
}

/// MSB-first binary string of a little-endian value
fn to_binary(value: &[u8], width: usize) -> String {
    (0..width)
        .rev()
        .map(|bit| {
            let byte = value.get(bit / 8).copied().unwrap_or(0);
            if (byte >> (bit % 8)) & 1 == 1 {
                '1'
            } else {
                '0'
            }
        })
        .collect()
}
