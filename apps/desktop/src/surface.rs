//! Line-oriented terminal rendering of the dashboard.

use std::io::Write;

use client_core::{
    projector::{PatientStatus, StatusTone},
    Counter, RenderInstruction, RenderSurface, Trigger,
};
use tracing::warn;

pub struct TerminalSurface<W: Write> {
    out: W,
    counters: Vec<(Counter, String)>,
    flashing: Option<Counter>,
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            counters: Counter::ALL
                .iter()
                .map(|counter| (*counter, String::new()))
                .collect(),
            flashing: None,
        }
    }

    fn line(&mut self, text: &str) {
        if let Err(err) = writeln!(self.out, "{text}") {
            warn!(%err, "terminal write failed");
        }
    }

    fn set_counter(&mut self, counter: Counter, value: &str) -> bool {
        match self.counters.iter_mut().find(|(c, _)| *c == counter) {
            Some((_, current)) if current != value => {
                *current = value.to_string();
                true
            }
            _ => false,
        }
    }

    fn counters_line(&self) -> String {
        let cells: Vec<String> = self
            .counters
            .iter()
            .map(|(counter, value)| {
                let mark = if self.flashing == Some(*counter) { "*" } else { "" };
                format!("{}={value}{mark}", counter.name())
            })
            .collect();
        format!("[metrics] {}", cells.join(" "))
    }

    /// Text for instructions that map to a single line; counters and
    /// transient effects are handled by the caller.
    fn describe(instruction: &RenderInstruction) -> Option<String> {
        let text = match instruction {
            RenderInstruction::ResetLog => "[chat] waiting for a lead...".to_string(),
            RenderInstruction::ClearLog => "[chat] ----".to_string(),
            RenderInstruction::ShowTyping => "[chat] ...".to_string(),
            RenderInstruction::AppendMessage {
                sender,
                text,
                time_label,
                heading,
            } => {
                let heading = heading.as_deref().map(|h| format!("{h} | ")).unwrap_or_default();
                let time = time_label.as_deref().map(|t| format!(" {t}")).unwrap_or_default();
                format!("[chat] {heading}{}{time}: {text}", sender.as_str())
            }
            RenderInstruction::ResetPatientList => "[patients] no active patients".to_string(),
            RenderInstruction::UpsertPatient {
                initials,
                name,
                stage,
                status,
                ..
            } => {
                let lost = match status {
                    PatientStatus::Lost => " (lost)",
                    PatientStatus::Active => "",
                };
                format!("[patients] {initials} {name}: {stage}{lost}")
            }
            RenderInstruction::HighlightStage { stage, .. } => format!("[funnel] >> {stage}"),
            RenderInstruction::SetResponseTime { value, comparison } => {
                format!("[response] {value} ({comparison})")
            }
            RenderInstruction::SetChatStatus { label, tone } => {
                let icon = match tone {
                    StatusTone::Success => "+",
                    StatusTone::Danger => "!",
                };
                format!("[status] {icon} {label}")
            }
            RenderInstruction::SetTrigger { trigger, enabled } => {
                let name = match trigger {
                    Trigger::SimulateLead => "simulate lead",
                    Trigger::Retention => "retention",
                };
                let state = if *enabled { "ready" } else { "unavailable" };
                format!("[controls] {name}: {state}")
            }
            RenderInstruction::HideTyping
            | RenderInstruction::ClearStageHighlight { .. }
            | RenderInstruction::SetCounter { .. }
            | RenderInstruction::Flash { .. }
            | RenderInstruction::Unflash { .. } => return None,
        };
        Some(text)
    }
}

impl<W: Write> RenderSurface for TerminalSurface<W> {
    fn apply(&mut self, instruction: &RenderInstruction) {
        match instruction {
            RenderInstruction::SetCounter { counter, value } => {
                self.set_counter(*counter, value);
            }
            RenderInstruction::Flash { counter } => self.flashing = Some(*counter),
            RenderInstruction::Unflash { counter } if self.flashing == Some(*counter) => {
                self.flashing = None;
            }
            other => {
                if let Some(text) = Self::describe(other) {
                    self.line(&text);
                }
            }
        }
    }

    /// Counter updates in one batch collapse into a single summary line.
    fn apply_all(&mut self, instructions: &[RenderInstruction]) {
        let mut counters_changed = false;
        for instruction in instructions {
            match instruction {
                RenderInstruction::SetCounter { counter, value } => {
                    counters_changed |= self.set_counter(*counter, value);
                }
                RenderInstruction::Flash { .. } => {
                    counters_changed = true;
                    self.apply(instruction);
                }
                other => self.apply(other),
            }
        }
        if counters_changed {
            let summary = self.counters_line();
            self.line(&summary);
        }
    }
}

#[cfg(test)]
#[path = "tests/surface_tests.rs"]
mod tests;
