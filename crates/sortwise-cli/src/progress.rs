use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use sortwise_core::{Phase, ProgressEvent};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
const TICK: Duration = Duration::from_millis(80);

/// Terminal progress fed by the engine's event channel.
///
/// The engine reports through the `Sender`; a background thread turns the
/// events into an indicatif spinner (scan, total unknown) or bar (later
/// phases). Drop the sender, then call [`ProgressDisplay::finish`].
pub struct ProgressDisplay {
    handle: JoinHandle<()>,
}

impl ProgressDisplay {
    pub fn spawn() -> (Sender<ProgressEvent>, Self) {
        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || render(rx));
        (tx, Self { handle })
    }

    pub fn finish(self) {
        let _ = self.handle.join();
    }
}

fn render(rx: Receiver<ProgressEvent>) {
    let mut current: Option<(Phase, ProgressBar, usize)> = None;

    for event in rx {
        let switch = !matches!(&current, Some((phase, _, _)) if *phase == event.phase);
        if switch {
            if let Some((phase, bar, count)) = current.take() {
                complete(phase, bar, count);
            }
            current = Some((event.phase, start_phase(event.phase, event.total), 0));
        }

        if let Some((phase, bar, count)) = current.as_mut() {
            *count = event.current;
            match phase {
                Phase::Scan => bar.set_message(format!(
                    "Scanning... {} files found ({})",
                    event.current, event.item
                )),
                _ => {
                    if bar.length() != Some(event.total as u64) {
                        bar.set_length(event.total as u64);
                    }
                    bar.set_position(event.current as u64);
                    bar.set_message(event.item);
                }
            }
        }
    }

    if let Some((phase, bar, count)) = current.take() {
        complete(phase, bar, count);
    }
}

fn start_phase(phase: Phase, total: usize) -> ProgressBar {
    let bar = match phase {
        Phase::Scan => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::with_template("{spinner:.cyan} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_chars(TICK_CHARS),
            );
            pb
        }
        _ => {
            let pb = ProgressBar::new(total as u64);
            let template = format!(
                "  {{spinner:.cyan}} {:<9} [{{bar:30.cyan/dim}}] {{pos}}/{{len}} {{wide_msg:.dim}}",
                label(phase)
            );
            pb.set_style(
                ProgressStyle::with_template(&template)
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("━╸─")
                    .tick_chars(TICK_CHARS),
            );
            pb
        }
    };
    bar.enable_steady_tick(TICK);
    bar
}

fn complete(phase: Phase, bar: ProgressBar, count: usize) {
    bar.finish_and_clear();
    let noun = match phase {
        Phase::Remote => "files sent",
        _ => "files",
    };
    eprintln!(
        "  {} {} complete: {} {}",
        "✓".green(),
        label(phase),
        count,
        noun
    );
}

fn label(phase: Phase) -> &'static str {
    match phase {
        Phase::Scan => "Scan",
        Phase::Classify => "Classify",
        Phase::Remote => "Remote",
        Phase::Execute => "Execute",
    }
}
