use serde::{Deserialize, Serialize};
use std::sync::mpsc::Sender;

/// Summary of one scored generation, handed to callbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    /// Generations scored so far, this one included.
    pub generation: usize,
    pub best_fitness: Option<f64>,
    pub mean_fitness: Option<f64>,
    pub best_expression: Option<String>,
    pub population_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationControl {
    Continue,
    Stop,
}

pub trait ProgressCallback: Send {
    fn on_generation_start(&mut self, _generation: usize) {}

    /// Called after scoring, before the next generation is bred. Returning
    /// `Stop` ends the run with the current population.
    fn on_generation_complete(&mut self, report: &GenerationReport) -> GenerationControl;
}

/// Ignores every event.
impl ProgressCallback for () {
    fn on_generation_complete(&mut self, _report: &GenerationReport) -> GenerationControl {
        GenerationControl::Continue
    }
}

pub struct ConsoleProgressCallback;

impl ProgressCallback for ConsoleProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        log::debug!("Generation {} starting...", generation + 1);
    }

    fn on_generation_complete(&mut self, report: &GenerationReport) -> GenerationControl {
        log::info!(
            "Generation {} complete. Best fitness: {:.4}, mean: {:.4}, best: {}",
            report.generation,
            report.best_fitness.unwrap_or(0.0),
            report.mean_fitness.unwrap_or(0.0),
            report.best_expression.as_deref().unwrap_or("-")
        );
        GenerationControl::Continue
    }
}

// For driving a front end from another thread
pub struct ChannelProgressCallback {
    sender: Sender<ProgressMessage>,
}

#[derive(Debug, Clone)]
pub enum ProgressMessage {
    GenerationStart(usize),
    GenerationComplete(GenerationReport),
}

impl ChannelProgressCallback {
    pub fn new(sender: Sender<ProgressMessage>) -> Self {
        Self { sender }
    }
}

impl ProgressCallback for ChannelProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        let _ = self.sender.send(ProgressMessage::GenerationStart(generation));
    }

    /// A dropped receiver stops the run: nobody is listening any more.
    fn on_generation_complete(&mut self, report: &GenerationReport) -> GenerationControl {
        match self.sender.send(ProgressMessage::GenerationComplete(report.clone())) {
            Ok(()) => GenerationControl::Continue,
            Err(_) => GenerationControl::Stop,
        }
    }
}
