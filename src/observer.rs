//! Optional instrumentation for debuggers and visualisers.
//!
//! Every hook defaults to a no-op and the interpreter never reads anything
//! back from an observer, so attaching one cannot change a program's result.

use log::{debug, info, trace};

use crate::ast::NodeKind;
use crate::diagnostics::CallFrame;
use crate::token::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPhase {
    Before,
    After,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    /// A line written by `print`.
    Log(String),
    /// The rendered runtime error that ended the program.
    Error(String),
    /// Inspected result of the program's last statement.
    ReturnValue(String),
    /// A binding was declared or reassigned.
    Assignment { name: String, value: String },
}

pub trait Observer {
    fn on_step(&mut self, _kind: NodeKind, _position: Position, _phase: StepPhase) {}

    fn on_output(&mut self, _event: &OutputEvent) {}

    fn on_call_push(&mut self, _frame: &CallFrame) {}

    fn on_call_pop(&mut self, _frame: &CallFrame) {}
}

/// Reports every event through `log`; used by `sprig run --trace`.
#[derive(Debug, Default)]
pub struct LogObserver {
    depth: usize,
}

impl Observer for LogObserver {
    fn on_step(&mut self, kind: NodeKind, position: Position, phase: StepPhase) {
        trace!("{:indent$}{:?} {} at {}", "", phase, kind, position, indent = self.depth * 2);
    }

    fn on_output(&mut self, event: &OutputEvent) {
        info!("output: {:?}", event);
    }

    fn on_call_push(&mut self, frame: &CallFrame) {
        debug!("{:indent$}-> {}", "", frame, indent = self.depth * 2);
        self.depth += 1;
    }

    fn on_call_pop(&mut self, frame: &CallFrame) {
        self.depth = self.depth.saturating_sub(1);
        debug!("{:indent$}<- {}", "", frame.name, indent = self.depth * 2);
    }
}

/// Records every event in order; handy for tests and replay tools.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Recorder {
    pub steps: Vec<(NodeKind, Position, StepPhase)>,
    pub outputs: Vec<OutputEvent>,
    pub calls: Vec<String>,
}

impl Observer for Recorder {
    fn on_step(&mut self, kind: NodeKind, position: Position, phase: StepPhase) {
        self.steps.push((kind, position, phase));
    }

    fn on_output(&mut self, event: &OutputEvent) {
        self.outputs.push(event.clone());
    }

    fn on_call_push(&mut self, frame: &CallFrame) {
        self.calls.push(format!("push {}", frame.name));
    }

    fn on_call_pop(&mut self, frame: &CallFrame) {
        self.calls.push(format!("pop {}", frame.name));
    }
}

impl<T: Observer + ?Sized> Observer for std::rc::Rc<std::cell::RefCell<T>> {
    fn on_step(&mut self, kind: NodeKind, position: Position, phase: StepPhase) {
        self.borrow_mut().on_step(kind, position, phase);
    }

    fn on_output(&mut self, event: &OutputEvent) {
        self.borrow_mut().on_output(event);
    }

    fn on_call_push(&mut self, frame: &CallFrame) {
        self.borrow_mut().on_call_push(frame);
    }

    fn on_call_pop(&mut self, frame: &CallFrame) {
        self.borrow_mut().on_call_pop(frame);
    }
}
