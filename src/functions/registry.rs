use crate::engines::generation::node::Node;
use crate::error::{GpError, Result};
use crate::functions::primitives;
use crate::types::Arity;
use std::sync::Arc;

/// Prototype nodes the engine clones from when it grows trees.
///
/// Names are the lookup key for the text form, so they are stripped of
/// whitespace, parentheses and commas on registration.
pub struct Palette<I> {
    functional: Vec<Node<I>>,
    terminal: Vec<Node<I>>,
}

impl<I: 'static> Palette<I> {
    pub fn new() -> Self {
        Self {
            functional: Vec::new(),
            terminal: Vec::new(),
        }
    }

    pub fn add_functional<F>(&mut self, name: &str, arity: Arity, evaluator: F) -> Result<&mut Self>
    where
        F: Fn(&[f64]) -> anyhow::Result<f64> + Send + Sync + 'static,
    {
        if !arity.is_valid() {
            return Err(GpError::Palette(format!(
                "Functional node {} has min arity {} above max {:?}",
                name, arity.min, arity.max
            )));
        }
        let name = self.register_name(name, "fn");
        self.functional
            .push(Node::new_functional(name, arity, Arc::new(evaluator)));
        Ok(self)
    }

    pub fn add_terminal<F>(&mut self, name: &str, evaluator: F) -> &mut Self
    where
        F: Fn(&I) -> anyhow::Result<f64> + Send + Sync + 'static,
    {
        let name = self.register_name(name, "term");
        self.terminal.push(Node::new_terminal(name, Arc::new(evaluator)));
        self
    }

    /// Terminal that ignores its input and always yields `value`; named
    /// after the value.
    pub fn add_constant(&mut self, value: f64) -> &mut Self {
        self.add_terminal(&value.to_string(), move |_: &I| Ok(value))
    }

    /// `+ - * /` over exactly two operands, division protected.
    pub fn with_arithmetic(mut self) -> Self {
        let operators: [(&str, fn(&[f64]) -> anyhow::Result<f64>); 4] = [
            ("+", primitives::sum),
            ("-", primitives::difference),
            ("*", primitives::product),
            ("/", primitives::protected_quotient),
        ];
        for (name, evaluator) in operators {
            let name = self.register_name(name, "fn");
            self.functional
                .push(Node::new_functional(name, Arity::exact(2), Arc::new(evaluator)));
        }
        self
    }

    pub fn functional(&self) -> &[Node<I>] {
        &self.functional
    }

    pub fn terminal(&self) -> &[Node<I>] {
        &self.terminal
    }

    pub fn is_empty(&self) -> bool {
        self.functional.is_empty() && self.terminal.is_empty()
    }

    /// First prototype carrying `name`, functional nodes searched first.
    pub fn find(&self, name: &str) -> Option<&Node<I>> {
        self.functional
            .iter()
            .chain(self.terminal.iter())
            .find(|node| node.name() == name)
    }

    /// A palette the grow method can work with needs at least one of each
    /// kind: functional roots and terminal leaves.
    pub fn validate(&self) -> Result<()> {
        if self.functional.is_empty() {
            return Err(GpError::Palette("No functional nodes registered".to_string()));
        }
        if self.terminal.is_empty() {
            return Err(GpError::Palette("No terminal nodes registered".to_string()));
        }
        Ok(())
    }

    fn register_name(&self, name: &str, fallback_prefix: &str) -> String {
        let mut name = sanitize_name(name);
        if name.is_empty() {
            name = format!(
                "{}{}",
                fallback_prefix,
                self.functional.len() + self.terminal.len()
            );
        }
        if self.find(&name).is_some() {
            log::warn!(
                "Primitive name {} registered twice; text parsing resolves to the first",
                name
            );
        }
        name
    }
}

impl<I: 'static> Default for Palette<I> {
    fn default() -> Self {
        Self::new()
    }
}

pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '(' | ')' | ','))
        .collect()
}
