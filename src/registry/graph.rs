//! Static walk over declared requirements.
//!
//! Runs before any constructor, so a missing provider or a cycle is reported
//! without building half of the graph first.

use std::collections::HashSet;

use super::dependency::{Requirement, TypeKey};
use super::error::WiringError;
use super::provider::Slot;
use super::Registry;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum Node {
    Provider(TypeKey),
    Member(TypeKey, usize),
}

pub(super) struct Walk<'r> {
    registry: &'r Registry,
    done: HashSet<Node>,
    path: Vec<(Node, &'static str)>,
}

impl<'r> Walk<'r> {
    pub(super) fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            done: HashSet::new(),
            path: Vec::new(),
        }
    }

    pub(super) fn check(mut self, requirements: &[Requirement]) -> Result<(), WiringError> {
        requirements
            .iter()
            .try_for_each(|requirement| self.requirement(requirement))
    }

    fn requirement(&mut self, requirement: &Requirement) -> Result<(), WiringError> {
        match *requirement {
            Requirement::Type(key) => {
                let slot = self.registry.provider(&key).ok_or_else(|| {
                    WiringError::MissingProvider {
                        type_name: key.name(),
                        required_by: self.path.last().map(|(_, name)| *name),
                    }
                })?;
                self.visit(Node::Provider(key), &slot)
            }
            Requirement::Group(tag) => self
                .registry
                .members(&tag)
                .iter()
                .enumerate()
                .try_for_each(|(index, slot)| self.visit(Node::Member(tag, index), slot)),
        }
    }

    fn visit(&mut self, node: Node, slot: &Slot) -> Result<(), WiringError> {
        if self.done.contains(&node) {
            return Ok(());
        }
        if let Some(start) = self.path.iter().position(|(entry, _)| *entry == node) {
            let mut cycle: Vec<&'static str> =
                self.path[start..].iter().map(|(_, name)| *name).collect();
            cycle.push(slot.type_name);
            return Err(WiringError::Cycle { path: cycle });
        }

        self.path.push((node, slot.type_name));
        for requirement in &slot.requirements {
            self.requirement(requirement)?;
        }
        self.path.pop();
        self.done.insert(node);
        Ok(())
    }
}
