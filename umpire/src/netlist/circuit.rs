//! Netlist model used by the rules.
//!
//! A [`Circuit`] borrows a sanity-checked instance list and the active
//! library, and derives the net map:
//! - net name -> every (component, terminal) attached to it
//! - role and spec lookups per component
//!
//! Everything here is rebuilt for each evaluation and never mutated.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::library::{ComponentSpec, Library};
use crate::netlist::schema::ComponentInstance;

/// One terminal attached to a net.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Attachment<'a> {
    pub component_id: &'a str,
    pub terminal: &'a str,
}

/// Net name -> attachments, in instance order then terminal order.
#[derive(Debug, Clone, Default)]
pub struct NetMap<'a> {
    nets: BTreeMap<&'a str, Vec<Attachment<'a>>>,
}

impl<'a> NetMap<'a> {
    pub fn build(instances: &'a [ComponentInstance]) -> Self {
        let mut nets: BTreeMap<&'a str, Vec<Attachment<'a>>> = BTreeMap::new();
        for instance in instances {
            for (terminal, net) in &instance.connections {
                nets.entry(net.as_str()).or_default().push(Attachment {
                    component_id: instance.id.as_str(),
                    terminal: terminal.as_str(),
                });
            }
        }
        Self { nets }
    }

    pub fn attachments(&self, net: &str) -> &[Attachment<'a>] {
        self.nets.get(net).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &[Attachment<'a>])> {
        self.nets.iter().map(|(net, a)| (*net, a.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.nets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nets.is_empty()
    }
}

/// Sanity-checked netlist plus the derived lookups rules need.
#[derive(Debug, Clone)]
pub struct Circuit<'a> {
    instances: &'a [ComponentInstance],
    library: &'a Library,
    by_id: HashMap<&'a str, &'a ComponentInstance>,
    net_map: NetMap<'a>,
}

impl<'a> Circuit<'a> {
    /// Build the model. Callers must have run the sanity gate; instances whose
    /// block type is missing from the library simply have no spec.
    pub fn new(instances: &'a [ComponentInstance], library: &'a Library) -> Self {
        let by_id = instances.iter().map(|c| (c.id.as_str(), c)).collect();
        Self {
            instances,
            library,
            by_id,
            net_map: NetMap::build(instances),
        }
    }

    pub fn instances(&self) -> &'a [ComponentInstance] {
        self.instances
    }

    pub fn library(&self) -> &'a Library {
        self.library
    }

    pub fn net_map(&self) -> &NetMap<'a> {
        &self.net_map
    }

    pub fn get_component(&self, id: &str) -> Option<&'a ComponentInstance> {
        self.by_id.get(id).copied()
    }

    /// Library spec for a component id.
    pub fn info_for(&self, id: &str) -> Option<&'a ComponentSpec> {
        self.get_component(id)
            .and_then(|c| self.library.get(&c.block_type))
    }

    /// Library spec for an instance.
    pub fn spec_of(&self, instance: &ComponentInstance) -> Option<&'a ComponentSpec> {
        self.library.get(&instance.block_type)
    }

    /// Components holding `role`, in netlist order.
    pub fn components_with_role(&self, role: &str) -> Vec<&'a ComponentInstance> {
        self.instances
            .iter()
            .filter(|c| self.spec_of(c).map(|s| s.has_role(role)).unwrap_or(false))
            .collect()
    }

    /// Union of roles held by any component.
    pub fn roles_present(&self) -> BTreeSet<&'a str> {
        self.instances
            .iter()
            .filter_map(|c| self.spec_of(c))
            .flat_map(|s| s.roles.iter().map(String::as_str))
            .collect()
    }

    /// Distinct nets a component is wired to.
    pub fn nets_for_component(&self, id: &str) -> BTreeSet<&'a str> {
        self.get_component(id)
            .map(|c| c.connections.values().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn stats(&self) -> CircuitStats {
        CircuitStats {
            component_count: self.instances.len(),
            net_count: self.net_map.len(),
            attachment_count: self.instances.iter().map(|c| c.connections.len()).sum(),
        }
    }
}

/// Statistics about a circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CircuitStats {
    pub component_count: usize,
    pub net_count: usize,
    pub attachment_count: usize,
}
