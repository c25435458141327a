use crate::library::{roles, DeviceType, TerminalKind};
use crate::netlist::{Attachment, Circuit, Goals, InputTopology};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Identifiers of every diagnostic the built-in checks can produce.
pub mod rule_ids {
    pub const UNPARSEABLE: &str = "F0.0";
    pub const NOT_A_LIST: &str = "F0.1";
    pub const NOT_A_RECORD: &str = "F0.2";
    pub const MALFORMED_RECORD: &str = "F0.3";
    pub const UNKNOWN_BLOCK: &str = "F0.4";
    pub const DUPLICATE_ID: &str = "F0.5";
    pub const FLOATING_NET: &str = "C1";
    pub const LOAD_MISMATCH: &str = "K1";
    pub const ESSENTIAL_ROLES: &str = "S1";
    pub const MISSING_LOAD: &str = "S1.1";
    pub const MISSING_BIAS: &str = "S1.2";
    pub const GOAL_INPUT_TYPE: &str = "G1";
}

/// Most severe first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Fatal,
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Fatal => "FATAL",
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic category. Declaration order is the report order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// The payload itself is malformed.
    Format,
    /// Wiring between components.
    Connection,
    /// Choice or absence of components.
    Component,
    /// Stated design goals not met.
    Goal,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Format,
        Category::Connection,
        Category::Component,
        Category::Goal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Format => "format",
            Category::Connection => "connection",
            Category::Component => "component",
            Category::Goal => "goal",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule-specific structured data attached to a diagnostic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Details(BTreeMap<String, Value>);

impl Details {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String field, or `None` when absent or not a string.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// String items of an array field; non-string items are skipped.
    pub fn list(&self, key: &str) -> Vec<&str> {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compact JSON with keys in sorted order.
    pub fn to_canonical_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_default()
    }
}

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: Severity,
    pub category: Category,
    pub rule_id: String,
    pub details: Details,
}

impl Diagnostic {
    pub fn new(level: Severity, category: Category, rule_id: impl Into<String>, details: Details) -> Self {
        Self {
            level,
            category,
            rule_id: rule_id.into(),
            details,
        }
    }

    pub fn fatal(rule_id: impl Into<String>, details: Details) -> Self {
        Self::new(Severity::Fatal, Category::Format, rule_id, details)
    }

    pub fn error(category: Category, rule_id: impl Into<String>, details: Details) -> Self {
        Self::new(Severity::Error, category, rule_id, details)
    }

    pub fn warning(category: Category, rule_id: impl Into<String>, details: Details) -> Self {
        Self::new(Severity::Warning, category, rule_id, details)
    }
}

/// Sort into report order: category, then severity, then rule id, then
/// details. The order is total, so it does not depend on evaluation order.
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by_cached_key(|d| {
        (d.category, d.level, d.rule_id.clone(), d.details.to_canonical_json())
    });
}

pub trait Rule: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn category(&self) -> Category;
    fn check(&self, circuit: &Circuit<'_>, goals: &Goals) -> Vec<Diagnostic>;
}

pub struct RulesEngine {
    rules: Vec<Arc<dyn Rule>>,
}

impl RulesEngine {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_default_rules() -> Self {
        let mut engine = Self::new();
        engine.add_rule(Arc::new(FloatingNetRule));
        engine.add_rule(Arc::new(LoadCompatibilityRule::default()));
        engine.add_rule(Arc::new(EssentialRoleRule));
        engine.add_rule(Arc::new(GoalConformanceRule));
        engine
    }

    pub fn add_rule(&mut self, rule: Arc<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    pub fn has_rule(&self, id: &str) -> bool {
        self.rules.iter().any(|r| r.id() == id)
    }

    /// First id in `selected` that names no registered rule.
    pub fn find_unknown<'s>(&self, selected: &'s [String]) -> Option<&'s str> {
        selected
            .iter()
            .map(String::as_str)
            .find(|id| !self.has_rule(id))
    }

    /// Run every rule and return the sorted, concatenated diagnostics.
    pub fn analyze(&self, circuit: &Circuit<'_>, goals: &Goals) -> Vec<Diagnostic> {
        self.analyze_selected(circuit, goals, &[])
    }

    /// Run the rules whose id is in `selected` (all rules when empty).
    pub fn analyze_selected(
        &self,
        circuit: &Circuit<'_>,
        goals: &Goals,
        selected: &[String],
    ) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for rule in &self.rules {
            if !selected.is_empty() && !selected.iter().any(|id| id == rule.id()) {
                continue;
            }
            let found = rule.check(circuit, goals);
            tracing::debug!("Rule {} produced {} diagnostic(s)", rule.id(), found.len());
            diagnostics.extend(found);
        }
        sort_diagnostics(&mut diagnostics);
        diagnostics
    }
}

impl Default for RulesEngine {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

// Helper functions

/// Supply rails are exempt from connectivity checks.
pub fn is_supply_rail(net: &str) -> bool {
    net.eq_ignore_ascii_case("VDD") || net.eq_ignore_ascii_case("GND")
}

/// A lone voltage-input terminal marks a net driven from outside the netlist.
fn is_external_input_port(circuit: &Circuit<'_>, attachment: &Attachment<'_>) -> bool {
    circuit
        .info_for(attachment.component_id)
        .and_then(|spec| spec.terminal_kind(attachment.terminal))
        == Some(TerminalKind::VInput)
}

// Rule implementations

pub struct FloatingNetRule;

impl Rule for FloatingNetRule {
    fn id(&self) -> &str {
        rule_ids::FLOATING_NET
    }

    fn name(&self) -> &str {
        "Floating Net Check"
    }

    fn description(&self) -> &str {
        "Every signal net except VDD/GND must connect at least two terminals; a net fed only by one V_INPUT terminal is an external input port"
    }

    fn category(&self) -> Category {
        Category::Connection
    }

    fn check(&self, circuit: &Circuit<'_>, _goals: &Goals) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for (net, attachments) in circuit.net_map().iter() {
            if is_supply_rail(net) || attachments.len() >= 2 {
                continue;
            }
            let Some(sole) = attachments.first() else {
                continue;
            };
            if is_external_input_port(circuit, sole) {
                continue;
            }

            diagnostics.push(Diagnostic::error(
                self.category(),
                self.id(),
                Details::new()
                    .with("net_name", net)
                    .with("component_id", sole.component_id)
                    .with("terminal", sole.terminal),
            ));
        }

        diagnostics
    }
}

/// Flags gain stages of one device kind driving an active load of the wrong
/// kind. The default pairing is NMOS stage / PMOS load and nothing else.
pub struct LoadCompatibilityRule {
    pub stage_device: DeviceType,
    pub required_load_device: DeviceType,
}

impl Default for LoadCompatibilityRule {
    fn default() -> Self {
        Self {
            stage_device: DeviceType::Nmos,
            required_load_device: DeviceType::Pmos,
        }
    }
}

impl Rule for LoadCompatibilityRule {
    fn id(&self) -> &str {
        rule_ids::LOAD_MISMATCH
    }

    fn name(&self) -> &str {
        "Stage/Load Device Compatibility"
    }

    fn description(&self) -> &str {
        "An NMOS gain stage's current outputs must be loaded by PMOS active loads"
    }

    fn category(&self) -> Category {
        Category::Component
    }

    fn check(&self, circuit: &Circuit<'_>, _goals: &Goals) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let mut reported: BTreeSet<(&str, &str, &str)> = BTreeSet::new();

        for stage in circuit.components_with_role(roles::GAIN_STAGE) {
            let Some(stage_spec) = circuit.spec_of(stage) else {
                continue;
            };
            if stage_spec.device_type != self.stage_device {
                continue;
            }

            let output_nets: BTreeSet<&str> = stage_spec
                .terminals_of_kind(TerminalKind::IOutput)
                .filter_map(|t| stage.net_of(t))
                .collect();

            for net in output_nets {
                for attachment in circuit.net_map().attachments(net) {
                    if attachment.component_id == stage.id {
                        continue;
                    }
                    let Some(load_spec) = circuit.info_for(attachment.component_id) else {
                        continue;
                    };
                    if !load_spec.has_role(roles::LOAD_ACTIVE)
                        || load_spec.device_type == self.required_load_device
                    {
                        continue;
                    }
                    if !reported.insert((stage.id.as_str(), attachment.component_id, net)) {
                        continue;
                    }

                    diagnostics.push(Diagnostic::error(
                        self.category(),
                        self.id(),
                        Details::new()
                            .with("stage_id", stage.id.as_str())
                            .with("load_id", attachment.component_id)
                            .with("net_name", net)
                            .with("load_device", load_spec.device_type.to_string())
                            .with("required_device", self.required_load_device.to_string()),
                    ));
                }
            }
        }

        diagnostics
    }
}

pub struct EssentialRoleRule;

impl Rule for EssentialRoleRule {
    fn id(&self) -> &str {
        rule_ids::ESSENTIAL_ROLES
    }

    fn name(&self) -> &str {
        "Essential Role Completeness"
    }

    fn description(&self) -> &str {
        "A design with a gain stage needs an active load (error) and a bias source (warning)"
    }

    fn category(&self) -> Category {
        Category::Component
    }

    fn check(&self, circuit: &Circuit<'_>, _goals: &Goals) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let present = circuit.roles_present();

        if !present.contains(roles::GAIN_STAGE) {
            return diagnostics;
        }
        if !present.contains(roles::LOAD_ACTIVE) {
            diagnostics.push(Diagnostic::error(
                self.category(),
                rule_ids::MISSING_LOAD,
                Details::new().with("missing_role", roles::LOAD_ACTIVE),
            ));
        }
        if !present.contains(roles::BIAS_SOURCE) {
            diagnostics.push(Diagnostic::warning(
                self.category(),
                rule_ids::MISSING_BIAS,
                Details::new().with("missing_role", roles::BIAS_SOURCE),
            ));
        }

        diagnostics
    }
}

pub struct GoalConformanceRule;

impl Rule for GoalConformanceRule {
    fn id(&self) -> &str {
        rule_ids::GOAL_INPUT_TYPE
    }

    fn name(&self) -> &str {
        "Input Topology Goal"
    }

    fn description(&self) -> &str {
        "When the goals ask for a differential input, some component must hold DIFFERENTIAL_INPUT"
    }

    fn category(&self) -> Category {
        Category::Goal
    }

    fn check(&self, circuit: &Circuit<'_>, goals: &Goals) -> Vec<Diagnostic> {
        if goals.input_type() != Some(InputTopology::Differential) {
            return Vec::new();
        }
        if !circuit.components_with_role(roles::DIFFERENTIAL_INPUT).is_empty() {
            return Vec::new();
        }

        let mut found: Vec<&str> = circuit
            .components_with_role(roles::SINGLE_ENDED_INPUT)
            .into_iter()
            .map(|c| c.id.as_str())
            .collect();
        found.sort_unstable();

        vec![Diagnostic::error(
            self.category(),
            self.id(),
            Details::new()
                .with("goal", InputTopology::Differential.label())
                .with("found", found),
        )]
    }
}
