//! Target settings.
//!
//! Settings are boolean flags grouped by target. A setting group also defines named *predicates*:
//! boolean expressions over the flags that encodings can require. The predicates are evaluated
//! once when a `Flags` object is created, so testing one while compiling is a bit lookup.
//!
//! A group is described by a `SettingGroup` which never changes once built. Values are configured
//! through a `Builder` which implements the `Configurable` trait, and frozen into `Flags`:
//!
//! ```
//! use cranelift_mips::settings::{self, Configurable};
//! use std::sync::Arc;
//!
//! let mut group = settings::SettingGroupBuilder::new("demo");
//! let fast = group.add_bool("fast", "Use the fast path.", false);
//! let safe = group.add_bool("safe", "Check everything.", true);
//! group.add_predicate("fast_and_safe", fast.and(safe));
//! let group = Arc::new(group.build().unwrap());
//!
//! let mut builder = settings::Builder::new(group);
//! builder.enable("fast").unwrap();
//! let flags = settings::Flags::new(builder);
//! assert_eq!(flags.value("fast"), Some(true));
//! assert_eq!(flags.predicate("fast_and_safe"), Some(true));
//! ```

use crate::result::BuildError;
use core::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A string-based configurator for settings groups.
///
/// The `Configurable` protocol allows settings to be modified by name before a finished `Flags`
/// struct is created.
pub trait Configurable {
    /// Set the string value of any setting by name.
    ///
    /// Boolean settings accept `true`, `on`, `yes`, `1` and their opposites.
    fn set(&mut self, name: &str, value: &str) -> SetResult<()>;

    /// Enable a boolean setting.
    fn enable(&mut self, name: &str) -> SetResult<()>;
}

/// An error produced when changing a setting.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SetError {
    /// No setting by this name exists.
    #[error("No existing setting named '{0}'")]
    BadName(String),

    /// This is not a valid value for this setting.
    #[error("Unexpected value for a setting, expected {0}")]
    BadValue(String),
}

/// A result returned when changing a setting.
pub type SetResult<T> = Result<T, SetError>;

/// Index of a boolean setting or a predicate in a setting group.
///
/// Boolean settings are numbered first, in declaration order, followed by the predicates in
/// declaration order.
pub type SettingPredicateNumber = u8;

/// A boolean expression over the settings of one group.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PredicateNode {
    /// The value of the boolean setting with this number.
    Leaf(SettingPredicateNumber),
    /// Both sides are true.
    And(Box<PredicateNode>, Box<PredicateNode>),
    /// At least one side is true.
    Or(Box<PredicateNode>, Box<PredicateNode>),
    /// The operand is false.
    Not(Box<PredicateNode>),
}

impl PredicateNode {
    /// Combine with `other` so that both must be true.
    pub fn and(self, other: Self) -> Self {
        PredicateNode::And(Box::new(self), Box::new(other))
    }

    /// Combine with `other` so that either may be true.
    pub fn or(self, other: Self) -> Self {
        PredicateNode::Or(Box::new(self), Box::new(other))
    }

    /// Negate this expression.
    pub fn not(self) -> Self {
        PredicateNode::Not(Box::new(self))
    }

    /// Evaluate the expression given the values of the boolean settings.
    ///
    /// Leaves that are out of range evaluate to false.
    pub fn eval(&self, values: &[bool]) -> bool {
        match self {
            PredicateNode::Leaf(n) => values.get(usize::from(*n)).copied().unwrap_or(false),
            PredicateNode::And(a, b) => a.eval(values) && b.eval(values),
            PredicateNode::Or(a, b) => a.eval(values) || b.eval(values),
            PredicateNode::Not(a) => !a.eval(values),
        }
    }

    fn max_leaf(&self) -> SettingPredicateNumber {
        match self {
            PredicateNode::Leaf(n) => *n,
            PredicateNode::And(a, b) | PredicateNode::Or(a, b) => a.max_leaf().max(b.max_leaf()),
            PredicateNode::Not(a) => a.max_leaf(),
        }
    }
}

/// A boolean setting.
#[derive(Clone, Debug)]
pub struct BoolSetting {
    /// Lower snake-case name of the setting.
    pub name: &'static str,
    /// What the setting controls.
    pub description: &'static str,
    /// Value used when the setting isn't configured.
    pub default: bool,
}

/// A named predicate over the settings of a group.
#[derive(Clone, Debug)]
pub struct SettingPredicate {
    /// Lower snake-case name of the predicate.
    pub name: &'static str,
    /// The expression computing the predicate.
    pub node: PredicateNode,
}

/// The description of a group of settings.
#[derive(Clone, Debug)]
pub struct SettingGroup {
    name: &'static str,
    settings: Vec<BoolSetting>,
    predicates: Vec<SettingPredicate>,
}

impl SettingGroup {
    /// Name of the group, as printed in a `[name]` header.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The boolean settings in this group.
    pub fn settings(&self) -> &[BoolSetting] {
        &self.settings
    }

    /// The predicates defined by this group.
    pub fn predicates(&self) -> &[SettingPredicate] {
        &self.predicates
    }

    /// Get the number of a boolean setting or a predicate by name.
    ///
    /// This is the number to test with `PredicateView::test`.
    pub fn predicate_number(&self, name: &str) -> Option<SettingPredicateNumber> {
        self.settings
            .iter()
            .map(|s| s.name)
            .chain(self.predicates.iter().map(|p| p.name))
            .position(|n| n == name)
            .map(|n| n as SettingPredicateNumber)
    }

    fn num_predicates(&self) -> usize {
        self.settings.len() + self.predicates.len()
    }
}

/// Builder for a `SettingGroup`.
pub struct SettingGroupBuilder {
    group: SettingGroup,
}

impl SettingGroupBuilder {
    /// Start describing the settings group `name`.
    pub fn new(name: &'static str) -> Self {
        Self {
            group: SettingGroup {
                name,
                settings: Vec::new(),
                predicates: Vec::new(),
            },
        }
    }

    /// Add a boolean setting, returning a leaf expression that refers to it.
    pub fn add_bool(
        &mut self,
        name: &'static str,
        description: &'static str,
        default: bool,
    ) -> PredicateNode {
        let number = self.group.settings.len() as SettingPredicateNumber;
        self.group.settings.push(BoolSetting {
            name,
            description,
            default,
        });
        PredicateNode::Leaf(number)
    }

    /// Add a named predicate.
    pub fn add_predicate(&mut self, name: &'static str, node: PredicateNode) {
        self.group.predicates.push(SettingPredicate { name, node });
    }

    /// Check the group for consistency and freeze it.
    pub fn build(self) -> Result<SettingGroup, BuildError> {
        let group = self.group;
        let mut names: Vec<&'static str> = Vec::new();
        for name in group
            .settings
            .iter()
            .map(|s| s.name)
            .chain(group.predicates.iter().map(|p| p.name))
        {
            if names.contains(&name) {
                return Err(BuildError::DuplicateSetting(name));
            }
            names.push(name);
        }
        if names.len() > usize::from(SettingPredicateNumber::MAX) {
            return Err(BuildError::FieldOverflow {
                field: "setting number",
                value: names.len() as u32,
                width: 8,
            });
        }
        for p in &group.predicates {
            if usize::from(p.node.max_leaf()) >= group.settings.len() {
                return Err(BuildError::UnknownPredicate(p.name));
            }
        }
        Ok(group)
    }
}

fn parse_bool_value(value: &str) -> SetResult<bool> {
    match value {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(SetError::BadValue("bool".to_string())),
    }
}

/// Collect settings values for one group.
///
/// Each target ISA creates one of these for its settings group, and `Flags` freezes the result.
#[derive(Clone)]
pub struct Builder {
    template: Arc<SettingGroup>,
    values: Vec<bool>,
}

impl Builder {
    /// Create a new builder with the default values of the settings in `template`.
    pub fn new(template: Arc<SettingGroup>) -> Self {
        let values = template.settings.iter().map(|s| s.default).collect();
        Self { template, values }
    }

    /// The group being configured.
    pub fn template(&self) -> &SettingGroup {
        &self.template
    }

    /// Get the current value of a boolean setting.
    pub fn value(&self, name: &str) -> Option<bool> {
        self.lookup(name).ok().map(|i| self.values[i])
    }

    fn lookup(&self, name: &str) -> SetResult<usize> {
        self.template
            .settings
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| SetError::BadName(name.to_string()))
    }
}

impl Configurable for Builder {
    fn set(&mut self, name: &str, value: &str) -> SetResult<()> {
        let index = self.lookup(name)?;
        self.values[index] = parse_bool_value(value)?;
        Ok(())
    }

    fn enable(&mut self, name: &str) -> SetResult<()> {
        let index = self.lookup(name)?;
        self.values[index] = true;
        Ok(())
    }
}

/// A reference to just the boolean predicates of a settings object.
///
/// The settings objects themselves are defined by their groups. A `PredicateView` can test
/// any setting or predicate by number without knowing which group it came from.
#[derive(Clone, Copy)]
pub struct PredicateView<'a>(&'a [u8]);

impl<'a> PredicateView<'a> {
    /// Create a new view of a precomputed predicate vector.
    pub fn new(bits: &'a [u8]) -> Self {
        PredicateView(bits)
    }

    /// Check a numbered predicate.
    pub fn test(self, p: usize) -> bool {
        self.0
            .get(p / 8)
            .is_some_and(|byte| byte & (1 << (p % 8)) != 0)
    }
}

/// Frozen settings values of one group.
///
/// The boolean settings and the predicates computed from them are stored as a packed bit vector.
#[derive(Clone)]
pub struct Flags {
    template: Arc<SettingGroup>,
    bytes: Box<[u8]>,
}

impl Flags {
    /// Create flags from the values collected by `builder`, evaluating all predicates.
    pub fn new(builder: Builder) -> Self {
        let template = builder.template;
        let values = builder.values;
        let mut bytes = vec![0u8; template.num_predicates().div_ceil(8)].into_boxed_slice();
        let predicate_values = template.predicates.iter().map(|p| p.node.eval(&values));
        for (n, value) in values.iter().copied().chain(predicate_values).enumerate() {
            if value {
                bytes[n / 8] |= 1 << (n % 8);
            }
        }
        Self { template, bytes }
    }

    /// The group these flags belong to.
    pub fn template(&self) -> &SettingGroup {
        &self.template
    }

    /// Get a view of the boolean predicates.
    pub fn predicate_view(&self) -> PredicateView<'_> {
        PredicateView::new(&self.bytes)
    }

    /// Dynamic numbered predicate getter.
    pub fn numbered_predicate(&self, p: usize) -> bool {
        self.predicate_view().test(p)
    }

    /// Get the value of a boolean setting by name.
    pub fn value(&self, name: &str) -> Option<bool> {
        let n = self.template.settings.iter().position(|s| s.name == name)?;
        Some(self.numbered_predicate(n))
    }

    /// Get the value of a named predicate.
    pub fn predicate(&self, name: &str) -> Option<bool> {
        let n = self.template.predicate_number(name)?;
        Some(self.numbered_predicate(usize::from(n)))
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "[{}]", self.template.name)?;
        for (n, setting) in self.template.settings.iter().enumerate() {
            writeln!(f, "{} = {}", setting.name, self.numbered_predicate(n))?;
        }
        Ok(())
    }
}

impl fmt::Debug for Flags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
