// Dweve Sift - Rule-Driven Text Parsing Engine
//
// Copyright (c) 2025 Dweve IP B.V. and individual contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Process-wide registry of class-level rules.
//!
//! Rule classes play the role inheritance hierarchies play in dynamic
//! languages: a class is a named, ordered rule list that engines opt into
//! with [`Parser::of_class`](crate::Parser::of_class). A class inherits its
//! superclasses' rules (in declaration order), may insert its own rules at
//! anchored positions, disable inherited rules, clone existing rules with
//! overrides, and install a custom unwrap style as its default.
//!
//! The registry is populated at setup time and read (snapshot per read) by
//! engines; it is a process-global keyed by class name, guarded by a
//! mutex. Rule names are qualified as `Class/rule` and must be unique.

use crate::error::{SiftError, SiftResult};
use crate::limits::Limits;
use crate::rule::{Anchor, Rule, RuleOpts};
use crate::unwrap::{UnwrapRoutines, WrapStyle};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

/// Rule names a class cannot use.
const RESERVED_NAMES: &[&str] = &["BEGIN", "END"];

/// Selects inherited rules for disabling.
#[derive(Clone)]
pub enum RuleSelector {
    /// An exact fully-qualified `Class/rule` name.
    Name(String),
    /// All inherited rules whose qualified name matches.
    Pattern(Regex),
    /// All inherited rules for which the callable returns true.
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl std::fmt::Debug for RuleSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleSelector::Name(n) => write!(f, "Name({:?})", n),
            RuleSelector::Pattern(p) => write!(f, "Pattern(/{}/)", p.as_str()),
            RuleSelector::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}

/// Overrides applied when cloning a rule.
#[derive(Debug, Clone, Default)]
pub struct RuleOverrides {
    predicate: Option<String>,
    action: Option<String>,
    append_action: Option<String>,
    prepend_action: Option<String>,
    preconditions: Vec<String>,
    dont_record: Option<bool>,
    continue_to_next: Option<bool>,
    anchor: Option<Anchor>,
}

impl RuleOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the predicate source.
    pub fn when(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    /// Replace the action source.
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Append statements to the cloned action.
    pub fn append_action(mut self, action: impl Into<String>) -> Self {
        self.append_action = Some(action.into());
        self
    }

    /// Prepend statements to the cloned action.
    pub fn prepend_action(mut self, action: impl Into<String>) -> Self {
        self.prepend_action = Some(action.into());
        self
    }

    /// Add a precondition to the clone.
    pub fn precondition(mut self, predicate: impl Into<String>) -> Self {
        self.preconditions.push(predicate.into());
        self
    }

    pub fn dont_record(mut self, flag: bool) -> Self {
        self.dont_record = Some(flag);
        self
    }

    pub fn continue_to_next(mut self, flag: bool) -> Self {
        self.continue_to_next = Some(flag);
        self
    }

    /// Insert the clone before an inherited rule.
    pub fn before(mut self, qualified_name: impl Into<String>) -> Self {
        self.anchor = Some(Anchor::Before(qualified_name.into()));
        self
    }

    /// Insert the clone after an inherited rule.
    pub fn after(mut self, qualified_name: impl Into<String>) -> Self {
        self.anchor = Some(Anchor::After(qualified_name.into()));
        self
    }
}

/// Defaults a class contributes to engines constructed with it.
#[derive(Debug, Clone, Default)]
pub struct ClassDefaults {
    /// Classes with rules turn auto-split on by default.
    pub auto_split: bool,
    /// Installed by `unwraps_lines_using`.
    pub unwrap_routines: Option<UnwrapRoutines>,
    /// `Custom` when unwrap routines are installed.
    pub line_wrap_style: Option<WrapStyle>,
}

#[derive(Debug, Default)]
struct ClassEntry {
    supers: Vec<String>,
    /// Ordered fully-qualified rule names.
    order: Vec<String>,
    /// Compiled rules by qualified name; the dispatch list is rebuilt from
    /// `order` on every mutation.
    rules: HashMap<String, Rule>,
    /// Qualified names declared (or cloned) by this class itself.
    own: HashSet<String>,
    /// The order has been seeded from the superclasses.
    seeded: bool,
    auto_split_default: bool,
    unwrap_routines: Option<UnwrapRoutines>,
}

#[derive(Debug, Default)]
struct Registry {
    classes: HashMap<String, ClassEntry>,
}

static REGISTRY: Lazy<Mutex<Registry>> = Lazy::new(|| Mutex::new(Registry::default()));

fn lock() -> std::sync::MutexGuard<'static, Registry> {
    REGISTRY.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Validate a class name. The "main" namespace cannot hold class rules.
fn check_class_name(class: &str) -> SiftResult<()> {
    if class.trim().is_empty() {
        return Err(SiftError::registry("class name must not be empty"));
    }
    if class == "main" {
        return Err(SiftError::registry(
            "rules cannot be registered from the main namespace",
        ));
    }
    if class.contains('/') {
        return Err(SiftError::registry(format!(
            "class name '{}' must not contain '/'",
            class
        )));
    }
    Ok(())
}

/// Declare a class and its superclasses (in inheritance order).
///
/// Declaring a class twice replaces its superclass list only if the class
/// has not yet seeded its rule order.
pub fn define_class(class: &str, supers: &[&str]) -> SiftResult<()> {
    check_class_name(class)?;
    for sup in supers {
        check_class_name(sup)?;
    }
    let mut reg = lock();
    let entry = reg.classes.entry(class.to_string()).or_default();
    if entry.seeded {
        return Err(SiftError::registry(format!(
            "class '{}' already has rules; superclasses cannot change",
            class
        )));
    }
    entry.supers = supers.iter().map(|s| s.to_string()).collect();
    Ok(())
}

/// Resolved rule order of a class, walking unseeded classes recursively.
fn resolved_order(reg: &Registry, class: &str) -> Vec<String> {
    match reg.classes.get(class) {
        None => Vec::new(),
        Some(entry) if entry.seeded => entry.order.clone(),
        Some(entry) => {
            let mut order = Vec::new();
            for sup in &entry.supers {
                for qname in resolved_order(reg, sup) {
                    if !order.contains(&qname) {
                        order.push(qname);
                    }
                }
            }
            order
        }
    }
}

fn resolved_rule(reg: &Registry, class: &str, qname: &str) -> Option<Rule> {
    let entry = reg.classes.get(class)?;
    if let Some(rule) = entry.rules.get(qname) {
        return Some(rule.clone());
    }
    for sup in &entry.supers {
        if let Some(rule) = resolved_rule(reg, sup, qname) {
            return Some(rule);
        }
    }
    None
}

/// Seed a class's order and rule map from its superclasses.
fn seed(reg: &mut Registry, class: &str) {
    if reg.classes.get(class).map(|e| e.seeded).unwrap_or(false) {
        return;
    }
    let order = resolved_order(reg, class);
    let rules: Vec<(String, Rule)> = order
        .iter()
        .filter_map(|qname| resolved_rule(reg, class, qname).map(|r| (qname.clone(), r)))
        .collect();

    let entry = reg.classes.entry(class.to_string()).or_default();
    entry.order = order;
    entry.rules.extend(rules);
    entry.seeded = true;
}

fn insert_position(
    class: &str,
    entry: &ClassEntry,
    anchor: &Anchor,
) -> SiftResult<usize> {
    let (qname, offset) = match anchor {
        Anchor::Before(q) => (q, 0),
        Anchor::After(q) => (q, 1),
    };
    if !qname.contains('/') {
        return Err(SiftError::registry(format!(
            "anchor '{}' must be a fully-qualified Class/rule name",
            qname
        )));
    }
    if entry.own.contains(qname) {
        return Err(SiftError::registry(format!(
            "anchor '{}' must name an inherited rule, not one of class '{}'",
            qname, class
        )));
    }
    match entry.order.iter().position(|q| q == qname) {
        None => Err(SiftError::registry(format!(
            "anchor references a non-existent rule '{}'",
            qname
        ))),
        Some(pos) => Ok(pos + offset),
    }
}

/// Register a named rule into a class.
///
/// The first registration seeds the class's rule order from its declared
/// superclasses. Registering a rule turns auto-split on by default for
/// engines of this class.
pub fn applies_rule(class: &str, name: &str, opts: RuleOpts) -> SiftResult<()> {
    check_class_name(class)?;
    if name.trim().is_empty() {
        return Err(SiftError::registry("rule name must not be empty"));
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(SiftError::registry(format!(
            "rule name '{}' is reserved",
            name
        )));
    }
    if name.contains('/') {
        return Err(SiftError::registry(format!(
            "rule name '{}' must not contain '/'",
            name
        )));
    }

    let anchors = opts.anchors().to_vec();
    if anchors.len() > 1 {
        return Err(SiftError::registry(
            "exactly one of before/after may be given",
        ));
    }

    let mut rule = Rule::compile(opts, &Limits::default())?;
    let qname = format!("{}/{}", class, name);
    rule.set_name(qname.clone());

    let mut reg = lock();
    seed(&mut reg, class);
    let entry = reg
        .classes
        .get_mut(class)
        .expect("seed creates the entry");

    if entry.order.contains(&qname) {
        return Err(SiftError::registry(format!(
            "duplicate rule name '{}'",
            qname
        )));
    }

    let position = match anchors.first() {
        None => entry.order.len(),
        Some(anchor) => insert_position(class, entry, anchor)?,
    };

    entry.order.insert(position, qname.clone());
    entry.rules.insert(qname.clone(), rule);
    entry.own.insert(qname);
    entry.auto_split_default = true;
    Ok(())
}

/// Remove inherited rules matching any selector from a class's order.
///
/// Rules the class itself declared cannot be disabled: naming one exactly
/// is an error; patterns and predicates skip them.
pub fn disables_superclass_rules(class: &str, selectors: &[RuleSelector]) -> SiftResult<()> {
    check_class_name(class)?;
    let mut reg = lock();
    if !reg.classes.contains_key(class) {
        return Err(SiftError::registry(format!("unknown class '{}'", class)));
    }
    seed(&mut reg, class);
    let entry = reg.classes.get_mut(class).expect("checked above");

    let mut to_remove: HashSet<String> = HashSet::new();
    for selector in selectors {
        match selector {
            RuleSelector::Name(qname) => {
                if !qname.contains('/') {
                    return Err(SiftError::registry(format!(
                        "'{}' is not a fully-qualified Class/rule name",
                        qname
                    )));
                }
                if entry.own.contains(qname) {
                    return Err(SiftError::registry(format!(
                        "cannot disable rule '{}' of class '{}' itself",
                        qname, class
                    )));
                }
                if !entry.order.contains(qname) {
                    return Err(SiftError::registry(format!(
                        "cannot disable non-existent rule '{}'",
                        qname
                    )));
                }
                to_remove.insert(qname.clone());
            }
            RuleSelector::Pattern(re) => {
                for qname in &entry.order {
                    if !entry.own.contains(qname) && re.is_match(qname) {
                        to_remove.insert(qname.clone());
                    }
                }
            }
            RuleSelector::Predicate(pred) => {
                for qname in &entry.order {
                    if !entry.own.contains(qname) && pred(qname) {
                        to_remove.insert(qname.clone());
                    }
                }
            }
        }
    }

    entry.order.retain(|q| !to_remove.contains(q));
    for qname in &to_remove {
        entry.rules.remove(qname);
    }
    Ok(())
}

/// Clone an existing rule (inherited or own) into a class under a new
/// name, with overrides. The original stays where it is.
pub fn clones_rule(
    class: &str,
    new_name: &str,
    from: &str,
    overrides: RuleOverrides,
) -> SiftResult<()> {
    check_class_name(class)?;
    if new_name.trim().is_empty() {
        return Err(SiftError::registry("rule name must not be empty"));
    }
    if RESERVED_NAMES.contains(&new_name) {
        return Err(SiftError::registry(format!(
            "rule name '{}' is reserved",
            new_name
        )));
    }

    let limits = Limits::default();
    let mut reg = lock();
    seed(&mut reg, class);
    let entry = reg
        .classes
        .get_mut(class)
        .expect("seed creates the entry");

    let Some(original) = entry.rules.get(from) else {
        return Err(SiftError::registry(format!(
            "cannot clone non-existent rule '{}'",
            from
        )));
    };

    let qname = format!("{}/{}", class, new_name);
    if entry.order.contains(&qname) {
        return Err(SiftError::registry(format!(
            "duplicate rule name '{}'",
            qname
        )));
    }

    let mut clone = original.clone();
    clone.set_name(qname.clone());
    if let Some(src) = &overrides.predicate {
        clone.set_predicate(src, &limits)?;
    }
    if let Some(src) = &overrides.action {
        clone.set_action(src, &limits)?;
    }
    if let Some(src) = &overrides.prepend_action {
        clone.prepend_action(src, &limits)?;
    }
    if let Some(src) = &overrides.append_action {
        clone.append_action(src, &limits)?;
    }
    for src in &overrides.preconditions {
        clone.add_precondition(src, &limits)?;
    }
    if let Some(flag) = overrides.dont_record {
        clone.set_dont_record(flag)?;
    }
    if let Some(flag) = overrides.continue_to_next {
        clone.set_continue_to_next(flag)?;
    }

    let position = match &overrides.anchor {
        None => entry.order.len(),
        Some(anchor) => insert_position(class, entry, anchor)?,
    };

    entry.order.insert(position, qname.clone());
    entry.rules.insert(qname.clone(), clone);
    entry.own.insert(qname);
    entry.auto_split_default = true;
    Ok(())
}

/// Install custom unwrap routines as a class default. Engines of this
/// class start with `line_wrap_style = Custom` and these routines.
pub fn unwraps_lines_using(class: &str, routines: UnwrapRoutines) -> SiftResult<()> {
    check_class_name(class)?;
    let mut reg = lock();
    let entry = reg.classes.entry(class.to_string()).or_default();
    entry.unwrap_routines = Some(routines);
    Ok(())
}

/// The resolved, ordered rule list of a class. Engines snapshot this at
/// the start of every read.
pub fn rules_for(class: &str) -> Vec<Rule> {
    let reg = lock();
    let order = resolved_order(&reg, class);
    order
        .iter()
        .filter_map(|qname| resolved_rule(&reg, class, qname))
        .collect()
}

/// The ordered, fully-qualified rule names of a class.
pub fn rule_names_for(class: &str) -> Vec<String> {
    let reg = lock();
    resolved_order(&reg, class)
}

/// Defaults a class contributes to engines constructed with it.
pub fn class_defaults(class: &str) -> ClassDefaults {
    let reg = lock();
    let mut defaults = ClassDefaults::default();
    // auto-split is inherited: any class in the chain with rules sets it
    fn walk(reg: &Registry, class: &str, defaults: &mut ClassDefaults) {
        if let Some(entry) = reg.classes.get(class) {
            if entry.auto_split_default {
                defaults.auto_split = true;
            }
            if defaults.unwrap_routines.is_none() {
                if let Some(routines) = &entry.unwrap_routines {
                    defaults.unwrap_routines = Some(routines.clone());
                    defaults.line_wrap_style = Some(WrapStyle::Custom);
                }
            }
            for sup in &entry.supers {
                walk(reg, sup, defaults);
            }
        }
    }
    walk(&reg, class, &mut defaults);
    if !rules_present(&reg, class) {
        defaults.auto_split = false;
    }
    defaults
}

fn rules_present(reg: &Registry, class: &str) -> bool {
    !resolved_order(reg, class).is_empty()
}

/// Clear the whole registry. Test support: the registry is process-global,
/// so concurrent tests touching the same classes must serialize.
pub fn reset() {
    lock().classes.clear();
}
