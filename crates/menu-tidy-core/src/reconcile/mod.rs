//! Diff between the saved layout and the live tree.
//!
//! Matching works on canonical keys (see [`NameNormalizer`]). When two or more
//! configured items share a canonical key, each of them is matched by its full
//! name instead, so that e.g. 32-bit and 64-bit variants stay distinct.
//!
//! Keys are case-folded, as file names are on Windows; the configured name is
//! kept for recreation and reporting.
//!
//! Ties between copies of the same item are broken by traversal order: the
//! first copy already in its expected folder survives, otherwise the first
//! copy seen.

pub mod action;

pub use action::{Action, Plan, PlanNote};

use crate::model::{ConfigModel, FolderPath, ItemMetadata};
use crate::normalize::NameNormalizer;
use crate::scanner::Snapshot;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    pub quarantine_folder: FolderPath,
    pub protected_folders: Vec<FolderPath>,
}

#[derive(Debug, Clone)]
struct ConfiguredEntry {
    name: String,
    folder: FolderPath,
    metadata: ItemMetadata,
}

/// Lookup tables derived from the layout.
struct Expectations {
    /// Case-folded canonical key to the distinct case-folded full names
    /// configured under it.
    variants: HashMap<String, HashSet<String>>,
    /// Case-folded lookup key (full name for variants, canonical key
    /// otherwise) to entry.
    expected: HashMap<String, ConfiguredEntry>,
    /// Lookup keys in layout order.
    order: Vec<String>,
}

pub struct Reconciler {
    normalizer: NameNormalizer,
    options: ReconcileOptions,
}

impl Reconciler {
    pub fn new(normalizer: NameNormalizer, options: ReconcileOptions) -> Self {
        Self {
            normalizer,
            options,
        }
    }

    /// Plan the changes that bring `observed` in line with `config`. Pure:
    /// performs no I/O.
    pub fn reconcile(&mut self, config: &ConfigModel, observed: &Snapshot) -> Plan {
        let mut plan = Plan::default();
        let expectations = self.build_expectations(config, &mut plan.notes);

        // Classify observed items: known ones grouped by lookup key, in
        // first-seen order; unknown ones kept in traversal order.
        let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
        let mut group_order: Vec<String> = Vec::new();
        let mut unknown: Vec<usize> = Vec::new();

        for (index, item) in observed.items.iter().enumerate() {
            match self.match_key(&item.name, &expectations) {
                Some(key) => {
                    let copies = groups.entry(key.clone()).or_default();
                    if copies.is_empty() {
                        group_order.push(key);
                    }
                    copies.push(index);
                }
                None => unknown.push(index),
            }
        }

        let mut satisfied: HashSet<&str> = HashSet::new();
        let mut deletes: Vec<(usize, Action)> = Vec::new();
        // Items that will be in the quarantine folder before quarantining starts.
        let quarantine = &self.options.quarantine_folder;
        let mut reserved: HashSet<String> = HashSet::new();

        for key in &group_order {
            let entry = &expectations.expected[key];
            let copies = &groups[key];

            let survivor = copies
                .iter()
                .copied()
                .find(|&i| observed.items[i].folder == entry.folder)
                .unwrap_or(copies[0]);

            if copies.len() > 1 {
                let note = PlanNote::DuplicateResolved {
                    key: entry.name.clone(),
                    kept: observed.items[survivor].folder.clone(),
                    copies: copies.len(),
                };
                info!("{}", note);
                plan.notes.push(note);
            }

            for &i in copies.iter().filter(|&&i| i != survivor) {
                let item = &observed.items[i];
                if &item.folder == quarantine {
                    reserved.insert(item.name.to_lowercase());
                }
                deletes.push((
                    i,
                    Action::DeleteDuplicate {
                        item: item.name.clone(),
                        folder: item.folder.clone(),
                    },
                ));
            }

            let item = &observed.items[survivor];
            if item.folder != entry.folder {
                plan.moves.push(Action::Move {
                    item: item.name.clone(),
                    from: item.folder.clone(),
                    to: entry.folder.clone(),
                });
            }
            if &entry.folder == quarantine {
                reserved.insert(item.name.to_lowercase());
            }
            satisfied.insert(key.as_str());
        }

        deletes.sort_by_key(|(i, _)| *i);
        plan.duplicate_deletes = deletes.into_iter().map(|(_, action)| action).collect();

        for key in &expectations.order {
            if satisfied.contains(key.as_str()) {
                continue;
            }
            let entry = &expectations.expected[key];
            if entry.metadata.can_recreate() {
                if &entry.folder == quarantine {
                    reserved.insert(entry.name.to_lowercase());
                }
                plan.recreations.push(Action::Recreate {
                    item: entry.name.clone(),
                    folder: entry.folder.clone(),
                    metadata: entry.metadata.clone(),
                });
            } else {
                let note = PlanNote::MissingWithoutMetadata {
                    item: entry.name.clone(),
                    folder: entry.folder.clone(),
                };
                info!("{}", note);
                plan.notes.push(note);
            }
        }

        // Unknown items already in quarantine stay put and keep their names.
        for &i in &unknown {
            let item = &observed.items[i];
            if &item.folder == quarantine {
                reserved.insert(item.name.to_lowercase());
            }
        }
        for &i in &unknown {
            let item = &observed.items[i];
            if &item.folder == quarantine {
                continue;
            }
            let target_name = unique_name(&item.name, &reserved);
            reserved.insert(target_name.to_lowercase());
            plan.quarantines.push(Action::Quarantine {
                item: item.name.clone(),
                from: item.folder.clone(),
                to: quarantine.clone(),
                rename_to: (target_name != item.name).then_some(target_name),
            });
        }

        plan.empty_folder_deletes = self.empty_folders(config, observed, &plan);

        for action in plan.actions() {
            debug!("Planned: {}", action);
        }
        info!(
            "Planned {} moves, {} recreations, {} quarantines, {} duplicate deletes, {} folder deletes",
            plan.moves.len(),
            plan.recreations.len(),
            plan.quarantines.len(),
            plan.duplicate_deletes.len(),
            plan.empty_folder_deletes.len()
        );

        plan
    }

    fn build_expectations(&mut self, config: &ConfigModel, notes: &mut Vec<PlanNote>) -> Expectations {
        let mut variants: HashMap<String, HashSet<String>> = HashMap::new();
        for (_, name, _) in config.items() {
            let canonical = self.normalizer.normalize(name).to_lowercase();
            variants.entry(canonical).or_default().insert(name.to_lowercase());
        }

        let mut expected: HashMap<String, ConfiguredEntry> = HashMap::new();
        let mut order = Vec::new();

        for (folder, name, metadata) in config.items() {
            let canonical = self.normalizer.normalize(name).to_lowercase();
            let key = if variants.get(&canonical).map_or(0, |v| v.len()) >= 2 {
                name.to_lowercase()
            } else {
                canonical
            };

            match expected.get(&key) {
                Some(existing) => {
                    let note = PlanNote::AmbiguousConfig {
                        key: name.clone(),
                        kept: existing.folder.clone(),
                        ignored: folder.clone(),
                    };
                    info!("{}", note);
                    notes.push(note);
                }
                None => {
                    order.push(key.clone());
                    expected.insert(
                        key,
                        ConfiguredEntry {
                            name: name.clone(),
                            folder: folder.clone(),
                            metadata: metadata.clone(),
                        },
                    );
                }
            }
        }

        Expectations {
            variants,
            expected,
            order,
        }
    }

    fn match_key(&mut self, name: &str, expectations: &Expectations) -> Option<String> {
        let canonical = self.normalizer.normalize(name).to_lowercase();
        let full = name.to_lowercase();
        let is_variant = expectations
            .variants
            .get(&canonical)
            .map_or(false, |v| v.len() >= 2);

        if is_variant {
            // Variants only match on their full name.
            return expectations.expected.contains_key(&full).then_some(full);
        }
        if expectations.expected.contains_key(&canonical) {
            Some(canonical)
        } else if expectations.expected.contains_key(&full) {
            Some(full)
        } else {
            None
        }
    }

    /// Folders that will hold nothing once the planned actions are applied.
    /// Configured and protected folders, folders holding foreign files, and
    /// ancestors of any of those are kept. Deepest folders come first.
    fn empty_folders(&self, config: &ConfigModel, observed: &Snapshot, plan: &Plan) -> Vec<Action> {
        let mut projected: HashMap<FolderPath, isize> = HashMap::new();
        for item in &observed.items {
            *projected.entry(item.folder.clone()).or_default() += 1;
        }
        for action in plan.actions() {
            match action {
                Action::Move { from, to, .. } => {
                    *projected.entry(from.clone()).or_default() -= 1;
                    *projected.entry(to.clone()).or_default() += 1;
                }
                Action::Quarantine { from, to, .. } => {
                    *projected.entry(from.clone()).or_default() -= 1;
                    *projected.entry(to.clone()).or_default() += 1;
                }
                Action::Recreate { folder, .. } => {
                    *projected.entry(folder.clone()).or_default() += 1;
                }
                Action::DeleteDuplicate { folder, .. } => {
                    *projected.entry(folder.clone()).or_default() -= 1;
                }
                Action::DeleteEmptyFolder { .. } => {}
            }
        }

        let occupied = projected
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(folder, _)| folder)
            .chain(config.folders().map(|(folder, _)| folder.clone()))
            .chain(self.options.protected_folders.iter().cloned())
            .chain(
                observed
                    .folders
                    .iter()
                    .filter(|f| f.foreign_entries > 0)
                    .map(|f| f.folder.clone()),
            );

        let mut keep: HashSet<FolderPath> = HashSet::new();
        for folder in occupied {
            keep.extend(folder.ancestors());
            keep.insert(folder);
        }

        let mut empty: Vec<FolderPath> = observed
            .folders
            .iter()
            .map(|f| f.folder.clone())
            .filter(|f| !f.is_root() && !keep.contains(f))
            .collect();
        empty.sort_by(|a, b| b.depth().cmp(&a.depth()).then_with(|| a.cmp(b)));
        empty.dedup();

        empty
            .into_iter()
            .map(|folder| Action::DeleteEmptyFolder { folder })
            .collect()
    }
}

/// `name`, or `name (1).ext`, `name (2).ext`, ... when taken. `taken` holds
/// lowercased names.
fn unique_name(name: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(&name.to_lowercase()) {
        return name.to_string();
    }
    let (stem, extension) = match name.rfind('.') {
        Some(dot) if dot > 0 => (&name[..dot], &name[dot..]),
        _ => (name, ""),
    };
    (1..)
        .map(|n| format!("{} ({}){}", stem, n, extension))
        .find(|candidate| !taken.contains(&candidate.to_lowercase()))
        .unwrap_or_else(|| name.to_string())
}
