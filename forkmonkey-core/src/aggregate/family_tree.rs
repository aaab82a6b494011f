// Copyright 2025 ForkMonkey Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Family tree
//!
//! One node per record keyed by full name. `children` is the exact inverse of
//! the records' `parent` field. A parent that contributed no record (no
//! marker data) leaves its children pointing outside the node set. Such
//! children stay detached from the root, which is not an error.

use crate::error::{InvariantViolation, Result};
use crate::record::CreatureRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyTreeNode {
    pub id: String,
    pub owner: String,
    pub repo: String,
    pub url: String,
    pub parent: Option<String>,
    pub children: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyTreeDocument {
    pub last_updated: DateTime<Utc>,
    pub root: String,
    pub total_nodes: usize,
    pub nodes: Vec<FamilyTreeNode>,
}

/// Find the single root record, checking its lineage fields.
fn find_root(records: &[CreatureRecord]) -> Result<&CreatureRecord> {
    let roots: Vec<&CreatureRecord> = records.iter().filter(|r| r.is_root).collect();
    let root = match roots.as_slice() {
        [] => return Err(InvariantViolation::MissingRoot),
        [root] => *root,
        many => {
            return Err(InvariantViolation::MultipleRoots(
                many.iter().map(|r| r.full_name.clone()).collect(),
            ))
        }
    };

    let reason = if root.degree != 0 {
        Some(format!("degree is {}", root.degree))
    } else if root.parent.is_some() {
        Some("parent is set".to_string())
    } else if root.degree_label != "root" {
        Some(format!("label is {:?}", root.degree_label))
    } else {
        None
    };
    match reason {
        Some(reason) => Err(InvariantViolation::MalformedRoot {
            full_name: root.full_name.clone(),
            reason,
        }),
        None => Ok(root),
    }
}

impl FamilyTreeDocument {
    pub fn build(records: &[CreatureRecord], last_updated: DateTime<Utc>) -> Result<Self> {
        let root = find_root(records)?;

        let mut index: HashMap<&str, usize> = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            if index.insert(record.full_name.as_str(), i).is_some() {
                return Err(InvariantViolation::DuplicateRecord(record.full_name.clone()));
            }
        }

        let mut nodes: Vec<FamilyTreeNode> = records
            .iter()
            .map(|r| FamilyTreeNode {
                id: r.full_name.clone(),
                owner: r.owner.clone(),
                repo: r.repo.clone(),
                url: r.url.clone(),
                parent: r.parent.clone(),
                children: Vec::new(),
            })
            .collect();

        for record in records {
            let Some(parent) = record.parent.as_deref() else {
                continue;
            };
            match index.get(parent) {
                Some(&p) => nodes[p].children.push(record.full_name.clone()),
                None => tracing::debug!(
                    child = %record.full_name,
                    parent = %parent,
                    "Parent has no record, leaving child detached"
                ),
            }
        }

        let document = Self {
            last_updated,
            root: root.full_name.clone(),
            total_nodes: nodes.len(),
            nodes,
        };
        document.validate()?;
        Ok(document)
    }

    pub fn validate(&self) -> Result<()> {
        if self.total_nodes != self.nodes.len() {
            return Err(InvariantViolation::CountMismatch {
                field: "total_nodes",
                found: self.total_nodes,
                expected: self.nodes.len(),
            });
        }

        let mut parents: HashMap<&str, Option<&str>> = HashMap::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if parents
                .insert(node.id.as_str(), node.parent.as_deref())
                .is_some()
            {
                return Err(InvariantViolation::DuplicateRecord(node.id.clone()));
            }
        }

        match parents.get(self.root.as_str()) {
            None => return Err(InvariantViolation::MissingRoot),
            Some(Some(_)) => {
                return Err(InvariantViolation::MalformedRoot {
                    full_name: self.root.clone(),
                    reason: "parent is set".to_string(),
                })
            }
            Some(None) => {}
        }

        let mut listed: HashSet<&str> = HashSet::new();
        for node in &self.nodes {
            if node.id != self.root && node.parent.is_none() {
                return Err(InvariantViolation::MissingParent(node.id.clone()));
            }
            for child in &node.children {
                let recorded = parents.get(child.as_str()).copied().flatten();
                if recorded != Some(node.id.as_str()) || !listed.insert(child.as_str()) {
                    return Err(InvariantViolation::ParentChildMismatch {
                        child: child.clone(),
                        listed_under: node.id.clone(),
                        recorded: recorded.map(str::to_string),
                    });
                }
            }
        }

        // Every node whose parent is in the tree must be listed as a child.
        for node in &self.nodes {
            if let Some(parent) = node.parent.as_deref() {
                if parents.contains_key(parent) && !listed.contains(node.id.as_str()) {
                    return Err(InvariantViolation::ParentChildMismatch {
                        child: node.id.clone(),
                        listed_under: parent.to_string(),
                        recorded: Some(parent.to_string()),
                    });
                }
            }
        }

        detect_cycle(self.nodes.iter().map(|n| n.id.as_str()), &parents)
    }
}

/// Walk parent pointers from every node; any revisit within a walk is a cycle.
fn detect_cycle<'a>(
    ids: impl Iterator<Item = &'a str>,
    parents: &HashMap<&'a str, Option<&'a str>>,
) -> Result<()> {
    let mut settled: HashSet<&str> = HashSet::with_capacity(parents.len());

    for start in ids {
        let mut path: HashSet<&str> = HashSet::new();
        let mut current = Some(start);

        while let Some(id) = current {
            if settled.contains(id) {
                break;
            }
            if !path.insert(id) {
                return Err(InvariantViolation::LineageCycle(id.to_string()));
            }
            current = parents.get(id).copied().flatten();
            if let Some(next) = current {
                if !parents.contains_key(next) {
                    break;
                }
            }
        }
        settled.extend(path);
    }
    Ok(())
}
