//! Group aggregation.
//!
//! Several fields may report under one group name so that their messages can
//! be presented together. A group result lists, per distinct non-success
//! status, the distinct texts of the member fields currently carrying it.

use crate::node::Validatable;
use crate::result::{FieldResult, Status};
use serde::{Deserialize, Serialize};

/// The distinct texts reported with one status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMessages {
    pub status: Status,
    pub texts: Vec<String>,
}

/// Aggregated messages of a group, most severe status first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupResult {
    pub name: String,
    pub results: Vec<GroupMessages>,
}

impl GroupResult {
    /// Aggregate the members carrying `name`. Returns `None` when none of
    /// them reports a non-success status.
    pub fn aggregate<'a>(name: &str, members: impl IntoIterator<Item = &'a FieldResult>) -> Option<Self> {
        let mut results: Vec<GroupMessages> = Vec::new();

        for member in members {
            if member.group.as_deref() != Some(name) || member.is_success() {
                continue;
            }
            let status = member.status.clone().unwrap_or(Status::Error);
            let bucket = match results.iter_mut().position(|m| m.status == status) {
                Some(index) => &mut results[index],
                None => {
                    results.push(GroupMessages {
                        status,
                        texts: Vec::new(),
                    });
                    let last = results.len() - 1;
                    &mut results[last]
                }
            };
            if let Some(text) = &member.text {
                if !bucket.texts.contains(text) {
                    bucket.texts.push(text.clone());
                }
            }
        }

        if results.is_empty() {
            return None;
        }
        results.sort_by_key(|m| std::cmp::Reverse(m.status.severity()));

        Some(Self {
            name: name.to_string(),
            results,
        })
    }

    /// Aggregate over the current state of a set of nodes.
    pub fn from_nodes<'a>(name: &str, nodes: impl IntoIterator<Item = &'a Validatable>) -> Option<Self> {
        let members: Vec<FieldResult> = nodes
            .into_iter()
            .map(|node| node.state().to_result(&node.path()))
            .collect();
        Self::aggregate(name, &members)
    }

    /// The most severe status of the group.
    pub fn status(&self) -> Status {
        self.results
            .first()
            .map(|m| m.status.clone())
            .unwrap_or(Status::Success)
    }

    /// The first text of the most severe status.
    pub fn text(&self) -> Option<&str> {
        self.results.first()?.texts.first().map(String::as_str)
    }

    pub fn texts(&self, status: &Status) -> &[String] {
        self.results
            .iter()
            .find(|m| &m.status == status)
            .map(|m| m.texts.as_slice())
            .unwrap_or_default()
    }

    pub fn has_errors(&self) -> bool {
        self.results.iter().any(|m| m.status == Status::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.results.iter().any(|m| m.status == Status::Warning)
    }
}

/// Aggregate every group found among `members`, in order of first appearance.
///
/// With a filter, only the named groups are considered.
pub fn aggregate_groups<'a>(
    members: impl IntoIterator<Item = &'a FieldResult>,
    filter: Option<&[&str]>,
) -> Vec<GroupResult> {
    let members: Vec<&FieldResult> = members.into_iter().collect();
    let mut names: Vec<&str> = Vec::new();
    for member in &members {
        if let Some(group) = member.group.as_deref() {
            let wanted = filter.map_or(true, |f| f.contains(&group));
            if wanted && !names.contains(&group) {
                names.push(group);
            }
        }
    }

    names
        .into_iter()
        .filter_map(|name| GroupResult::aggregate(name, members.iter().copied()))
        .collect()
}
