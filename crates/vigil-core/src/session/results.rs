use crate::group::GroupResult;
use crate::result::FieldResult;
use serde::Serialize;
use std::collections::BTreeMap;

/// The session's results table: the last result of every validated field
/// and the current aggregate of every group.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionResults {
    pub fields: BTreeMap<String, FieldResult>,
    pub groups: BTreeMap<String, GroupResult>,
}

impl SessionResults {
    pub fn field(&self, path: &str) -> Option<&FieldResult> {
        self.fields.get(path)
    }

    pub fn group(&self, name: &str) -> Option<&GroupResult> {
        self.groups.get(name)
    }

    /// Whether no recorded field reports a non-success status.
    pub fn is_success(&self) -> bool {
        self.fields.values().all(FieldResult::is_success)
    }

    /// Record the result of a field and refresh the groups it left or joined.
    pub(crate) fn record(&mut self, path: &str, result: FieldResult) {
        let joined = result.group.clone();
        let left = self
            .fields
            .insert(path.to_string(), result)
            .and_then(|previous| previous.group);

        let mut touched: Vec<String> = left.into_iter().collect();
        if let Some(group) = joined {
            if !touched.contains(&group) {
                touched.push(group);
            }
        }
        for group in touched {
            self.refresh_group(&group);
        }
    }

    /// Drop the field at `path` and every field below it.
    pub(crate) fn remove(&mut self, path: &str) {
        let prefix = format!("{path}.");
        let removed: Vec<String> = self
            .fields
            .keys()
            .filter(|key| path.is_empty() || *key == path || key.starts_with(&prefix))
            .cloned()
            .collect();

        let mut touched: Vec<String> = Vec::new();
        for key in removed {
            if let Some(group) = self.fields.remove(&key).and_then(|r| r.group) {
                if !touched.contains(&group) {
                    touched.push(group);
                }
            }
        }
        for group in touched {
            self.refresh_group(&group);
        }
    }

    fn refresh_group(&mut self, name: &str) {
        match GroupResult::aggregate(name, self.fields.values()) {
            Some(group) => {
                self.groups.insert(name.to_string(), group);
            }
            None => {
                self.groups.remove(name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regrouped_member_leaves_old_group() {
        let mut results = SessionResults::default();
        results.record("a", FieldResult::error("A").with_group("g"));
        assert!(results.group("g").is_some());

        results.record("a", FieldResult::error("A").with_group("h"));
        assert!(results.group("g").is_none());
        assert!(results.group("h").is_some());
    }

    #[test]
    fn success_empties_group() {
        let mut results = SessionResults::default();
        results.record("a", FieldResult::error("A").with_group("g"));
        results.record("a", FieldResult::success());

        assert!(results.group("g").is_none());
        assert!(results.is_success());
    }

    #[test]
    fn remove_drops_subtree() {
        let mut results = SessionResults::default();
        results.record("address.city", FieldResult::error("City").with_group("address"));
        results.record("address.zip", FieldResult::error("Zip"));
        results.record("addressee", FieldResult::error("Addressee"));

        results.remove("address");

        assert!(results.field("address.city").is_none());
        assert!(results.field("address.zip").is_none());
        assert!(results.field("addressee").is_some());
        assert!(results.group("address").is_none());
    }
}
