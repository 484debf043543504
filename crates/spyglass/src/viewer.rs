//! Client-side trace model.
//!
//! Groups incoming span records into traces and reconstructs the parent/child
//! hierarchy on demand. The model tolerates the stream's weak ordering:
//! children routinely arrive before their parents (a child span closes first),
//! and at-least-once delivery means the same record can arrive twice.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use spyglass_core::model::SpanRecord;

/// All spans seen so far, grouped by trace. Insertion is idempotent per span
/// id; nothing is ever evicted except by [`clear`](ViewerTraceModel::clear).
#[derive(Default)]
pub struct ViewerTraceModel {
    spans: HashMap<String, SpanRecord>,
    traces: HashMap<String, TraceGroup>,
    // trace ids in first-seen order, for stable rendering
    order: Vec<String>,
}

pub struct TraceGroup {
    pub trace_id: String,
    pub member_ids: Vec<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Parent/child structure of one trace, recomputed from the current members.
/// A member is a root when its parent is empty or not (yet) among the
/// members, so an early-arriving child re-roots once its parent shows up.
pub struct TraceHierarchy {
    pub roots: Vec<String>,
    pub children: HashMap<String, Vec<String>>,
}

impl ViewerTraceModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record. A span id already present makes this a complete no-op
    /// and returns false; the duplicate neither re-appends to the member list
    /// nor moves the trace window.
    pub fn insert(&mut self, record: SpanRecord) -> bool {
        if self.spans.contains_key(&record.span_id) {
            return false;
        }

        let start = record.start_time_utc;
        let end = record.end_time();
        match self.traces.get_mut(&record.trace_id) {
            Some(group) => {
                group.member_ids.push(record.span_id.clone());
                group.start_time = group.start_time.min(start);
                group.end_time = group.end_time.max(end);
            }
            None => {
                self.order.push(record.trace_id.clone());
                self.traces.insert(
                    record.trace_id.clone(),
                    TraceGroup {
                        trace_id: record.trace_id.clone(),
                        member_ids: vec![record.span_id.clone()],
                        start_time: start,
                        end_time: end,
                    },
                );
            }
        }

        self.spans.insert(record.span_id.clone(), record);
        true
    }

    pub fn span(&self, span_id: &str) -> Option<&SpanRecord> {
        self.spans.get(span_id)
    }

    pub fn trace(&self, trace_id: &str) -> Option<&TraceGroup> {
        self.traces.get(trace_id)
    }

    /// Traces in first-seen order.
    pub fn traces(&self) -> impl Iterator<Item = &TraceGroup> {
        self.order.iter().filter_map(|id| self.traces.get(id))
    }

    pub fn hierarchy(&self, trace_id: &str) -> Option<TraceHierarchy> {
        let group = self.traces.get(trace_id)?;

        let mut roots = Vec::new();
        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        for member_id in &group.member_ids {
            let Some(record) = self.spans.get(member_id) else {
                continue;
            };
            let parent = &record.parent_span_id;
            if parent.is_empty() || !self.member_of(group, parent) {
                roots.push(member_id.clone());
            } else {
                children
                    .entry(parent.clone())
                    .or_default()
                    .push(member_id.clone());
            }
        }

        self.sort_by_start(&mut roots);
        for ids in children.values_mut() {
            self.sort_by_start(ids);
        }
        Some(TraceHierarchy { roots, children })
    }

    pub fn clear(&mut self) {
        self.spans.clear();
        self.traces.clear();
        self.order.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    fn member_of(&self, group: &TraceGroup, span_id: &str) -> bool {
        group.member_ids.iter().any(|id| id == span_id)
    }

    fn sort_by_start(&self, ids: &mut [String]) {
        ids.sort_by_key(|id| self.spans.get(id).map(|r| r.start_time_utc));
    }
}

#[cfg(test)]
mod tests {
    use testkit::record;

    use super::*;

    #[test]
    fn groups_members_and_builds_hierarchy() {
        let mut model = ViewerTraceModel::new();
        // trace T: A(root, 0..50ms), B(child of A), C(parent X never arrives)
        assert!(model.insert(record("T", "A", "", 0, 50)));
        assert!(model.insert(record("T", "B", "A", 10, 10)));
        assert!(model.insert(record("T", "C", "X", 20, 5)));

        let group = model.trace("T").unwrap();
        assert_eq!(group.member_ids, vec!["A", "B", "C"]);
        assert_eq!(group.start_time, testkit::base_time());
        assert_eq!(
            group.end_time,
            testkit::base_time() + chrono::TimeDelta::milliseconds(50)
        );

        let hierarchy = model.hierarchy("T").unwrap();
        assert_eq!(hierarchy.roots, vec!["A", "C"]);
        assert_eq!(hierarchy.children["A"], vec!["B"]);
        assert!(!hierarchy.children.contains_key("C"));
    }

    #[test]
    fn out_of_order_child_re_roots_when_parent_arrives() {
        let mut model = ViewerTraceModel::new();
        model.insert(record("T", "child", "root", 10, 5));

        let before = model.hierarchy("T").unwrap();
        assert_eq!(before.roots, vec!["child"]);

        model.insert(record("T", "root", "", 0, 50));
        let after = model.hierarchy("T").unwrap();
        assert_eq!(after.roots, vec!["root"]);
        assert_eq!(after.children["root"], vec!["child"]);
    }

    #[test]
    fn hierarchy_recomputation_is_deterministic() {
        let mut model = ViewerTraceModel::new();
        model.insert(record("T", "A", "", 0, 50));
        model.insert(record("T", "B", "A", 10, 20));
        model.insert(record("T", "C", "zzz", 0, 5));

        let first = model.hierarchy("T").unwrap();
        let second = model.hierarchy("T").unwrap();
        assert_eq!(first.roots, second.roots);
        assert_eq!(first.children, second.children);
    }

    #[test]
    fn duplicate_insert_is_a_complete_no_op() {
        let mut model = ViewerTraceModel::new();
        assert!(model.insert(record("T", "A", "", 0, 50)));
        assert!(!model.insert(record("T", "A", "", 0, 500)));

        let group = model.trace("T").unwrap();
        assert_eq!(group.member_ids, vec!["A"]);
        // the duplicate's longer duration did not widen the window
        assert_eq!(
            group.end_time,
            testkit::base_time() + chrono::TimeDelta::milliseconds(50)
        );
    }

    #[test]
    fn trace_window_widens_monotonically() {
        let mut model = ViewerTraceModel::new();
        model.insert(record("T", "mid", "", 100, 10));
        model.insert(record("T", "early", "", 0, 10));
        model.insert(record("T", "late", "", 200, 300));

        let group = model.trace("T").unwrap();
        assert_eq!(group.start_time, testkit::base_time());
        assert_eq!(
            group.end_time,
            testkit::base_time() + chrono::TimeDelta::milliseconds(500)
        );
    }

    #[test]
    fn traces_are_kept_separate_and_in_first_seen_order() {
        let mut model = ViewerTraceModel::new();
        model.insert(record("T2", "b", "", 5, 1));
        model.insert(record("T1", "a", "", 0, 1));
        model.insert(record("T2", "c", "b", 6, 1));

        let ids: Vec<&str> = model.traces().map(|g| g.trace_id.as_str()).collect();
        assert_eq!(ids, vec!["T2", "T1"]);
        assert_eq!(model.trace("T2").unwrap().member_ids, vec!["b", "c"]);
        assert_eq!(model.trace("T1").unwrap().member_ids, vec!["a"]);
    }

    #[test]
    fn siblings_are_ordered_by_start_time() {
        let mut model = ViewerTraceModel::new();
        model.insert(record("T", "root", "", 0, 100));
        model.insert(record("T", "second", "root", 40, 10));
        model.insert(record("T", "first", "root", 20, 10));

        let hierarchy = model.hierarchy("T").unwrap();
        assert_eq!(hierarchy.children["root"], vec!["first", "second"]);
    }

    #[test]
    fn clear_empties_the_model() {
        let mut model = ViewerTraceModel::new();
        model.insert(record("T", "A", "", 0, 50));
        model.clear();
        assert!(model.is_empty());
        assert!(model.trace("T").is_none());
    }
}
