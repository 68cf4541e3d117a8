//! Directly-follows graph description: activities as nodes, aggregates as edges.

use crate::aggregate::AggregatedFootprint;
use crate::anomaly::{Detection, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    /// Group value when aggregated by resource or time bucket
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Footprint count
    pub weight: usize,
    pub anomaly_score: f64,
    pub is_anomalous: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphView {
    pub nodes: BTreeSet<String>,
    /// Lexicographic by (from, to), then group
    pub edges: Vec<GraphEdge>,
    pub start_activities: BTreeSet<String>,
    pub end_activities: BTreeSet<String>,
}

pub struct GraphViewBuilder;

impl GraphViewBuilder {
    /// Nodes come only from footprint endpoints. Start/end activities are kept
    /// only when they are also nodes.
    pub fn build(
        aggregates: &[AggregatedFootprint],
        detection: &Detection,
        start_activities: &BTreeSet<String>,
        end_activities: &BTreeSet<String>,
    ) -> GraphView {
        let mut nodes = BTreeSet::new();
        let mut edges: Vec<GraphEdge> = aggregates
            .iter()
            .map(|a| {
                nodes.insert(a.key.from_activity.clone());
                nodes.insert(a.key.to_activity.clone());
                let flag = detection.flag(&a.key);
                GraphEdge {
                    from: a.key.from_activity.clone(),
                    to: a.key.to_activity.clone(),
                    group: match a.key.group {
                        crate::aggregate::GroupValue::All => None,
                        ref g => Some(g.to_string()),
                    },
                    weight: a.count(),
                    anomaly_score: flag.map(|f| f.score).unwrap_or(0.0),
                    is_anomalous: flag.is_some_and(|f| f.is_anomalous),
                    severity: flag.and_then(|f| f.severity),
                }
            })
            .collect();
        edges.sort_by(|a, b| (&a.from, &a.to, &a.group).cmp(&(&b.from, &b.to, &b.group)));

        GraphView {
            start_activities: start_activities.intersection(&nodes).cloned().collect(),
            end_activities: end_activities.intersection(&nodes).cloned().collect(),
            nodes,
            edges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{FootprintKey, GroupValue};
    use crate::anomaly::{AnomalyFlag, AnomalyReason};
    use crate::kpi::GroupKpis;
    use std::collections::BTreeMap;

    fn agg(from: &str, to: &str, count: usize) -> AggregatedFootprint {
        AggregatedFootprint {
            key: FootprintKey {
                from_activity: from.into(),
                to_activity: to.into(),
                group: GroupValue::All,
            },
            kpis: GroupKpis {
                count,
                duration_exceptions: 0,
                duration: None,
                frequency: 0.0,
                throughput: None,
                cases: Vec::new(),
                attributes: BTreeMap::new(),
            },
        }
    }

    #[test]
    fn nodes_from_endpoints_edges_sorted() {
        let aggs = vec![agg("B", "C", 2), agg("A", "B", 3)];
        let mut detection = Detection::default();
        detection.flags.insert(
            aggs[0].key.clone(),
            AnomalyFlag::anomalous(AnomalyReason::AboveUpperBound, 2.5),
        );
        let starts: BTreeSet<String> = ["A".to_string(), "Z".to_string()].into();
        let view = GraphViewBuilder::build(&aggs, &detection, &starts, &BTreeSet::new());

        assert_eq!(view.nodes.iter().collect::<Vec<_>>(), ["A", "B", "C"]);
        assert_eq!(view.start_activities.len(), 1);
        assert_eq!((view.edges[0].from.as_str(), view.edges[0].weight), ("A", 3));
        assert_eq!(view.edges[0].anomaly_score, 0.0);
        assert!(!view.edges[0].is_anomalous);
        assert_eq!(view.edges[1].anomaly_score, 2.5);
        assert_eq!(view.edges[1].severity, Some(Severity::High));
    }
}
