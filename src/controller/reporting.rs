//! How component verdicts map onto exported gauges
//!
//! Two layouts:
//! - `Component`: one gauge family, labeled by component name
//! - `Table`: one fixed gauge per known control-plane component, carrying a
//!   static `job` label. Components missing from [`REPORTING_TABLE`] are
//!   logged and not exported.

/// Gauge layout for component health
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportingMode {
    Component,
    Table,
}

impl ReportingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportingMode::Component => "component",
            ReportingMode::Table => "table",
        }
    }
}

/// Rule matching a component name to a table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatch {
    Exact(&'static str),
    /// etcd members are reported as `etcd-0`, `etcd-1`, ...
    Prefix(&'static str),
}

impl NameMatch {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NameMatch::Exact(expected) => name == *expected,
            NameMatch::Prefix(prefix) => name.starts_with(prefix),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ReportingEntry {
    pub matcher: NameMatch,
    pub metric: &'static str,
    pub help: &'static str,
}

pub const REPORTING_TABLE: &[ReportingEntry] = &[
    ReportingEntry {
        matcher: NameMatch::Exact("scheduler"),
        metric: "kube_scheduler_healthy",
        help: "Kubernetes scheduler health (1 = healthy)",
    },
    ReportingEntry {
        matcher: NameMatch::Exact("controller-manager"),
        metric: "kube_controller_manager_healthy",
        help: "Kubernetes controller-manager health (1 = healthy)",
    },
    ReportingEntry {
        matcher: NameMatch::Prefix("etcd-"),
        metric: "kube_etcd_healthy",
        help: "Kubernetes etcd health (1 = healthy)",
    },
];

/// Index of the table entry responsible for a component, if any
pub fn lookup(name: &str) -> Option<usize> {
    REPORTING_TABLE
        .iter()
        .position(|entry| entry.matcher.matches(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_components_resolve() {
        assert_eq!(
            lookup("scheduler").map(|i| REPORTING_TABLE[i].metric),
            Some("kube_scheduler_healthy")
        );
        assert_eq!(
            lookup("controller-manager").map(|i| REPORTING_TABLE[i].metric),
            Some("kube_controller_manager_healthy")
        );
        assert_eq!(
            lookup("etcd-0").map(|i| REPORTING_TABLE[i].metric),
            Some("kube_etcd_healthy")
        );
        assert_eq!(lookup("etcd-2"), lookup("etcd-0"));
    }

    #[test]
    fn test_unknown_components_do_not_resolve() {
        assert_eq!(lookup("cloud-controller-manager"), None);
        assert_eq!(lookup("etcd"), None);
        assert_eq!(lookup("Scheduler"), None);
        assert_eq!(lookup(""), None);
    }

    #[test]
    fn test_table_metric_names_are_unique() {
        let mut names: Vec<_> = REPORTING_TABLE.iter().map(|e| e.metric).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), REPORTING_TABLE.len());
    }
}
