use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::core::SharedStepLookup;
use crate::error::{ExportError, ExportResult};

//==============================================================================
// Source Model (plans, suites, test cases, actions)
//==============================================================================

/// A parsed plan file: the shared-step library plus every plan it declares
#[derive(Debug, Clone, Default)]
pub struct PlanFile {
    pub shared_steps: HashMap<u64, SharedStep>,
    pub plans: Vec<TestPlan>,
}

impl PlanFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_shared_step(&mut self, shared: SharedStep) {
        self.shared_steps.insert(shared.id, shared);
    }

    pub fn add_plan(&mut self, plan: TestPlan) {
        self.plans.push(plan);
    }

    pub fn plan_names(&self) -> Vec<&str> {
        self.plans.iter().map(|p| p.name.as_str()).collect()
    }

    /// Pick a plan by name. Without a name the file must contain exactly one plan.
    pub fn select_plan(&self, name: Option<&str>) -> ExportResult<&TestPlan> {
        match name {
            Some(wanted) => self
                .plans
                .iter()
                .find(|p| p.name == wanted)
                .ok_or_else(|| {
                    ExportError::PlanNotFound(format!(
                        "'{}' (available: {})",
                        wanted,
                        self.plan_names().join(", ")
                    ))
                }),
            None => match self.plans.as_slice() {
                [only] => Ok(only),
                [] => Err(ExportError::PlanNotFound(
                    "plan file declares no plans".to_string(),
                )),
                _ => Err(ExportError::PlanNotFound(format!(
                    "several plans declared, choose one with --plan (available: {})",
                    self.plan_names().join(", ")
                ))),
            },
        }
    }
}

impl SharedStepLookup for PlanFile {
    fn find_shared_step(&self, id: u64) -> Option<&SharedStep> {
        self.shared_steps.get(&id)
    }
}

/// A named test plan rooted at a single suite
#[derive(Debug, Clone)]
pub struct TestPlan {
    pub name: String,
    pub root_suite: TestSuite,
}

impl TestPlan {
    pub fn new(name: String, root_suite: TestSuite) -> Self {
        Self { name, root_suite }
    }

    pub fn all_test_cases(&self) -> Vec<&TestCase> {
        self.root_suite.all_test_cases()
    }
}

/// A suite holds test cases and nested child suites
#[derive(Debug, Clone, Default)]
pub struct TestSuite {
    pub title: String,
    pub test_cases: Vec<TestCase>,
    pub suites: Vec<TestSuite>,
}

impl TestSuite {
    pub fn new(title: String) -> Self {
        Self {
            title,
            ..Self::default()
        }
    }

    pub fn add_test_case(&mut self, test_case: TestCase) {
        self.test_cases.push(test_case);
    }

    pub fn add_suite(&mut self, suite: TestSuite) {
        self.suites.push(suite);
    }

    /// Every test case in this suite and its descendants, depth-first.
    ///
    /// A test case listed in several suites is returned once, at its first
    /// occurrence.
    pub fn all_test_cases(&self) -> Vec<&TestCase> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.collect_test_cases(&mut seen, &mut out);
        out
    }

    fn collect_test_cases<'a>(&'a self, seen: &mut HashSet<u64>, out: &mut Vec<&'a TestCase>) {
        for test_case in &self.test_cases {
            if seen.insert(test_case.id) {
                out.push(test_case);
            }
        }
        for child in &self.suites {
            child.collect_test_cases(seen, out);
        }
    }
}

/// A test case: ordered actions, an optional data table and linked work items
#[derive(Debug, Clone, Default)]
pub struct TestCase {
    pub id: u64,
    pub title: String,
    pub actions: Vec<Action>,
    /// Default data table, kept raw until the parameter resolver reads it
    pub parameters: Option<serde_yaml::Value>,
    pub links: Vec<WorkItemLink>,
}

impl TestCase {
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_actions(mut self, actions: Vec<Action>) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_parameters(mut self, parameters: serde_yaml::Value) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn add_link(&mut self, relation: impl Into<String>, target: u64) {
        self.links.push(WorkItemLink {
            relation: relation.into(),
            target,
        });
    }
}

/// A typed link from a test case to another work item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItemLink {
    pub relation: String,
    pub target: u64,
}

/// One node of a test case's action tree
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Leaf: a single executable step
    Step(TestStep),
    /// Ordered child actions, no row of its own
    Group(Vec<Action>),
    /// Indirection to a shared step definition by id
    SharedReference(u64),
}

impl Action {
    pub fn step(title: impl Into<String>, expected: impl Into<String>) -> Self {
        Action::Step(TestStep::new(title, expected))
    }

    pub fn group(actions: Vec<Action>) -> Self {
        Action::Group(actions)
    }

    pub fn shared(id: u64) -> Self {
        Action::SharedReference(id)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestStep {
    pub title: String,
    pub expected: String,
    pub attachments: Vec<String>,
}

impl TestStep {
    pub fn new(title: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            expected: expected.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<String>) -> Self {
        self.attachments = attachments;
        self
    }
}

/// A reusable action sequence referenced from test cases
#[derive(Debug, Clone, Default)]
pub struct SharedStep {
    pub id: u64,
    pub title: String,
    pub actions: Vec<Action>,
}

impl SharedStep {
    pub fn new(id: u64, title: impl Into<String>, actions: Vec<Action>) -> Self {
        Self {
            id,
            title: title.into(),
            actions,
        }
    }
}

//==============================================================================
// Parameterization
//==============================================================================

/// A decoded default data table: named columns, rows of optional text cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

/// Parameter name -> substitution value for one pass over a test case.
///
/// A `None` value is a non-text cell; it substitutes as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplacementSet {
    values: BTreeMap<String, Option<String>>,
}

impl ReplacementSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Option<String>) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Option<String>> {
        self.values.get(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Pairs in application order: longest name first, then by name.
    pub fn ordered_pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self
            .values
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_deref().unwrap_or("")))
            .collect();
        // BTreeMap iteration is already sorted by name; a stable sort keeps it
        pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        pairs
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ReplacementSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = ReplacementSet::new();
        for (k, v) in iter {
            set.insert(k, Some(v.into()));
        }
        set
    }
}

//==============================================================================
// Flattened Output
//==============================================================================

/// One sheet row produced from a step leaf (or a placeholder for an empty test case)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRow {
    /// 0-based sheet row; the header occupies row 0
    pub row: u32,
    /// 1-based step number; `None` for a placeholder row
    pub step_number: Option<u32>,
    pub label: String,
    pub action: String,
    pub attachments: Option<String>,
    pub expected: String,
}

impl StepRow {
    pub fn placeholder(row: u32) -> Self {
        Self {
            row,
            step_number: None,
            label: String::new(),
            action: String::new(),
            attachments: None,
            expected: String::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.step_number.is_none()
    }
}

/// Contiguous rows of one (test case, replacement set) pass with their merged fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowGroup {
    pub test_case_id: u64,
    pub title: String,
    pub stories: String,
    pub rows: Vec<StepRow>,
}

impl RowGroup {
    /// First and last sheet row covered by this group
    pub fn row_span(&self) -> Option<(u32, u32)> {
        match (self.rows.first(), self.rows.last()) {
            (Some(first), Some(last)) => Some((first.row, last.row)),
            _ => None,
        }
    }
}

/// The complete in-memory row stream for one export
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub sheet_name: String,
    pub groups: Vec<RowGroup>,
}

impl Report {
    pub fn new(sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            groups: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.groups.iter().map(|g| g.rows.len()).sum()
    }

    /// Last body row written, or 0 when only the header exists
    pub fn last_row(&self) -> u32 {
        self.groups
            .iter()
            .filter_map(RowGroup::row_span)
            .map(|(_, last)| last)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suite_with(title: &str, ids: &[u64]) -> TestSuite {
        let mut suite = TestSuite::new(title.to_string());
        for id in ids {
            suite.add_test_case(TestCase::new(*id, format!("case {}", id)));
        }
        suite
    }

    #[test]
    fn test_all_test_cases_depth_first() {
        let mut root = suite_with("root", &[1, 2]);
        let mut child = suite_with("child", &[3]);
        child.add_suite(suite_with("grandchild", &[4]));
        root.add_suite(child);
        root.add_suite(suite_with("sibling", &[5]));

        let ids: Vec<u64> = root.all_test_cases().iter().map(|tc| tc.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_all_test_cases_deduplicates() {
        let mut root = suite_with("root", &[1]);
        root.add_suite(suite_with("child", &[2, 1]));

        let ids: Vec<u64> = root.all_test_cases().iter().map(|tc| tc.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_select_plan_single_without_name() {
        let mut file = PlanFile::new();
        file.add_plan(TestPlan::new("only".to_string(), TestSuite::default()));
        assert_eq!(file.select_plan(None).unwrap().name, "only");
    }

    #[test]
    fn test_select_plan_ambiguous() {
        let mut file = PlanFile::new();
        file.add_plan(TestPlan::new("a".to_string(), TestSuite::default()));
        file.add_plan(TestPlan::new("b".to_string(), TestSuite::default()));

        let err = file.select_plan(None).unwrap_err();
        assert!(matches!(err, ExportError::PlanNotFound(_)));
        assert!(err.to_string().contains("a, b"));
        assert_eq!(file.select_plan(Some("b")).unwrap().name, "b");
    }

    #[test]
    fn test_select_plan_unknown_name() {
        let mut file = PlanFile::new();
        file.add_plan(TestPlan::new("a".to_string(), TestSuite::default()));
        assert!(matches!(
            file.select_plan(Some("zzz")),
            Err(ExportError::PlanNotFound(_))
        ));
    }

    #[test]
    fn test_ordered_pairs_longest_first() {
        let mut set = ReplacementSet::new();
        set.insert("A", Some("1".to_string()));
        set.insert("AB", Some("2".to_string()));
        set.insert("B", None);
        set.insert("ABC", Some("3".to_string()));

        let names: Vec<&str> = set.ordered_pairs().iter().map(|(k, _)| *k).collect();
        assert_eq!(names, vec!["ABC", "AB", "A", "B"]);
    }

    #[test]
    fn test_ordered_pairs_absent_value_is_empty() {
        let mut set = ReplacementSet::new();
        set.insert("n", None);
        assert_eq!(set.ordered_pairs(), vec![("n", "")]);
    }

    #[test]
    fn test_report_last_row() {
        let mut report = Report::new("Test Script");
        assert_eq!(report.last_row(), 0);

        report.groups.push(RowGroup {
            test_case_id: 1,
            title: String::new(),
            stories: String::new(),
            rows: vec![StepRow::placeholder(1), StepRow::placeholder(2)],
        });
        assert_eq!(report.last_row(), 2);
        assert_eq!(report.row_count(), 2);
        assert_eq!(report.groups[0].row_span(), Some((1, 2)));
    }
}
