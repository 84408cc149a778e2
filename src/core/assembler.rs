//! Row-group assembly: test cases × replacement sets → report

use tracing::debug;

use crate::config::{EmptyCasePolicy, ExportOptions};
use crate::core::flattener::{Flattener, SharedStepLookup, Traversal};
use crate::core::parameters;
use crate::core::substitution::substitute;
use crate::error::ExportResult;
use crate::types::{Report, RowGroup, StepRow, TestCase, TestPlan};

/// First body row; the header occupies row 0
pub const FIRST_BODY_ROW: u32 = 1;

/// Builds the full row stream for a plan before anything is written
pub struct ReportAssembler<'a, L: SharedStepLookup + ?Sized> {
    flattener: Flattener<'a, L>,
    options: &'a ExportOptions,
}

impl<'a, L: SharedStepLookup + ?Sized> ReportAssembler<'a, L> {
    pub fn new(lookup: &'a L, options: &'a ExportOptions) -> Self {
        Self {
            flattener: Flattener::new(lookup),
            options,
        }
    }

    pub fn assemble_plan(&self, plan: &TestPlan) -> ExportResult<Report> {
        self.assemble(plan.all_test_cases())
    }

    pub fn assemble<'t, I>(&self, test_cases: I) -> ExportResult<Report>
    where
        I: IntoIterator<Item = &'t TestCase>,
    {
        let mut report = Report::new(self.options.sheet_name.clone());
        let mut traversal = Traversal::new(FIRST_BODY_ROW);

        for test_case in test_cases {
            self.assemble_test_case(test_case, &mut traversal, &mut report)?;
        }

        Ok(report)
    }

    fn assemble_test_case(
        &self,
        test_case: &TestCase,
        traversal: &mut Traversal,
        report: &mut Report,
    ) -> ExportResult<()> {
        let stories = self.linked_stories(test_case);

        for replacements in parameters::resolve(test_case) {
            traversal.next_pass();
            let mut rows = Vec::new();
            self.flattener
                .flatten(&test_case.actions, &replacements, traversal, &mut rows)?;

            if rows.is_empty() {
                match self.options.empty_cases {
                    EmptyCasePolicy::Skip => {
                        debug!(test_case = test_case.id, "no steps, skipped");
                        continue;
                    }
                    EmptyCasePolicy::Placeholder => {
                        debug!(test_case = test_case.id, "no steps, placeholder row");
                        rows.push(StepRow::placeholder(traversal.cursor));
                        traversal.cursor += 1;
                    }
                }
            }

            debug!(
                test_case = test_case.id,
                rows = rows.len(),
                "flattened pass"
            );
            report.groups.push(RowGroup {
                test_case_id: test_case.id,
                title: substitute(&test_case.title, &replacements),
                stories: substitute(&stories, &replacements),
                rows,
            });
        }

        Ok(())
    }

    /// Targets of links with the story relation, newline separated ("" if none)
    fn linked_stories(&self, test_case: &TestCase) -> String {
        test_case
            .links
            .iter()
            .filter(|link| link.relation == self.options.story_relation)
            .fold(String::new(), |mut acc, link| {
                if !acc.is_empty() {
                    acc.push('\n');
                }
                acc.push_str(&link.target.to_string());
                acc
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Action, SharedStep};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn table(yaml: &str) -> serde_yaml::Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn assemble(cases: &[TestCase], options: &ExportOptions) -> Report {
        let lookup: HashMap<u64, SharedStep> = HashMap::new();
        ReportAssembler::new(&lookup, options)
            .assemble(cases.iter())
            .unwrap()
    }

    #[test]
    fn test_login_example() {
        let tc = TestCase::new(101, "Login @user")
            .with_parameters(table("columns: [user]\nrows:\n  - [alice]\n"))
            .with_actions(vec![Action::step("enter @user", "@user sees dashboard")]);

        let report = assemble(&[tc], &ExportOptions::default());

        assert_eq!(report.groups.len(), 1);
        let group = &report.groups[0];
        assert_eq!(group.test_case_id, 101);
        assert_eq!(group.title, "Login alice");
        assert_eq!(group.rows.len(), 1);
        assert_eq!(group.rows[0].action, "enter alice");
        assert_eq!(group.rows[0].expected, "alice sees dashboard");
        assert_eq!(group.rows[0].step_number, Some(1));
    }

    #[test]
    fn test_one_group_per_replacement_set() {
        let tc = TestCase::new(5, "case @n")
            .with_parameters(table("columns: [n]\nrows:\n  - ['1']\n  - ['2']\n  - ['3']\n"))
            .with_actions(vec![Action::step("a", ""), Action::step("b", "")]);

        let report = assemble(&[tc], &ExportOptions::default());

        let titles: Vec<&str> = report.groups.iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, vec!["case 1", "case 2", "case 3"]);
        let spans: Vec<(u32, u32)> = report.groups.iter().filter_map(RowGroup::row_span).collect();
        assert_eq!(spans, vec![(1, 2), (3, 4), (5, 6)]);
        for group in &report.groups {
            let numbers: Vec<Option<u32>> = group.rows.iter().map(|r| r.step_number).collect();
            assert_eq!(numbers, vec![Some(1), Some(2)]);
        }
    }

    #[test]
    fn test_stories_filtered_and_joined() {
        let mut tc = TestCase::new(1, "t").with_actions(vec![Action::step("a", "")]);
        tc.add_link("Tests", 10);
        tc.add_link("Related", 11);
        tc.add_link("Tests", 12);
        tc.add_link("tests", 13);

        let report = assemble(&[tc], &ExportOptions::default());
        assert_eq!(report.groups[0].stories, "10\n12");
    }

    #[test]
    fn test_no_story_links_is_empty() {
        let mut tc = TestCase::new(1, "t").with_actions(vec![Action::step("a", "")]);
        tc.add_link("Parent", 3);

        let report = assemble(&[tc], &ExportOptions::default());
        assert_eq!(report.groups[0].stories, "");
    }

    #[test]
    fn test_custom_story_relation() {
        let mut tc = TestCase::new(1, "t").with_actions(vec![Action::step("a", "")]);
        tc.add_link("Tests", 3);
        tc.add_link("Tested By", 4);

        let options = ExportOptions::default().with_story_relation("Tested By");
        let report = assemble(&[tc], &options);
        assert_eq!(report.groups[0].stories, "4");
    }

    #[test]
    fn test_empty_case_placeholder() {
        let cases = vec![
            TestCase::new(1, "empty").with_actions(vec![Action::group(vec![])]),
            TestCase::new(2, "full").with_actions(vec![Action::step("a", "")]),
        ];

        let report = assemble(&cases, &ExportOptions::default());

        assert_eq!(report.groups.len(), 2);
        assert_eq!(report.groups[0].rows, vec![StepRow::placeholder(1)]);
        assert_eq!(report.groups[1].row_span(), Some((2, 2)));
        assert_eq!(report.groups[1].rows[0].step_number, Some(1));
    }

    #[test]
    fn test_empty_case_skip() {
        let cases = vec![
            TestCase::new(1, "empty"),
            TestCase::new(2, "full").with_actions(vec![Action::step("a", "")]),
        ];

        let options = ExportOptions::default().with_empty_cases(EmptyCasePolicy::Skip);
        let report = assemble(&cases, &options);

        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.groups[0].test_case_id, 2);
        assert_eq!(report.groups[0].row_span(), Some((1, 1)));
    }

    #[test]
    fn test_stories_are_substituted() {
        let mut tc = TestCase::new(1, "t")
            .with_parameters(table("columns: ['1']\nrows:\n  - [one]\n"))
            .with_actions(vec![Action::step("a", "")]);
        tc.add_link("Tests", 1);
        tc.add_link("Tests", 2);

        // "@1" never appears in "1\n2", so nothing changes
        let report = assemble(&[tc], &ExportOptions::default());
        assert_eq!(report.groups[0].stories, "1\n2");
    }

    #[test]
    fn test_sheet_name_from_options() {
        let options = ExportOptions::default().with_sheet_name("Regression");
        let report = assemble(&[], &options);
        assert_eq!(report.sheet_name, "Regression");
        assert!(report.groups.is_empty());
    }
}
