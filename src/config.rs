//! Export configuration

/// Worksheet name used when none is configured
pub const DEFAULT_SHEET_NAME: &str = "Test Script";

/// Link relation that marks a work item as the user story a test case covers
pub const DEFAULT_STORY_RELATION: &str = "Tests";

/// What to do with a test case whose action tree yields no steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyCasePolicy {
    /// Emit one row with blank step fields so the test case still appears
    #[default]
    Placeholder,
    /// Leave the test case out of the sheet
    Skip,
}

/// Options for assembling and writing a test script
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub sheet_name: String,
    pub story_relation: String,
    pub empty_cases: EmptyCasePolicy,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            story_relation: DEFAULT_STORY_RELATION.to_string(),
            empty_cases: EmptyCasePolicy::default(),
        }
    }
}

impl ExportOptions {
    pub fn with_sheet_name(mut self, sheet_name: impl Into<String>) -> Self {
        self.sheet_name = sheet_name.into();
        self
    }

    pub fn with_story_relation(mut self, relation: impl Into<String>) -> Self {
        self.story_relation = relation.into();
        self
    }

    pub fn with_empty_cases(mut self, policy: EmptyCasePolicy) -> Self {
        self.empty_cases = policy;
        self
    }
}
