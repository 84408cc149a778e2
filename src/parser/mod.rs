use crate::error::{ExportError, ExportResult};
use crate::types::{
    Action, PlanFile, SharedStep, TestCase, TestPlan, TestStep, TestSuite, WorkItemLink,
};
use serde_yaml::{Mapping, Value};
use std::path::Path;

/// Parse a test plan file and return every plan plus the shared-step library.
///
/// The file is a YAML document with two top-level keys:
/// - `shared_steps`: reusable action sequences, referenced by id
/// - `plans`: named plans, each with a `root_suite` of test cases and child suites
///
/// # Actions
/// Every action is a mapping with exactly one of these keys:
/// - `step`: `{ title, expected, attachments }` (or a bare title string)
/// - `group`: a list of actions (or `{ actions: [...] }`)
/// - `shared`: the id of a shared step
///
/// Any other key is rejected with [`ExportError::UnsupportedActionKind`].
/// Missing or null `title` / `expected` text is read as an empty string.
///
/// # Example
/// ```no_run
/// use testcase_export::parser::parse_plan_file;
/// use std::path::Path;
///
/// let file = parse_plan_file(Path::new("plan.yaml"))?;
/// let plan = file.select_plan(None)?;
/// println!("Test cases: {}", plan.all_test_cases().len());
/// # Ok::<(), testcase_export::error::ExportError>(())
/// ```
pub fn parse_plan_file(path: &Path) -> ExportResult<PlanFile> {
    let content = std::fs::read_to_string(path)?;
    parse_plan_str(&content)
}

/// Parse plan file content already in memory
pub fn parse_plan_str(content: &str) -> ExportResult<PlanFile> {
    let yaml: Value = serde_yaml::from_str(content)?;
    parse_plan_value(&yaml)
}

fn parse_plan_value(yaml: &Value) -> ExportResult<PlanFile> {
    let root = yaml
        .as_mapping()
        .ok_or_else(|| ExportError::Parse("Plan file must be a mapping".to_string()))?;

    let mut file = PlanFile::new();

    if let Some(shared) = root.get("shared_steps") {
        for (idx, item) in sequence(shared, "shared_steps")?.iter().enumerate() {
            let shared_step = parse_shared_step(item, &format!("shared_steps[{}]", idx))?;
            if file.shared_steps.contains_key(&shared_step.id) {
                return Err(ExportError::Parse(format!(
                    "Duplicate shared step id {}",
                    shared_step.id
                )));
            }
            file.add_shared_step(shared_step);
        }
    }

    let plans = root
        .get("plans")
        .ok_or_else(|| ExportError::Parse("Missing 'plans' section".to_string()))?;
    for (idx, item) in sequence(plans, "plans")?.iter().enumerate() {
        file.add_plan(parse_plan(item, &format!("plans[{}]", idx))?);
    }

    Ok(file)
}

fn parse_shared_step(value: &Value, location: &str) -> ExportResult<SharedStep> {
    let map = mapping(value, location)?;
    let id = required_id(map, "id", location)?;
    let title = text_field(map, "title", location)?;
    let actions = match map.get("actions") {
        Some(v) => parse_actions(v, &format!("{}.actions", location))?,
        None => Vec::new(),
    };
    Ok(SharedStep { id, title, actions })
}

fn parse_plan(value: &Value, location: &str) -> ExportResult<TestPlan> {
    let map = mapping(value, location)?;
    let name = text_field(map, "name", location)?;
    let root_suite = match map.get("root_suite") {
        Some(v) => parse_suite(v, &format!("{}.root_suite", location))?,
        None => {
            return Err(ExportError::Parse(format!(
                "{}: missing 'root_suite'",
                location
            )))
        }
    };
    Ok(TestPlan { name, root_suite })
}

fn parse_suite(value: &Value, location: &str) -> ExportResult<TestSuite> {
    let map = mapping(value, location)?;
    let mut suite = TestSuite::new(text_field(map, "title", location)?);

    if let Some(cases) = map.get("test_cases") {
        let loc = format!("{}.test_cases", location);
        for (idx, item) in sequence(cases, &loc)?.iter().enumerate() {
            suite.add_test_case(parse_test_case(item, &format!("{}[{}]", loc, idx))?);
        }
    }

    if let Some(children) = map.get("suites") {
        let loc = format!("{}.suites", location);
        for (idx, item) in sequence(children, &loc)?.iter().enumerate() {
            suite.add_suite(parse_suite(item, &format!("{}[{}]", loc, idx))?);
        }
    }

    Ok(suite)
}

fn parse_test_case(value: &Value, location: &str) -> ExportResult<TestCase> {
    let map = mapping(value, location)?;

    let id = required_id(map, "id", location)?;
    let title = text_field(map, "title", location)?;

    let actions = match map.get("actions") {
        Some(v) => parse_actions(v, &format!("{}.actions", location))?,
        None => Vec::new(),
    };

    let links = match map.get("links") {
        Some(v) => parse_links(v, &format!("{}.links", location))?,
        None => Vec::new(),
    };

    // Interpreted lazily by the parameter resolver, which tolerates bad tables
    let parameters = map.get("parameters").cloned();

    Ok(TestCase {
        id,
        title,
        actions,
        parameters,
        links,
    })
}

fn parse_links(value: &Value, location: &str) -> ExportResult<Vec<WorkItemLink>> {
    let mut links = Vec::new();
    for (idx, item) in sequence(value, location)?.iter().enumerate() {
        let loc = format!("{}[{}]", location, idx);
        let map = mapping(item, &loc)?;
        links.push(WorkItemLink {
            relation: text_field(map, "relation", &loc)?,
            target: required_id(map, "target", &loc)?,
        });
    }
    Ok(links)
}

/// Parse an ordered list of actions
pub fn parse_actions(value: &Value, location: &str) -> ExportResult<Vec<Action>> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    sequence(value, location)?
        .iter()
        .enumerate()
        .map(|(idx, item)| parse_action(item, &format!("{}[{}]", location, idx)))
        .collect()
}

fn parse_action(value: &Value, location: &str) -> ExportResult<Action> {
    let map = mapping(value, location)?;

    let mut entries = map.iter();
    let (key, body) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        _ => {
            return Err(ExportError::Parse(format!(
                "{}: an action must have exactly one key (step, group or shared)",
                location
            )))
        }
    };

    let kind = key
        .as_str()
        .ok_or_else(|| ExportError::Parse(format!("{}: action kind must be a string", location)))?;

    match kind {
        "step" => Ok(Action::Step(parse_step(body, &format!("{}.step", location))?)),
        "group" => {
            let loc = format!("{}.group", location);
            let children = match body {
                Value::Mapping(inner) => match inner.get("actions") {
                    Some(v) => parse_actions(v, &format!("{}.actions", loc))?,
                    None => Vec::new(),
                },
                other => parse_actions(other, &loc)?,
            };
            Ok(Action::Group(children))
        }
        "shared" => {
            let id = body.as_u64().ok_or_else(|| {
                ExportError::Parse(format!(
                    "{}.shared: expected a shared step id, found {:?}",
                    location, body
                ))
            })?;
            Ok(Action::SharedReference(id))
        }
        other => Err(ExportError::UnsupportedActionKind {
            kind: other.to_string(),
            location: location.to_string(),
        }),
    }
}

fn parse_step(value: &Value, location: &str) -> ExportResult<TestStep> {
    // Shorthand: `- step: "click OK"`
    if let Value::String(title) = value {
        return Ok(TestStep::new(title.clone(), ""));
    }

    let map = mapping(value, location)?;
    let attachments = match map.get("attachments") {
        None | Some(Value::Null) => Vec::new(),
        Some(v) => {
            let loc = format!("{}.attachments", location);
            sequence(v, &loc)?
                .iter()
                .map(|a| scalar_text(a, &loc))
                .collect::<ExportResult<Vec<String>>>()?
        }
    };

    Ok(TestStep {
        title: text_field(map, "title", location)?,
        expected: text_field(map, "expected", location)?,
        attachments,
    })
}

//==============================================================================
// Value helpers
//==============================================================================

fn mapping<'v>(value: &'v Value, location: &str) -> ExportResult<&'v Mapping> {
    value
        .as_mapping()
        .ok_or_else(|| ExportError::Parse(format!("{}: expected a mapping", location)))
}

fn sequence<'v>(value: &'v Value, location: &str) -> ExportResult<&'v Vec<Value>> {
    value
        .as_sequence()
        .ok_or_else(|| ExportError::Parse(format!("{}: expected a list", location)))
}

fn required_id(map: &Mapping, key: &str, location: &str) -> ExportResult<u64> {
    match map.get(key) {
        Some(v) => v.as_u64().ok_or_else(|| {
            ExportError::Parse(format!(
                "{}.{}: expected a non-negative integer, found {:?}",
                location, key, v
            ))
        }),
        None => Err(ExportError::Parse(format!("{}: missing '{}'", location, key))),
    }
}

/// Text field that reads as "" when missing or null
fn text_field(map: &Mapping, key: &str, location: &str) -> ExportResult<String> {
    match map.get(key) {
        None => Ok(String::new()),
        Some(v) => scalar_text(v, &format!("{}.{}", location, key)),
    }
}

fn scalar_text(value: &Value, location: &str) -> ExportResult<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(ExportError::Parse(format!(
            "{}: expected text, found {:?}",
            location, other
        ))),
    }
}
