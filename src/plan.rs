//! Command planning: executable blocks plus a substitution context become an
//! ordered, immutable list of steps.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;

/// Substitution values keyed by placeholder name.
pub type PlanContext = BTreeMap<String, String>;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{([A-Za-z_][A-Za-z0-9_]*)\}\}").expect("placeholder pattern is valid")
});

/// Where a step came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOrigin {
    /// Built from the grade rules.
    Standard,
    /// Extracted from a skill document.
    Harvested,
    /// Typed in by the operator.
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandStep {
    pub label: String,
    /// Command text after placeholder substitution.
    pub command: String,
    pub origin: StepOrigin,
    /// Index of the source block. Steps sharing a block share shell state.
    pub block: usize,
}

impl CommandStep {
    pub fn new(
        label: impl Into<String>,
        command: impl Into<String>,
        origin: StepOrigin,
        block: usize,
    ) -> Self {
        Self {
            label: label.into(),
            command: command.into(),
            origin,
            block,
        }
    }
}

/// Ordered, immutable sequence of steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CommandPlan {
    steps: Vec<CommandStep>,
}

impl CommandPlan {
    #[must_use]
    pub const fn new(steps: Vec<CommandStep>) -> Self {
        Self { steps }
    }

    /// One step per command, all in a single block.
    #[must_use]
    pub fn from_commands<S: AsRef<str>>(commands: &[(S, S)], origin: StepOrigin) -> Self {
        let steps = commands
            .iter()
            .map(|(label, command)| CommandStep::new(label.as_ref(), command.as_ref(), origin, 0))
            .collect();
        Self { steps }
    }

    #[must_use]
    pub fn steps(&self) -> &[CommandStep] {
        &self.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CommandStep> {
        self.steps.iter()
    }
}

impl<'a> IntoIterator for &'a CommandPlan {
    type Item = &'a CommandStep;
    type IntoIter = std::slice::Iter<'a, CommandStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

/// Replace `{{key}}` placeholders from `context`. Unknown keys stay verbatim.
#[must_use]
pub fn substitute<'a>(text: &'a str, context: &PlanContext) -> Cow<'a, str> {
    if context.is_empty() {
        return Cow::Borrowed(text);
    }
    PLACEHOLDER.replace_all(text, |caps: &Captures<'_>| {
        context
            .get(&caps[1])
            .cloned()
            .unwrap_or_else(|| caps[0].to_string())
    })
}

/// Placeholders in `text` with no value in `context`.
#[must_use]
pub fn unresolved_placeholders(text: &str, context: &PlanContext) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .filter(|key| !context.contains_key(key))
        .collect()
}

/// Build a plan from the blocks of a skill document.
///
/// Every non-empty line not starting with `#` becomes one step, in source
/// order. Steps remember their block so the engine can carry shell state
/// (working directory, exports) from one line to the next.
#[must_use]
pub fn build_plan<S: AsRef<str>>(blocks: &[S], context: &PlanContext) -> CommandPlan {
    let mut steps = Vec::new();
    for (block, body) in blocks.iter().enumerate() {
        for line in body.as_ref().lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let command = substitute(line, context).into_owned();
            let label = format!("Step {}", steps.len() + 1);
            steps.push(CommandStep::new(label, command, StepOrigin::Harvested, block));
        }
    }
    CommandPlan::new(steps)
}

/// Parse `key=value` pairs (as given on the command line) into a context.
pub fn parse_context_pairs<S: AsRef<str>>(pairs: &[S]) -> crate::Result<PlanContext> {
    let mut context = PlanContext::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let Some((key, value)) = pair.split_once('=') else {
            return Err(crate::JaavisError::Parse(format!(
                "expected key=value, got {pair:?}"
            )));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(crate::JaavisError::Parse(format!("empty key in {pair:?}")));
        }
        context.insert(key.to_string(), value.to_string());
    }
    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TestCase, run_table_tests};

    fn ctx(pairs: &[(&str, &str)]) -> PlanContext {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn empty_blocks_make_empty_plan() {
        let blocks: Vec<String> = Vec::new();
        assert!(build_plan(&blocks, &PlanContext::new()).is_empty());
    }

    #[test]
    fn lines_become_steps_in_order() {
        let blocks = vec![
            "# prepare\nmkdir -p {{target_dir}}\n\ncd {{target_dir}}".to_string(),
            "npm install".to_string(),
        ];
        let plan = build_plan(&blocks, &ctx(&[("target_dir", "app")]));
        let commands: Vec<_> = plan.iter().map(|s| s.command.as_str()).collect();
        assert_eq!(commands, vec!["mkdir -p app", "cd app", "npm install"]);
        let blocks_idx: Vec<_> = plan.iter().map(|s| s.block).collect();
        assert_eq!(blocks_idx, vec![0, 0, 1]);
        assert_eq!(plan.steps()[2].label, "Step 3");
        assert!(plan.iter().all(|s| s.origin == StepOrigin::Harvested));
    }

    #[test]
    fn substitution_table() {
        let context = ctx(&[("name", "demo"), ("dir", ".")]);
        let cases = vec![
            TestCase {
                name: "known key",
                input: "echo {{name}}",
                expected: "echo demo".to_string(),
            },
            TestCase {
                name: "unknown key left verbatim",
                input: "cd {{missing}} && ls {{dir}}",
                expected: "cd {{missing}} && ls .".to_string(),
            },
            TestCase {
                name: "single braces untouched",
                input: "echo ${HOME} {name}",
                expected: "echo ${HOME} {name}".to_string(),
            },
        ];
        run_table_tests(cases, |input| substitute(input, &context).into_owned()).unwrap();
    }

    #[test]
    fn substitution_is_idempotent() {
        let context = ctx(&[("a", "x")]);
        let once = substitute("run {{a}} {{b}}", &context).into_owned();
        let twice = substitute(&once, &context).into_owned();
        assert_eq!(once, twice);
    }

    #[test]
    fn reports_unresolved() {
        let context = ctx(&[("a", "x")]);
        assert_eq!(
            unresolved_placeholders("{{a}} {{b}} {{c}}", &context),
            vec!["b".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn parses_context_pairs() {
        let context = parse_context_pairs(&["target_dir=.", "url=a=b"]).unwrap();
        assert_eq!(context["target_dir"], ".");
        assert_eq!(context["url"], "a=b");
        assert!(parse_context_pairs(&["novalue"]).is_err());
        assert!(parse_context_pairs(&["=x"]).is_err());
    }
}
