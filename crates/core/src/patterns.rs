use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::IntentError;
use crate::models::IntentCategory;

/// Evaluation order. Failure phrasing overlaps monitoring phrasing
/// ("failed deployments"), so the narrower categories go first.
pub const PRIORITY_ORDER: [IntentCategory; 4] = [
    IntentCategory::DeploymentFailures,
    IntentCategory::OperationalApprovals,
    IntentCategory::SystemHealth,
    IntentCategory::DeploymentMonitoring,
];

const BUILTIN_RULES: &[(IntentCategory, &[&str])] = &[
    (
        IntentCategory::DeploymentFailures,
        &[
            r"\bfail(?:ed|ing|ure|ures|s)?\b",
            r"\bbrok(?:e|en)\b",
            r"\berrors?\b",
            r"\brolled back\b|\brolling back\b|\brollbacks?\b",
            r"\bcrash(?:ed|es|ing)?\b",
        ],
    ),
    (
        IntentCategory::OperationalApprovals,
        &[
            r"\bapprov(?:e|es|ed|al|als|ing|er|ers)\b",
            r"\bpending (?:requests?|changes?|reviews?|sign-?offs?)\b",
            r"\bsign[- ]?offs?\b",
            r"\bwaiting (?:on|for) me\b",
            r"\bneeds? my (?:review|sign-?off|ok)\b",
        ],
    ),
    (
        IntentCategory::SystemHealth,
        &[
            r"\b(?:un)?health(?:y|ier)?\b",
            r"\b(?:down|outages?|degraded)\b",
            r"\b(?:services?|systems?) (?:up|status)\b",
            r"\buptime\b",
            r"\blatency\b",
        ],
    ),
    (
        IntentCategory::DeploymentMonitoring,
        &[
            r"\bdeploy(?:s|ed|ing|ment|ments)?\b",
            r"\breleas(?:e|es|ed|ing)\b",
            r"\brollouts?\b",
            r"\bwhat (?:shipped|went out)\b",
        ],
    ),
];

static BUILTIN: Lazy<PatternTable> = Lazy::new(|| {
    let mut table = PatternTable::empty();
    for (category, patterns) in BUILTIN_RULES {
        for pattern in patterns.iter() {
            table
                .push(*category, pattern)
                .expect("built-in intent patterns compile");
        }
    }
    table
});

#[derive(Debug, Clone)]
pub struct PatternRule {
    category: IntentCategory,
    regex: Regex,
}

impl PatternRule {
    pub fn compile(category: IntentCategory, pattern: &str) -> Result<Self, IntentError> {
        if category == IntentCategory::Unsupported {
            return Err(IntentError::FallbackRule);
        }

        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| IntentError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;

        Ok(Self { category, regex })
    }

    pub fn category(&self) -> IntentCategory {
        self.category
    }

    /// The pattern source as written.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Operator-supplied rule, typically read from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRuleSpec {
    pub category: String,
    pub pattern: String,
}

impl PatternRuleSpec {
    pub fn load_file(path: impl AsRef<Path>) -> Result<Vec<Self>, IntentError> {
        let path = path.as_ref();
        let rule_file_error = |message: String| IntentError::RuleFile {
            path: path.display().to_string(),
            message,
        };

        let raw = fs::read_to_string(path).map_err(|err| rule_file_error(err.to_string()))?;
        serde_json::from_str(&raw).map_err(|err| rule_file_error(err.to_string()))
    }
}

/// Ordered rules per category, indexed by [`IntentCategory::index`].
/// The `Unsupported` slot stays empty.
#[derive(Debug, Clone)]
pub struct PatternTable {
    rules: [Vec<PatternRule>; 5],
}

impl PatternTable {
    fn empty() -> Self {
        Self {
            rules: Default::default(),
        }
    }

    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// Appends rules after the existing ones of their category, so earlier
    /// rules keep precedence under first-match-wins.
    pub fn with_rules(
        mut self,
        specs: impl IntoIterator<Item = PatternRuleSpec>,
    ) -> Result<Self, IntentError> {
        for spec in specs {
            let category = spec.category.parse::<IntentCategory>()?;
            self.push(category, &spec.pattern)?;
        }
        Ok(self)
    }

    fn push(&mut self, category: IntentCategory, pattern: &str) -> Result<(), IntentError> {
        let rule = PatternRule::compile(category, pattern)?;
        self.rules[category.index()].push(rule);
        Ok(())
    }

    pub fn rules_for(&self, category: IntentCategory) -> &[PatternRule] {
        &self.rules[category.index()]
    }

    pub fn rule_count(&self) -> usize {
        self.rules.iter().map(Vec::len).sum()
    }

    /// First rule matching `text`, walking categories in [`PRIORITY_ORDER`]
    /// and rules in declared order.
    pub fn first_match(&self, text: &str) -> Option<&PatternRule> {
        PRIORITY_ORDER
            .iter()
            .flat_map(|category| self.rules_for(*category))
            .find(|rule| rule.is_match(text))
    }
}
