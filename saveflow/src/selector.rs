use crate::element::Element;
use crate::errors::FlowError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How acceptable text values are compared against a node's trimmed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMatch {
    /// Trimmed text equals one of the listed values.
    #[default]
    Exact,
    /// Trimmed text contains one of the listed values as a substring.
    Contains,
}

/// Describes one kind of control to look for: which roles are candidates,
/// which texts are acceptable, and whether the node must be rendered.
///
/// An empty role list accepts any role; an empty text list accepts any
/// text. With `visible = false` a hidden match is acceptable and the
/// caller is responsible for forcing it visible before acting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSpec {
    pub roles: Vec<String>,
    pub texts: Vec<String>,
    #[serde(default)]
    pub mode: TextMatch,
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Restrict the scan to the subtree of the first node matching this
    /// container spec.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub within: Option<Box<MatchSpec>>,
}

fn default_visible() -> bool {
    true
}

impl MatchSpec {
    pub fn exact(
        roles: impl IntoIterator<Item = impl Into<String>>,
        texts: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            texts: texts.into_iter().map(Into::into).collect(),
            mode: TextMatch::Exact,
            visible: true,
            within: None,
        }
    }

    pub fn contains(
        roles: impl IntoIterator<Item = impl Into<String>>,
        texts: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            mode: TextMatch::Contains,
            ..Self::exact(roles, texts)
        }
    }

    /// Accept hidden matches too.
    pub fn hidden_ok(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Scope the scan to the first node matching `container`.
    pub fn within(mut self, container: MatchSpec) -> Self {
        self.within = Some(Box::new(container));
        self
    }

    /// Whether `element` satisfies this spec. Pure function of the
    /// element's current snapshot; never waits.
    pub fn matches(&self, element: &Element) -> bool {
        if !self.roles.is_empty() {
            let role = element.role();
            if !self.roles.iter().any(|r| r.eq_ignore_ascii_case(&role)) {
                return false;
            }
        }
        if self.visible && !element.is_visible() {
            return false;
        }
        if self.texts.is_empty() {
            return true;
        }
        let text = element.text();
        match self.mode {
            TextMatch::Exact => self.texts.iter().any(|t| text == *t),
            TextMatch::Contains => self.texts.iter().any(|t| text.contains(t.as_str())),
        }
    }
}

impl fmt::Display for MatchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.visible {
            write!(f, "hidden ")?;
        }
        let sep = match self.mode {
            TextMatch::Exact => ':',
            TextMatch::Contains => '~',
        };
        write!(f, "{}{}{}", self.roles.join(","), sep, self.texts.join("|"))
    }
}

/// Compact string form: `roles:texts` for exact matching, `roles~texts`
/// for containment, with roles comma-separated, texts `|`-separated, and
/// an optional leading `hidden ` to accept non-rendered matches.
///
/// `"link,button~一键转存"` matches a link or button whose trimmed text
/// contains 一键转存. `"dialog:"` matches any visible dialog.
impl FromStr for MatchSpec {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (rest, visible) = match trimmed.strip_prefix("hidden ") {
            Some(rest) => (rest.trim_start(), false),
            None => (trimmed, true),
        };
        let (mode, sep_idx) = match (rest.find(':'), rest.find('~')) {
            (Some(c), Some(t)) if t < c => (TextMatch::Contains, t),
            (Some(c), _) => (TextMatch::Exact, c),
            (None, Some(t)) => (TextMatch::Contains, t),
            (None, None) => {
                return Err(FlowError::InvalidMatchSpec(format!(
                    "missing ':' or '~' separator in \"{s}\""
                )))
            }
        };
        let roles: Vec<String> = rest[..sep_idx]
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(String::from)
            .collect();
        if roles.is_empty() {
            return Err(FlowError::InvalidMatchSpec(format!(
                "no candidate roles in \"{s}\""
            )));
        }
        let texts: Vec<String> = rest[sep_idx + 1..]
            .split('|')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();
        Ok(Self {
            roles,
            texts,
            mode,
            visible,
            within: None,
        })
    }
}
