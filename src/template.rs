use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub const DEFAULT_TEMPLATE: &str = "%d seconds";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template has no %d placeholder")]
    MissingPlaceholder,
    #[error("template has more than one placeholder")]
    TooManyPlaceholders,
    #[error("unsupported directive `{0}` at byte {1}")]
    UnsupportedDirective(String, usize),
}

/// Display text with exactly one integer placeholder.
///
/// `%d` (or the positional `%1$d`) marks the integer; `%%` is a literal percent sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    prefix: String,
    suffix: String,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut prefix = String::new();
        let mut suffix = String::new();
        let mut seen_placeholder = false;

        let mut rest = source;
        while let Some(pos) = rest.find('%') {
            let offset = source.len() - rest.len() + pos;
            let out = if seen_placeholder { &mut suffix } else { &mut prefix };
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];

            if let Some(literal) = after.strip_prefix('%') {
                out.push('%');
                rest = literal;
                continue;
            }
            let remainder = match after.strip_prefix('d') {
                Some(r) => r,
                None => match after.strip_prefix("1$d") {
                    Some(r) => r,
                    None => {
                        let directive: String =
                            std::iter::once('%').chain(after.chars().take(1)).collect();
                        return Err(TemplateError::UnsupportedDirective(directive, offset));
                    }
                },
            };
            if seen_placeholder {
                return Err(TemplateError::TooManyPlaceholders);
            }
            seen_placeholder = true;
            rest = remainder;
        }

        if !seen_placeholder {
            return Err(TemplateError::MissingPlaceholder);
        }
        suffix.push_str(rest);

        Ok(Self {
            source: source.to_string(),
            prefix,
            suffix,
        })
    }

    pub fn render(&self, value: u64) -> String {
        format!("{}{}{}", self.prefix, value, self.suffix)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl Default for Template {
    fn default() -> Self {
        Self {
            source: DEFAULT_TEMPLATE.to_string(),
            prefix: String::new(),
            suffix: " seconds".to_string(),
        }
    }
}

impl FromStr for Template {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Serialize for Template {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for Template {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Template::parse(&source).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn renders_seconds() {
        let t = Template::parse("%d seconds").unwrap();
        assert_eq!(t.render(5), "5 seconds");
        assert_eq!(t.render(0), "0 seconds");
    }

    #[test]
    fn default_matches_parsed_default() {
        assert_eq!(Template::default(), Template::parse(DEFAULT_TEMPLATE).unwrap());
    }

    #[test]
    fn placeholder_anywhere() {
        assert_eq!(Template::parse("elapsed: %d").unwrap().render(12), "elapsed: 12");
        assert_eq!(Template::parse("%d").unwrap().render(3), "3");
        assert_eq!(Template::parse("%1$d detik").unwrap().render(9), "9 detik");
    }

    #[test]
    fn escaped_percent_is_literal() {
        let t = Template::parse("%d%% done, 100%% sure").unwrap();
        assert_eq!(t.render(40), "40% done, 100% sure");
    }

    #[test]
    fn rejects_bad_templates() {
        assert_matches!(Template::parse("seconds"), Err(TemplateError::MissingPlaceholder));
        assert_matches!(Template::parse("%d of %d"), Err(TemplateError::TooManyPlaceholders));
        assert_matches!(
            Template::parse("%s seconds"),
            Err(TemplateError::UnsupportedDirective(ref d, 0)) if d == "%s"
        );
        assert_matches!(
            Template::parse("%d 50%"),
            Err(TemplateError::UnsupportedDirective(ref d, 5)) if d == "%"
        );
    }

    #[test]
    fn serde_validates() {
        let t: Template = serde_json::from_str("\"%d sec\"").unwrap();
        assert_eq!(t.render(1), "1 sec");
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"%d sec\"");
        assert!(serde_json::from_str::<Template>("\"no number\"").is_err());
    }
}
