use std::fmt;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A build-system target reference, parsed into its three components.
///
/// Textual form is `@repo//package:name`. The parser also accepts the
/// shorthand forms every Starlark-family label grammar supports:
/// `//package:name` (repo defaults to the empty/current-repo string),
/// `//package` (name defaults to the last path segment of `package`), and
/// `:name` (package defaults to the empty/current-package string).
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Label {
    pub repo: String,
    pub package: String,
    pub name: String,
}

impl Label {
    pub fn new(
        repo: impl Into<String>,
        package: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Label { repo: repo.into(), package: package.into(), name: name.into() }
    }

    pub fn parse(text: &str) -> Result<Label, String> {
        if text.is_empty() {
            return Err("empty label".to_string());
        }

        if let Some(name) = text.strip_prefix(':') {
            validate_name(text, name)?;
            return Ok(Label::new("", "", name));
        }

        let (repo, rest) = if let Some(after_at) = text.strip_prefix('@') {
            match after_at.find("//") {
                Some(idx) => (&after_at[..idx], &after_at[idx..]),
                None => {
                    return Err(format!(
                        "invalid label '{text}': expected '//' after repo name"
                    ))
                }
            }
        } else {
            ("", text)
        };
        validate_repo(text, repo)?;

        let rest = rest.strip_prefix("//").ok_or_else(|| {
            format!("invalid label '{text}': expected '//' before package path")
        })?;

        let (package, name) = match rest.find(':') {
            Some(idx) => (&rest[..idx], &rest[idx + 1..]),
            None => {
                let name = rest.rsplit('/').next().unwrap_or(rest);
                (rest, name)
            }
        };
        validate_package(text, package)?;
        validate_name(text, name)?;

        Ok(Label::new(repo, package, name))
    }
}

fn validate_repo(whole: &str, repo: &str) -> Result<(), String> {
    if repo.chars().any(|c| !is_repo_char(c)) {
        return Err(format!(
            "invalid label '{whole}': repo '{repo}' contains an invalid character"
        ));
    }
    Ok(())
}

fn validate_package(whole: &str, package: &str) -> Result<(), String> {
    if package.chars().any(|c| !is_package_char(c)) {
        return Err(format!(
            "invalid label '{whole}': package '{package}' contains an invalid character"
        ));
    }
    if package.starts_with('/') || package.ends_with('/') || package.contains("//") {
        return Err(format!(
            "invalid label '{whole}': package '{package}' has a malformed path"
        ));
    }
    Ok(())
}

fn validate_name(whole: &str, name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err(format!("invalid label '{whole}': empty target name"));
    }
    if name.chars().any(|c| !is_name_char(c)) {
        return Err(format!(
            "invalid label '{whole}': name '{name}' contains an invalid character"
        ));
    }
    Ok(())
}

fn is_repo_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
}

fn is_package_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/')
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '+' | '=' | ',' | '@')
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}//{}:{}", self.repo, self.package, self.name)
    }
}

impl Serialize for Label {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Label::parse(&text).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod label_tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("@r//p:t", Label::new("r", "p", "t"))]
    #[case("//p:t", Label::new("", "p", "t"))]
    #[case("//p/q", Label::new("", "p/q", "q"))]
    #[case(":t", Label::new("", "", "t"))]
    fn parses_valid_labels(#[case] text: &str, #[case] expected: Label) {
        assert_eq!(Label::parse(text).unwrap(), expected);
    }

    #[rstest]
    #[case("@r/p:t")]
    #[case("p:t")]
    #[case("@r//p:")]
    #[case("@r//p::t")]
    fn rejects_malformed_labels(#[case] text: &str) {
        assert!(Label::parse(text).is_err());
    }

    #[rstest]
    fn display_round_trips_full_form() {
        let label = Label::new("r", "p", "t");
        assert_eq!(label.to_string(), "@r//p:t");
        assert_eq!(Label::parse(&label.to_string()).unwrap(), label);
    }
}
