use std::{collections::HashMap, fmt};

use secrecy::SecretString;
use serde::Deserialize;

/// Names of the submitted fields read by [`LoginWorkflow`](crate::LoginWorkflow).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    /// Field carrying the user name.
    pub username: String,

    /// Field carrying the password.
    pub password: String,

    /// Field asking for a persistent login.
    pub remember: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            username: "username".to_string(),
            password: "password".to_string(),
            remember: "remember".to_string(),
        }
    }
}

/// Raw submitted fields, typically a decoded login form.
#[derive(Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct UserInput(HashMap<String, String>);

impl UserInput {
    /// Creates an empty input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds field `name` with `value`.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Returns the raw value of field `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

impl<K, V> FromIterator<(K, V)> for UserInput
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// Values are left out so passwords never reach the logs.
impl fmt::Debug for UserInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.0.keys().collect();
        names.sort();
        f.debug_struct("UserInput").field("fields", &names).finish()
    }
}

/// Sanitised login credentials, extracted fresh from each login request.
#[derive(Debug)]
pub struct Credentials {
    /// The user name, empty when not given.
    pub username: String,

    /// The password, empty when not given.
    pub password: SecretString,

    /// Whether a persistent login was requested.
    pub remember: bool,
}

impl Credentials {
    /// Extracts and sanitises the credentials found in `input`.
    pub fn from_input(input: &UserInput, fields: &FieldNames) -> Self {
        let field = |name: &str| input.get(name).map(sanitize).unwrap_or_default();

        Self {
            username: field(&fields.username),
            password: SecretString::from(field(&fields.password)),
            remember: is_truthy(&field(&fields.remember)),
        }
    }
}

/// Strips markup from submitted text.
///
/// NUL bytes and `<...>` tags are removed; an unterminated tag drops the rest
/// of the input. Quotes and stray angle brackets are encoded as numeric
/// entities. No semantic validation happens here.
pub fn sanitize(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    let mut in_tag = false;

    while let Some(c) = chars.next() {
        if in_tag {
            in_tag = c != '>';
            continue;
        }

        match c {
            '\0' => {}
            '<' => match chars.peek() {
                Some(next) if !next.is_whitespace() => in_tag = true,
                _ => out.push_str("&#60;"),
            },
            '>' => out.push_str("&#62;"),
            '\'' => out.push_str("&#39;"),
            '"' => out.push_str("&#34;"),
            c => out.push(c),
        }
    }

    out
}

/// Whether a submitted flag counts as set.
pub(crate) fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    !(value.is_empty()
        || value == "0"
        || value.eq_ignore_ascii_case("false")
        || value.eq_ignore_ascii_case("off")
        || value.eq_ignore_ascii_case("no"))
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn sanitize_strips_tags() {
        assert_eq!(sanitize("<b>ferris</b>"), "ferris");
        assert_eq!(sanitize("fer<script>alert(1)</script>ris"), "feralert(1)ris");
        assert_eq!(sanitize("ferris<img src=x"), "ferris");
    }

    #[test]
    fn sanitize_encodes_quotes_and_stray_brackets() {
        assert_eq!(sanitize(r#"o'hara "x""#), "o&#39;hara &#34;x&#34;");
        assert_eq!(sanitize("a < b > c"), "a &#60; b &#62; c");
        assert_eq!(sanitize("trailing <"), "trailing &#60;");
    }

    #[test]
    fn sanitize_drops_nul() {
        assert_eq!(sanitize("fer\0ris"), "ferris");
    }

    #[test]
    fn sanitize_keeps_plain_text() {
        assert_eq!(sanitize("hunter42!"), "hunter42!");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn truthiness() {
        for value in ["1", "on", "yes", "true", "remember"] {
            assert!(is_truthy(value), "{value} should be truthy");
        }

        for value in ["", " ", "0", "false", "FALSE", "off", "no"] {
            assert!(!is_truthy(value), "{value:?} should be falsy");
        }
    }

    #[test]
    fn credentials_default_to_empty() {
        let creds = Credentials::from_input(&UserInput::new(), &FieldNames::default());

        assert_eq!(creds.username, "");
        assert_eq!(creds.password.expose_secret(), "");
        assert!(!creds.remember);
    }

    #[test]
    fn credentials_use_configured_names() {
        let fields = FieldNames {
            username: "login".to_string(),
            password: "secret".to_string(),
            remember: "stay".to_string(),
        };
        let input: UserInput = [("login", "<i>ferris</i>"), ("secret", "hunter42"), ("stay", "1")]
            .into_iter()
            .collect();

        let creds = Credentials::from_input(&input, &fields);

        assert_eq!(creds.username, "ferris");
        assert_eq!(creds.password.expose_secret(), "hunter42");
        assert!(creds.remember);
    }

    #[test]
    fn debug_hides_values() {
        let input = UserInput::new()
            .with("username", "ferris")
            .with("password", "hunter42");
        let debug = format!("{input:?}");

        assert!(!debug.contains("hunter42"));
        assert!(debug.contains("password"));
    }
}
