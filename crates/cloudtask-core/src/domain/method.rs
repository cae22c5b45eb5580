//! HTTP method used when the managed service calls back into the app.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::SubmitError;

/// Cloud Tasks の `HttpMethod` enum と同じ綴りでシリアライズされる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Post,
    Get,
    Head,
    Put,
    Delete,
    Patch,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Post => "POST",
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// GET / HEAD / DELETE / OPTIONS は body を持てない
    pub fn allows_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = SubmitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "POST" => Ok(HttpMethod::Post),
            "GET" => Ok(HttpMethod::Get),
            "HEAD" => Ok(HttpMethod::Head),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "PATCH" => Ok(HttpMethod::Patch),
            "OPTIONS" => Ok(HttpMethod::Options),
            other => Err(SubmitError::invalid(format!("unsupported http method: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn default_is_post() {
        assert_eq!(HttpMethod::default(), HttpMethod::Post);
    }

    #[rstest]
    #[case("post", HttpMethod::Post)]
    #[case("GET", HttpMethod::Get)]
    #[case("Patch", HttpMethod::Patch)]
    fn parses_case_insensitively(#[case] input: &str, #[case] expected: HttpMethod) {
        assert_eq!(input.parse::<HttpMethod>().unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_method() {
        assert!(matches!(
            "TRACE".parse::<HttpMethod>(),
            Err(SubmitError::InvalidRequest(_))
        ));
    }

    #[test]
    fn serializes_as_api_enum_name() {
        let s = serde_json::to_string(&HttpMethod::Delete).unwrap();
        assert_eq!(s, "\"DELETE\"");
    }
}
