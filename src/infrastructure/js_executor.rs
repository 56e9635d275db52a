//! JS executor - infrastructure layer
//!
//! Owns the page and only exposes "run this script" as a capability.

use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::BrowserError;

/// JS executor
///
/// Responsibilities:
/// - owns exactly one `Page`
/// - exposes `eval()`
/// - knows nothing about queries, candidates or leads
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// Borrow the page for non-script operations
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Run a script and return its JSON result
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue, BrowserError> {
        let result = self.page.evaluate(js_code.into()).await?;
        Ok(result.into_value()?)
    }

    /// Run a script and deserialize its result
    pub async fn eval_as<T: DeserializeOwned>(
        &self,
        js_code: impl Into<String>,
    ) -> Result<T, BrowserError> {
        let json_value = self.eval(js_code).await?;
        Ok(serde_json::from_value(json_value)?)
    }
}

/// Embed `value` into a script as a JS string literal
pub fn js_string(value: &str) -> String {
    // a JSON string literal is a valid JS string literal
    serde_json::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_string_escapes_quotes() {
        assert_eq!(js_string("Accept all"), r#""Accept all""#);
        assert_eq!(js_string(r#"a"b\c"#), r#""a\"b\\c""#);
        assert_eq!(js_string("line\nbreak"), r#""line\nbreak""#);
    }
}
