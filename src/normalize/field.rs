//! Shapes a single source field can take before it is flattened to a string.

use serde_json::Value;

use super::xml::Element;

/// Keys holding the primary text of an object-shaped field
const TEXT_KEYS: [&str; 4] = ["#text", "text", "value", "name"];

/// A source field as found in the payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldShape {
    /// Missing or null
    Absent,
    /// Plain text or a number
    Scalar(String),
    /// Several text pieces, e.g. a structured abstract
    Fragments(Vec<String>),
    /// An object or attributed element; holds its primary text if any
    Keyed(Option<String>),
}

impl FieldShape {
    pub fn from_json(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => FieldShape::Absent,
            Some(Value::String(s)) => FieldShape::Scalar(s.clone()),
            Some(Value::Number(n)) => FieldShape::Scalar(n.to_string()),
            Some(Value::Bool(b)) => FieldShape::Scalar(b.to_string()),
            Some(Value::Array(items)) => FieldShape::Fragments(
                items
                    .iter()
                    .filter_map(|item| FieldShape::from_json(Some(item)).into_text())
                    .collect(),
            ),
            Some(Value::Object(map)) => FieldShape::Keyed(
                TEXT_KEYS
                    .iter()
                    .find_map(|key| map.get(*key))
                    .and_then(|v| FieldShape::from_json(Some(v)).into_text()),
            ),
        }
    }

    /// Shape of a field made of zero or more sibling elements
    pub fn from_elements(elements: &[&Element]) -> Self {
        match elements {
            [] => FieldShape::Absent,
            [single] if single.has_attributes() => FieldShape::Keyed(Some(single.text())),
            [single] => FieldShape::Scalar(single.text()),
            many => FieldShape::Fragments(many.iter().map(|e| e.text()).collect()),
        }
    }

    /// Text content, `None` when absent or blank
    pub fn into_text(self) -> Option<String> {
        let text = match self {
            FieldShape::Absent | FieldShape::Keyed(None) => return None,
            FieldShape::Scalar(s) | FieldShape::Keyed(Some(s)) => s.trim().to_string(),
            FieldShape::Fragments(parts) => parts
                .iter()
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        };
        (!text.is_empty()).then_some(text)
    }

    /// Text content, or `placeholder` when absent or blank
    pub fn resolve(self, placeholder: &str) -> String {
        self.into_text()
            .unwrap_or_else(|| placeholder.to_string())
    }
}

/// First four-digit run in `text` that is not part of a longer number
pub fn extract_year(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let digit = |i: usize| bytes.get(i).is_some_and(|b| b.is_ascii_digit());
    (0..bytes.len().saturating_sub(3))
        .find(|&i| {
            (i..i + 4).all(digit) && (i == 0 || !digit(i - 1)) && !digit(i + 4)
        })
        .map(|i| text[i..i + 4].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_shapes() {
        assert_eq!(FieldShape::from_json(None), FieldShape::Absent);
        assert_eq!(FieldShape::from_json(Some(&json!(null))), FieldShape::Absent);
        assert_eq!(
            FieldShape::from_json(Some(&json!(2021))),
            FieldShape::Scalar("2021".into())
        );
        assert_eq!(
            FieldShape::from_json(Some(&json!(["a", "b"]))),
            FieldShape::Fragments(vec!["a".into(), "b".into()])
        );
        assert_eq!(
            FieldShape::from_json(Some(&json!({"#text": "x", "@Label": "L"}))),
            FieldShape::Keyed(Some("x".into()))
        );
        assert_eq!(
            FieldShape::from_json(Some(&json!({"other": 1}))),
            FieldShape::Keyed(None)
        );
    }

    #[test]
    fn test_resolve_placeholders() {
        assert_eq!(FieldShape::Absent.resolve("N/A"), "N/A");
        assert_eq!(FieldShape::Scalar("   ".into()).resolve("N/A"), "N/A");
        assert_eq!(FieldShape::Keyed(None).resolve("No Title Found"), "No Title Found");
        assert_eq!(
            FieldShape::Fragments(vec![" Background.".into(), "".into(), "Results. ".into()])
                .resolve("N/A"),
            "Background. Results."
        );
    }

    #[test]
    fn test_extract_year() {
        assert_eq!(extract_year("2023 Jan 5"), Some("2023".into()));
        assert_eq!(extract_year("Winter 1998-1999"), Some("1998".into()));
        assert_eq!(extract_year("vol 12345"), None);
        assert_eq!(extract_year(""), None);
    }
}
