use serde_json::Value;

const FENCE_OPEN_JSON: &str = "```json";
const FENCE: &str = "```";

/// Result of cleaning and decoding one raw model response.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedDocument {
    Parsed(Value),
    Unparseable,
}

impl ExtractedDocument {
    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Parsed(value) => Some(value),
            Self::Unparseable => None,
        }
    }
}

/// Strips code-fence markers and decodes the remainder as strict JSON.
///
/// `None` stands for input that was never text; it is unparseable without
/// any cleanup attempt. Fence removal is a literal substring strip, so fence
/// markers inside the payload are removed as well.
pub fn extract(raw_text: Option<&str>) -> ExtractedDocument {
    let Some(raw_text) = raw_text else {
        return ExtractedDocument::Unparseable;
    };

    let cleaned = clean_text(raw_text);
    match serde_json::from_str::<Value>(&cleaned) {
        Ok(value) => ExtractedDocument::Parsed(value),
        Err(_) => ExtractedDocument::Unparseable,
    }
}

fn clean_text(raw_text: &str) -> String {
    raw_text.trim().replace(FENCE_OPEN_JSON, "").replace(FENCE, "")
}
