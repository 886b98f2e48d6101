//! Page context, related notes, and synthesis requests.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{SynthesisError, SynthesisResult};

/// The page the user is currently looking at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl PageContext {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Title, if present and not blank.
    pub fn title(&self) -> Option<&str> {
        non_blank(self.title.as_deref())
    }

    /// URL, if present and not blank.
    pub fn url(&self) -> Option<&str> {
        non_blank(self.url.as_deref())
    }
}

/// A saved note the ranking layer judged relevant to the current page.
///
/// Deserializes from either a flat note object or a ranked wrapper of the
/// form `{ "note": { ... }, "similarity": 0.8 }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRelatedNote")]
pub struct RelatedNote {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Relevance in `0.0..=1.0`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    /// Any other fields the caller attached to the note.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RelatedNote {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn with_similarity(mut self, similarity: f64) -> Self {
        self.similarity = Some(similarity);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Title, if present and not blank.
    pub fn title(&self) -> Option<&str> {
        non_blank(self.title.as_deref())
    }

    /// Note body: `text`, falling back to `content`.
    pub fn body(&self) -> Option<&str> {
        non_blank(self.text.as_deref()).or_else(|| non_blank(self.content.as_deref()))
    }

    /// Similarity as a rounded percentage, clamped to 0..=100.
    pub fn relevance_percent(&self) -> Option<u8> {
        self.similarity
            .filter(|s| s.is_finite())
            .map(|s| (s.clamp(0.0, 1.0) * 100.0).round() as u8)
    }
}

#[derive(Deserialize)]
struct NoteFields {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    similarity: Option<f64>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRelatedNote {
    Ranked {
        note: NoteFields,
        #[serde(default)]
        similarity: Option<f64>,
    },
    Flat(NoteFields),
}

impl From<NoteFields> for RelatedNote {
    fn from(fields: NoteFields) -> Self {
        Self {
            title: fields.title,
            text: fields.text,
            content: fields.content,
            url: fields.url,
            similarity: fields.similarity,
            extra: fields.extra,
        }
    }
}

impl From<RawRelatedNote> for RelatedNote {
    fn from(raw: RawRelatedNote) -> Self {
        match raw {
            RawRelatedNote::Ranked { note, similarity } => {
                let mut related = RelatedNote::from(note);
                if similarity.is_some() {
                    related.similarity = similarity;
                }
                related
            }
            RawRelatedNote::Flat(fields) => RelatedNote::from(fields),
        }
    }
}

/// A synthesis request as received from the surrounding application.
///
/// Both fields are optional on the wire so that malformed requests can be
/// rejected with a validation error instead of a decode error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisRequest {
    #[serde(default)]
    pub current_context: Option<PageContext>,
    #[serde(default)]
    pub related_notes: Option<Vec<RelatedNote>>,
}

impl SynthesisRequest {
    pub fn new(context: PageContext, notes: Vec<RelatedNote>) -> Self {
        Self {
            current_context: Some(context),
            related_notes: Some(notes),
        }
    }

    /// Check the request and split it into its validated parts.
    pub fn validate(self) -> SynthesisResult<ValidatedRequest> {
        let context = self
            .current_context
            .filter(|ctx| ctx.title().is_some())
            .ok_or_else(|| SynthesisError::Validation("Invalid current context provided".into()))?;

        let notes = self
            .related_notes
            .filter(|notes| !notes.is_empty())
            .ok_or_else(|| {
                SynthesisError::Validation("No related notes provided for synthesis".into())
            })?;

        Ok(ValidatedRequest { context, notes })
    }
}

/// A request whose context has a title and whose note list is non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    context: PageContext,
    notes: Vec<RelatedNote>,
}

impl ValidatedRequest {
    pub fn context(&self) -> &PageContext {
        &self.context
    }

    pub fn notes(&self) -> &[RelatedNote] {
        &self.notes
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
