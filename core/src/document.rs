use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Indexed profile fields, in the order their token streams are concatenated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Name,
    Research,
    Specialization,
    Publications,
    Bio,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Name,
        Field::Research,
        Field::Specialization,
        Field::Publications,
        Field::Bio,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Research => "research",
            Field::Specialization => "specialization",
            Field::Publications => "publications",
            Field::Bio => "bio",
        }
    }

    pub fn parse(s: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A text column as the cleaning stage emits it: plain text, or a list
/// (specializations and publications are often split into lists).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextValue {
    Text(String),
    List(Vec<String>),
}

impl TextValue {
    pub fn into_text(self) -> String {
        match self {
            TextValue::Text(s) => s,
            TextValue::List(items) => items
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Text(String),
    Number(u64),
}

impl RecordId {
    fn into_string(self) -> String {
        match self {
            RecordId::Text(s) => s.trim().to_string(),
            RecordId::Number(n) => n.to_string(),
        }
    }
}

/// One cleaned record as supplied by the storage collaborator, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    #[serde(default, alias = "faculty_id", alias = "id")]
    pub doc_id: Option<RecordId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "research_interests")]
    pub research: Option<TextValue>,
    #[serde(default)]
    pub specialization: Option<TextValue>,
    #[serde(default)]
    pub publications: Option<TextValue>,
    #[serde(default)]
    pub bio: Option<TextValue>,
    #[serde(default, alias = "mail")]
    pub email: Option<String>,
    #[serde(default)]
    pub profile_url: Option<String>,
}

/// A validated profile. `doc_id` and `name` are guaranteed non-blank.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub doc_id: String,
    pub name: String,
    pub research: Option<String>,
    pub specialization: Option<String>,
    pub publications: Option<String>,
    pub bio: Option<String>,
    pub email: Option<String>,
    pub profile_url: Option<String>,
}

impl Document {
    pub fn new(doc_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            name: name.into(),
            research: None,
            specialization: None,
            publications: None,
            bio: None,
            email: None,
            profile_url: None,
        }
    }

    pub fn with_field(mut self, field: Field, text: impl Into<String>) -> Self {
        let text = Some(text.into());
        match field {
            Field::Name => self.name = text.unwrap_or_default(),
            Field::Research => self.research = text,
            Field::Specialization => self.specialization = text,
            Field::Publications => self.publications = text,
            Field::Bio => self.bio = text,
        }
        self
    }

    pub fn field(&self, field: Field) -> Option<&str> {
        match field {
            Field::Name => Some(self.name.as_str()),
            Field::Research => self.research.as_deref(),
            Field::Specialization => self.specialization.as_deref(),
            Field::Publications => self.publications.as_deref(),
            Field::Bio => self.bio.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingDocId,
    MissingName,
    DuplicateDocId(String),
    /// The record was valid JSON but not shaped like a profile.
    Malformed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingDocId => f.write_str("missing doc_id"),
            SkipReason::MissingName => f.write_str("missing name"),
            SkipReason::DuplicateDocId(id) => write!(f, "duplicate doc_id {id}"),
            SkipReason::Malformed(e) => write!(f, "malformed record: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Accepted(Document),
    Skipped(SkipReason),
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl RawRecord {
    /// Checks required fields. Duplicate ids are only detectable across the
    /// whole corpus, see [`validate_corpus`].
    pub fn validate(self) -> RecordOutcome {
        let doc_id = match self.doc_id.map(RecordId::into_string).filter(|s| !s.is_empty()) {
            Some(id) => id,
            None => return RecordOutcome::Skipped(SkipReason::MissingDocId),
        };
        let name = match non_blank(self.name) {
            Some(name) => name,
            None => return RecordOutcome::Skipped(SkipReason::MissingName),
        };
        RecordOutcome::Accepted(Document {
            doc_id,
            name,
            research: non_blank(self.research.map(TextValue::into_text)),
            specialization: non_blank(self.specialization.map(TextValue::into_text)),
            publications: non_blank(self.publications.map(TextValue::into_text)),
            bio: non_blank(self.bio.map(TextValue::into_text)),
            email: non_blank(self.email),
            profile_url: non_blank(self.profile_url),
        })
    }
}

/// Validates every record in order. The first record with a given `doc_id`
/// wins; later ones are skipped as duplicates.
pub fn validate_corpus<I>(records: I) -> Vec<RecordOutcome>
where
    I: IntoIterator<Item = RawRecord>,
{
    validate_parsed(records.into_iter().map(Ok::<RawRecord, SkipReason>))
}

/// Like [`validate_corpus`], for records still in JSON form. Values that do not
/// deserialize into a [`RawRecord`] are skipped as malformed.
pub fn validate_json<I>(values: I) -> Vec<RecordOutcome>
where
    I: IntoIterator<Item = serde_json::Value>,
{
    validate_parsed(values.into_iter().map(|v| {
        serde_json::from_value::<RawRecord>(v).map_err(|e| SkipReason::Malformed(e.to_string()))
    }))
}

fn validate_parsed<I>(records: I) -> Vec<RecordOutcome>
where
    I: Iterator<Item = Result<RawRecord, SkipReason>>,
{
    let mut seen: HashSet<String> = HashSet::new();
    records
        .map(|rec| match rec.map(RawRecord::validate) {
            Ok(RecordOutcome::Accepted(doc)) if !seen.insert(doc.doc_id.clone()) => {
                RecordOutcome::Skipped(SkipReason::DuplicateDocId(doc.doc_id))
            }
            Ok(outcome) => outcome,
            Err(reason) => RecordOutcome::Skipped(reason),
        })
        .collect()
}
