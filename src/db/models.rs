// Data models — the types that flow through a digest run.
//
// These are separate from the database queries so the ranking core and the
// collaborators can use them without depending on rusqlite directly.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Subject tag assigned to a paper by the acquisition step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Cs,
    Physics,
    Bio,
    Math,
}

/// Tag → display name. The display name is also the search query sent to
/// the literature API, and the table order is the fetch order.
pub static FIELD_TABLE: [(Field, &str, &str); 4] = [
    (Field::Cs, "cs", "Computer Science"),
    (Field::Physics, "physics", "Physics"),
    (Field::Bio, "bio", "Biology"),
    (Field::Math, "math", "Mathematics"),
];

impl Field {
    /// Every field, in table order.
    pub fn all() -> impl Iterator<Item = Field> {
        FIELD_TABLE.iter().map(|(field, _, _)| *field)
    }

    pub fn tag(&self) -> &'static str {
        self.entry().1
    }

    pub fn display_name(&self) -> &'static str {
        self.entry().2
    }

    fn entry(&self) -> &'static (Field, &'static str, &'static str) {
        // Rows follow declaration order.
        &FIELD_TABLE[*self as usize]
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for Field {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        FIELD_TABLE
            .iter()
            .find(|(_, tag, _)| tag.eq_ignore_ascii_case(wanted))
            .map(|(field, _, _)| *field)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown field '{wanted}'. Expected one of: {}",
                    FIELD_TABLE
                        .iter()
                        .map(|(_, tag, _)| *tag)
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

/// A paper as delivered by the acquisition step, already deduplicated.
///
/// `publication_date` is kept as the raw string from the source so that an
/// unparsable value reaches the scorer and falls back the documented way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperRecord {
    pub id: String,
    pub title: String,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub citation_count: u64,
    /// Not guaranteed to be <= `citation_count` by the source.
    #[serde(default)]
    pub influential_citation_count: u64,
    #[serde(default)]
    pub publication_date: Option<String>,
    pub field: Field,
    #[serde(default)]
    pub url: Option<String>,
}

/// A paper with its derived score and, once selected, its selection reason.
///
/// Both are recomputed every run and never read back as ranking input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPaper {
    pub paper: PaperRecord,
    pub score: f64,
    pub selection_reason: Option<String>,
}

/// A subscriber's preferred fields. Empty means "no preference".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberPreference {
    pub fields: BTreeSet<Field>,
}

impl SubscriberPreference {
    pub fn new(fields: impl IntoIterator<Item = Field>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn matches(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }

    /// Parse a comma-separated tag list ("cs,bio"). Blank input is no preference.
    pub fn parse_list(list: &str) -> anyhow::Result<Self> {
        let fields = list
            .split(',')
            .filter(|tag| !tag.trim().is_empty())
            .map(Field::from_str)
            .collect::<anyhow::Result<BTreeSet<_>>>()?;
        Ok(Self { fields })
    }

    /// Inverse of `parse_list`, used for storage.
    pub fn to_list(&self) -> String {
        self.fields
            .iter()
            .map(|f| f.tag())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// An active digest recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: i64,
    pub email: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub preference: SubscriberPreference,
}

impl Subscriber {
    /// A label safe to write to logs and file names.
    pub fn display_label(&self) -> String {
        match (&self.email, &self.telegram_chat_id) {
            (Some(email), _) => crate::delivery::mask_email(email),
            (None, Some(_)) => format!("telegram-{}", self.id),
            (None, None) => format!("subscriber-{}", self.id),
        }
    }
}
