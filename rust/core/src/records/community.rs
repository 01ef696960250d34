use super::{Record, RecordId, Table, nullable, require_text};
use crate::prelude::*;
use crate::views::Dated;

const ANONYMOUS_NAME: &str = "Anônimo";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Group {
    pub id: RecordId,
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub day: String,
    #[serde(default, deserialize_with = "nullable")]
    pub time: String,
    #[serde(default, deserialize_with = "nullable")]
    pub leader: String,
    #[serde(default, deserialize_with = "nullable")]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GroupDraft {
    pub name: String,
    pub day: String,
    pub time: String,
    pub leader: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GroupPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leader: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Record for Group {
    const TABLE: Table = Table::Groups;
    type Draft = GroupDraft;
    type Patch = GroupPatch;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn validate_draft(draft: &GroupDraft) -> Result<()> {
        require_text(Self::TABLE, "name", &draft.name)
    }
}

/// Follow-up state of a prayer request, stored as its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrayerStatus {
    Open,
    Answered,
}

impl PrayerStatus {
    pub fn label(self) -> &'static str {
        match self {
            PrayerStatus::Open => "Novo",
            PrayerStatus::Answered => "Atendido",
        }
    }

    /// Unknown or missing labels read as `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Novo" => Some(PrayerStatus::Open),
            "Atendido" => Some(PrayerStatus::Answered),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Prayer {
    pub id: RecordId,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    pub request: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Prayer {
    pub fn status(&self) -> Option<PrayerStatus> {
        self.status.as_deref().and_then(PrayerStatus::from_label)
    }

    /// Patch flipping an open request to answered; anything else goes back
    /// to open.
    pub fn toggle_status_patch(&self) -> PrayerPatch {
        let next = match self.status() {
            Some(PrayerStatus::Open) => PrayerStatus::Answered,
            _ => PrayerStatus::Open,
        };
        PrayerPatch {
            status: Some(next.label().to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PrayerDraft {
    pub name: String,
    pub request: String,
}

impl PrayerDraft {
    /// A blank name is submitted as anonymous.
    pub fn new(name: &str, request: impl Into<String>) -> Self {
        let name = name.trim();
        Self {
            name: if name.is_empty() {
                ANONYMOUS_NAME.to_string()
            } else {
                name.to_string()
            },
            request: request.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PrayerPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Record for Prayer {
    const TABLE: Table = Table::Prayers;
    type Draft = PrayerDraft;
    type Patch = PrayerPatch;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn validate_draft(draft: &PrayerDraft) -> Result<()> {
        require_text(Self::TABLE, "request", &draft.request)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Member {
    pub id: RecordId,
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub role: String,
    #[serde(default, deserialize_with = "nullable")]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MemberDraft {
    pub name: String,
    pub role: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MemberPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Record for Member {
    const TABLE: Table = Table::Members;
    type Draft = MemberDraft;
    type Patch = MemberPatch;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn validate_draft(draft: &MemberDraft) -> Result<()> {
        require_text(Self::TABLE, "name", &draft.name)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Volunteer {
    pub id: RecordId,
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub ministry: String,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct VolunteerDraft {
    pub name: String,
    pub ministry: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct VolunteerPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ministry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Record for Volunteer {
    const TABLE: Table = Table::Volunteers;
    type Draft = VolunteerDraft;
    type Patch = VolunteerPatch;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn validate_draft(draft: &VolunteerDraft) -> Result<()> {
        require_text(Self::TABLE, "name", &draft.name)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Course {
    pub id: RecordId,
    pub title: String,
    /// Free-form schedule text, e.g. "Sábados, 9h".
    #[serde(default, deserialize_with = "nullable")]
    pub when: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CourseDraft {
    pub title: String,
    pub when: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CoursePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Record for Course {
    const TABLE: Table = Table::Courses;
    type Draft = CourseDraft;
    type Patch = CoursePatch;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn validate_draft(draft: &CourseDraft) -> Result<()> {
        require_text(Self::TABLE, "title", &draft.title)
    }
}

macro_rules! dated_by_creation {
    ($($record:ty),+) => {
        $(
            impl Dated for $record {
                fn date_key(&self) -> Option<&str> {
                    self.created_at.as_deref()
                }
            }
        )+
    };
}

dated_by_creation!(Group, Prayer, Member, Volunteer, Course);
