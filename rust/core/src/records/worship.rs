use super::{Record, RecordId, Table, nullable, require_text};
use crate::prelude::*;
use crate::views::Dated;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Event {
    pub id: RecordId,
    pub title: String,
    /// Local date-time as entered, e.g. `2024-03-01T20:00`.
    #[serde(default, deserialize_with = "nullable")]
    pub date: String,
    #[serde(default, deserialize_with = "nullable")]
    pub location: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct EventDraft {
    pub title: String,
    pub date: String,
    pub location: String,
    pub description: String,
}

impl EventDraft {
    /// Builds a draft from separate day (`YYYY-MM-DD`) and time (`HH:MM`)
    /// inputs.
    pub fn scheduled(
        title: impl Into<String>,
        day: &str,
        time: &str,
        location: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let (day, time) = (day.trim(), time.trim());
        let date = if time.is_empty() || day.is_empty() {
            day.to_string()
        } else {
            format!("{day}T{time}")
        };
        Self {
            title: title.into(),
            date,
            location: location.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct EventPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Record for Event {
    const TABLE: Table = Table::Events;
    type Draft = EventDraft;
    type Patch = EventPatch;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn validate_draft(draft: &EventDraft) -> Result<()> {
        require_text(Self::TABLE, "title", &draft.title)?;
        require_text(Self::TABLE, "date", &draft.date)
    }
}

impl Dated for Event {
    fn date_key(&self) -> Option<&str> {
        Some(&self.date)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sermon {
    pub id: RecordId,
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub speaker: String,
    #[serde(default, deserialize_with = "nullable")]
    pub date: String,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SermonDraft {
    pub title: String,
    pub speaker: String,
    pub date: String,
    pub video_url: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SermonPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Splits a comma separated tag input, dropping blanks.
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

impl Record for Sermon {
    const TABLE: Table = Table::Sermons;
    type Draft = SermonDraft;
    type Patch = SermonPatch;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn validate_draft(draft: &SermonDraft) -> Result<()> {
        require_text(Self::TABLE, "title", &draft.title)
    }
}

impl Dated for Sermon {
    fn date_key(&self) -> Option<&str> {
        Some(&self.date)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Notice {
    pub id: RecordId,
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NoticeDraft {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NoticePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl Record for Notice {
    const TABLE: Table = Table::Notices;
    type Draft = NoticeDraft;
    type Patch = NoticePatch;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn validate_draft(draft: &NoticeDraft) -> Result<()> {
        require_text(Self::TABLE, "title", &draft.title)
    }
}

impl Dated for Notice {
    fn date_key(&self) -> Option<&str> {
        self.created_at.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scheduled_event_joins_day_and_time() {
        let draft = EventDraft::scheduled("Culto", "2024-03-01", "20:00", "Itaquera", "");
        assert_eq!(draft.date, "2024-03-01T20:00");
        let no_time = EventDraft::scheduled("Culto", "2024-03-01", " ", "", "");
        assert_eq!(no_time.date, "2024-03-01");
    }

    #[test]
    fn event_draft_requires_title_and_date() {
        let mut draft = EventDraft::scheduled("Culto", "", "20:00", "", "");
        assert!(Event::validate_draft(&draft).is_err());
        draft.date = "2024-03-01".to_string();
        assert!(Event::validate_draft(&draft).is_ok());
        draft.title = "  ".to_string();
        let err = Event::validate_draft(&draft).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Client);
    }

    #[test]
    fn sermon_tags_parse_and_null_decode() {
        assert_eq!(parse_tags(" fé, , graça ,"), vec!["fé", "graça"]);

        let sermon: Sermon = serde_json::from_value(json!({
            "id": 9,
            "title": "Mensagem",
            "speaker": null,
            "date": "2024-02-11",
            "video_url": null,
            "tags": null,
        }))
        .unwrap();
        assert_eq!(sermon.speaker, "");
        assert!(sermon.tags.is_empty());
        assert_eq!(sermon.video_url, None);
    }

    #[test]
    fn patch_serializes_only_set_fields() {
        let patch = SermonPatch {
            tags: Some(vec!["oração".into()]),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"tags": ["oração"]})
        );
    }
}
