//! Typed rows for every table the portal works with.

use std::fmt::Display;

use serde::Deserializer;

use crate::prelude::*;
use crate::views::SortDirection;

mod community;
mod worship;

pub use community::{
    Course, CourseDraft, CoursePatch, Group, GroupDraft, GroupPatch, Member, MemberDraft,
    MemberPatch, Prayer, PrayerDraft, PrayerPatch, PrayerStatus, Volunteer, VolunteerDraft,
    VolunteerPatch,
};
pub use worship::{
    Event, EventDraft, EventPatch, Notice, NoticeDraft, NoticePatch, Sermon, SermonDraft,
    SermonPatch, parse_tags,
};

/// Primary key of a row. Tables created with `bigint` keys produce numbers,
/// `uuid` keys produce text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl Default for RecordId {
    fn default() -> Self {
        RecordId::Int(0)
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordId::Int(id) => write!(f, "{id}"),
            RecordId::Text(id) => write!(f, "{id}"),
        }
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId::Int(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId::Text(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        RecordId::Text(id)
    }
}

/// Ordering requested from the backend on initial load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub field: &'static str,
    pub direction: SortDirection,
}

impl Order {
    pub const fn asc(field: &'static str) -> Self {
        Self {
            field,
            direction: SortDirection::Ascending,
        }
    }

    pub const fn desc(field: &'static str) -> Self {
        Self {
            field,
            direction: SortDirection::Descending,
        }
    }
}

/// Where a newly created record lands in its local list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertPosition {
    /// Newest-first lists.
    Front,
    /// Oldest-first or unordered lists.
    #[default]
    Back,
}

impl InsertPosition {
    pub fn from_prepend(prepend: bool) -> Self {
        if prepend {
            InsertPosition::Front
        } else {
            InsertPosition::Back
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Events,
    Sermons,
    Notices,
    Groups,
    Prayers,
    Members,
    Volunteers,
    Courses,
    Settings,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Events => "events",
            Table::Sermons => "sermons",
            Table::Notices => "notices",
            Table::Groups => "groups",
            Table::Prayers => "prayers",
            Table::Members => "members",
            Table::Volunteers => "volunteers",
            Table::Courses => "courses",
            Table::Settings => "settings",
        }
    }

    pub fn initial_order(self) -> Option<Order> {
        match self {
            Table::Events => Some(Order::asc("date")),
            Table::Sermons => Some(Order::desc("date")),
            Table::Groups => Some(Order::asc("created_at")),
            Table::Notices
            | Table::Prayers
            | Table::Members
            | Table::Volunteers
            | Table::Courses => Some(Order::desc("created_at")),
            Table::Settings => None,
        }
    }

    pub fn insert_position(self) -> InsertPosition {
        match self {
            Table::Events | Table::Groups | Table::Settings => InsertPosition::Back,
            _ => InsertPosition::Front,
        }
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A row of one of the list tables.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const TABLE: Table;

    /// Insert payload. The backend fills in `id` and `created_at`.
    type Draft: Serialize + Send + Sync;

    /// Partial update; unset fields are not sent.
    type Patch: Serialize + Send + Sync;

    fn id(&self) -> &RecordId;

    fn validate_draft(_draft: &Self::Draft) -> Result<()> {
        Ok(())
    }
}

pub(crate) fn require_text(table: Table, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        client_bail!("{table}: `{field}` is required");
    }
    Ok(())
}

/// Decodes `null` text columns as empty strings.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Any list-table row, tagged by table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "table", content = "row", rename_all = "snake_case")]
pub enum AnyRecord {
    Event(Event),
    Sermon(Sermon),
    Notice(Notice),
    Group(Group),
    Prayer(Prayer),
    Member(Member),
    Volunteer(Volunteer),
    Course(Course),
}

impl AnyRecord {
    pub fn from_row(table: Table, row: Row) -> Result<Self> {
        let record = match table {
            Table::Events => AnyRecord::Event(serde_json::from_value(row)?),
            Table::Sermons => AnyRecord::Sermon(serde_json::from_value(row)?),
            Table::Notices => AnyRecord::Notice(serde_json::from_value(row)?),
            Table::Groups => AnyRecord::Group(serde_json::from_value(row)?),
            Table::Prayers => AnyRecord::Prayer(serde_json::from_value(row)?),
            Table::Members => AnyRecord::Member(serde_json::from_value(row)?),
            Table::Volunteers => AnyRecord::Volunteer(serde_json::from_value(row)?),
            Table::Courses => AnyRecord::Course(serde_json::from_value(row)?),
            Table::Settings => client_bail!("`settings` is not a list table"),
        };
        Ok(record)
    }

    pub fn table(&self) -> Table {
        match self {
            AnyRecord::Event(_) => Event::TABLE,
            AnyRecord::Sermon(_) => Sermon::TABLE,
            AnyRecord::Notice(_) => Notice::TABLE,
            AnyRecord::Group(_) => Group::TABLE,
            AnyRecord::Prayer(_) => Prayer::TABLE,
            AnyRecord::Member(_) => Member::TABLE,
            AnyRecord::Volunteer(_) => Volunteer::TABLE,
            AnyRecord::Course(_) => Course::TABLE,
        }
    }

    pub fn id(&self) -> &RecordId {
        match self {
            AnyRecord::Event(r) => r.id(),
            AnyRecord::Sermon(r) => r.id(),
            AnyRecord::Notice(r) => r.id(),
            AnyRecord::Group(r) => r.id(),
            AnyRecord::Prayer(r) => r.id(),
            AnyRecord::Member(r) => r.id(),
            AnyRecord::Volunteer(r) => r.id(),
            AnyRecord::Course(r) => r.id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_id_accepts_numbers_and_text() {
        let int: RecordId = serde_json::from_value(json!(42)).unwrap();
        let text: RecordId =
            serde_json::from_value(json!("1b0e6a52-6a43-4b0a-9d8e-5a1f3c2d7e90")).unwrap();
        assert_eq!(int, RecordId::Int(42));
        assert!(matches!(text, RecordId::Text(_)));
        assert_eq!(int.to_string(), "42");
        assert_eq!(serde_json::to_value(&int).unwrap(), json!(42));
    }

    #[test]
    fn table_layout_matches_list_orderings() {
        assert_eq!(Table::Events.initial_order(), Some(Order::asc("date")));
        assert_eq!(Table::Sermons.initial_order(), Some(Order::desc("date")));
        assert_eq!(Table::Groups.initial_order(), Some(Order::asc("created_at")));
        assert_eq!(Table::Prayers.initial_order(), Some(Order::desc("created_at")));
        assert_eq!(Table::Settings.initial_order(), None);

        assert_eq!(Table::Events.insert_position(), InsertPosition::Back);
        assert_eq!(Table::Groups.insert_position(), InsertPosition::Back);
        for table in [Table::Sermons, Table::Notices, Table::Prayers, Table::Courses] {
            assert_eq!(table.insert_position(), InsertPosition::Front);
        }
        assert_eq!(InsertPosition::default(), InsertPosition::Back);
        assert_eq!(InsertPosition::from_prepend(true), InsertPosition::Front);
    }

    #[test]
    fn any_record_decodes_by_table() {
        let row = json!({"id": 3, "title": "Aviso", "body": null, "created_at": "2024-01-01T00:00:00Z"});
        let record = AnyRecord::from_row(Table::Notices, row).unwrap();
        assert_eq!(record.table(), Table::Notices);
        assert_eq!(record.id(), &RecordId::Int(3));
        let AnyRecord::Notice(notice) = record else {
            panic!("expected a notice");
        };
        assert_eq!(notice.body, "");

        assert!(AnyRecord::from_row(Table::Settings, json!({"id": 1})).is_err());
        assert!(AnyRecord::from_row(Table::Events, json!({"title": "no id"})).is_err());
    }
}
