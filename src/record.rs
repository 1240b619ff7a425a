use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use uuid::Uuid;

/// Known keys in the order records are written.
const FIELD_KEYS: [&str; 18] = [
    "id",
    "customerName",
    "location",
    "contact",
    "date",
    "machines",
    "product",
    "tooling",
    "bladeChangeInterval",
    "grindInterval",
    "issues",
    "slitterTooling",
    "cutoffTooling",
    "perfTooling",
    "grindingSystems",
    "goal",
    "nextStep",
    "updatedAt",
];

/// One field-visit report. Serialized with the camelCase keys used by
/// backup files, so exported JSON and stored JSON are the same document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct VisitRecord {
    pub id: String,
    pub customer_name: String,
    pub location: String,
    pub contact: String,
    pub date: String,
    pub machines: String,
    pub product: String,
    pub tooling: String,
    pub blade_change_interval: String,
    pub grind_interval: String,
    pub issues: String,
    pub slitter_tooling: String,
    pub cutoff_tooling: String,
    pub perf_tooling: String,
    pub grinding_systems: String,
    pub goal: String,
    pub next_step: String,
    pub updated_at: String,
    /// Values written back verbatim: keys this version does not know about,
    /// and known keys whose value was not a string. The typed field then
    /// holds display text only.
    pub extra: BTreeMap<String, Value>,
}

/// Field edits gathered from the command line. `None` leaves the field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitPatch {
    pub customer_name: Option<String>,
    pub location: Option<String>,
    pub contact: Option<String>,
    pub date: Option<String>,
    pub machines: Option<String>,
    pub product: Option<String>,
    pub tooling: Option<String>,
    pub blade_change_interval: Option<String>,
    pub grind_interval: Option<String>,
    pub issues: Option<String>,
    pub slitter_tooling: Option<String>,
    pub cutoff_tooling: Option<String>,
    pub perf_tooling: Option<String>,
    pub grinding_systems: Option<String>,
    pub goal: Option<String>,
    pub next_step: Option<String>,
}

impl VisitPatch {
    pub fn has_changes(&self) -> bool {
        !self.edits().is_empty()
    }

    /// The fields this patch sets, keyed by their JSON name.
    fn edits(&self) -> Vec<(&'static str, &str)> {
        [
            ("customerName", &self.customer_name),
            ("location", &self.location),
            ("contact", &self.contact),
            ("date", &self.date),
            ("machines", &self.machines),
            ("product", &self.product),
            ("tooling", &self.tooling),
            ("bladeChangeInterval", &self.blade_change_interval),
            ("grindInterval", &self.grind_interval),
            ("issues", &self.issues),
            ("slitterTooling", &self.slitter_tooling),
            ("cutoffTooling", &self.cutoff_tooling),
            ("perfTooling", &self.perf_tooling),
            ("grindingSystems", &self.grinding_systems),
            ("goal", &self.goal),
            ("nextStep", &self.next_step),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|value| (key, value)))
        .collect()
    }
}

impl VisitRecord {
    /// Empty record with a fresh id and today's date, as the "new" action shows it.
    pub fn blank() -> Self {
        Self {
            id: new_record_id(),
            date: today_local_date(),
            ..Self::default()
        }
    }

    /// Overlays the patch, trimming every free-text value. `date` is kept as entered.
    pub fn apply(&mut self, patch: &VisitPatch) {
        let edits = patch.edits();
        let mut changed = Vec::new();
        for (key, slot) in self.text_fields_mut() {
            let Some((_, value)) = edits.iter().find(|(edit, _)| *edit == key) else {
                continue;
            };
            *slot = if key == "date" {
                value.to_string()
            } else {
                value.trim().to_string()
            };
            changed.push(key);
        }
        for key in changed {
            self.extra.remove(key);
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = now_utc_rfc3339();
        self.extra.remove("updatedAt");
    }

    pub fn display_name(&self) -> &str {
        if self.customer_name.is_empty() {
            "Unnamed"
        } else {
            &self.customer_name
        }
    }

    /// Text the list search runs against.
    pub fn search_haystack(&self) -> String {
        format!("{} {}", self.customer_name, self.location).to_lowercase()
    }

    /// Builds a record from one element of an imported array. Only objects with
    /// a truthy id qualify; their values are kept as-is.
    pub fn from_backup_value(value: Value) -> Option<Self> {
        let Value::Object(object) = value else {
            return None;
        };
        if !object.get("id").is_some_and(is_truthy) {
            return None;
        }
        Some(Self::from(object))
    }

    fn text_fields(&self) -> [(&'static str, &String); 18] {
        [
            ("id", &self.id),
            ("customerName", &self.customer_name),
            ("location", &self.location),
            ("contact", &self.contact),
            ("date", &self.date),
            ("machines", &self.machines),
            ("product", &self.product),
            ("tooling", &self.tooling),
            ("bladeChangeInterval", &self.blade_change_interval),
            ("grindInterval", &self.grind_interval),
            ("issues", &self.issues),
            ("slitterTooling", &self.slitter_tooling),
            ("cutoffTooling", &self.cutoff_tooling),
            ("perfTooling", &self.perf_tooling),
            ("grindingSystems", &self.grinding_systems),
            ("goal", &self.goal),
            ("nextStep", &self.next_step),
            ("updatedAt", &self.updated_at),
        ]
    }

    fn text_fields_mut(&mut self) -> [(&'static str, &mut String); 18] {
        [
            ("id", &mut self.id),
            ("customerName", &mut self.customer_name),
            ("location", &mut self.location),
            ("contact", &mut self.contact),
            ("date", &mut self.date),
            ("machines", &mut self.machines),
            ("product", &mut self.product),
            ("tooling", &mut self.tooling),
            ("bladeChangeInterval", &mut self.blade_change_interval),
            ("grindInterval", &mut self.grind_interval),
            ("issues", &mut self.issues),
            ("slitterTooling", &mut self.slitter_tooling),
            ("cutoffTooling", &mut self.cutoff_tooling),
            ("perfTooling", &mut self.perf_tooling),
            ("grindingSystems", &mut self.grinding_systems),
            ("goal", &mut self.goal),
            ("nextStep", &mut self.next_step),
            ("updatedAt", &mut self.updated_at),
        ]
    }
}

impl From<Map<String, Value>> for VisitRecord {
    fn from(mut object: Map<String, Value>) -> Self {
        let mut record = Self::default();
        let mut verbatim = BTreeMap::new();
        for (key, slot) in record.text_fields_mut() {
            match object.remove(key) {
                Some(Value::String(text)) => *slot = text,
                Some(other) => {
                    *slot = display_text(&other);
                    verbatim.insert(key.to_string(), other);
                }
                None => {}
            }
        }
        verbatim.extend(object);
        record.extra = verbatim;
        record
    }
}

/// Known fields first in fixed order, then unknown keys in sorted order.
impl Serialize for VisitRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let unknown = self
            .extra
            .iter()
            .filter(|(key, _)| !FIELD_KEYS.contains(&key.as_str()));
        let len = FIELD_KEYS.len() + unknown.clone().count();
        let mut map = serializer.serialize_map(Some(len))?;
        for (key, text) in self.text_fields() {
            match self.extra.get(key) {
                Some(raw) => map.serialize_entry(key, raw)?,
                None => map.serialize_entry(key, text)?,
            }
        }
        for (key, value) in unknown {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

pub fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}

/// UTC timestamp with fixed millisecond width, so string order is time order.
pub fn now_utc_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
        ))
        .expect("timestamp formatting for UTC should never fail")
}

pub fn today_local_date() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(format_description!("[year]-[month]-[day]"))
        .expect("date formatting should never fail")
}

/// A stored UTC timestamp shown in local time. Text that does not parse is
/// returned as-is.
pub fn local_display_time(stamp: &str) -> String {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    display_time_at(stamp, offset)
}

fn display_time_at(stamp: &str, offset: UtcOffset) -> String {
    OffsetDateTime::parse(stamp, &Rfc3339)
        .ok()
        .and_then(|at| {
            at.to_offset(offset)
                .format(format_description!(
                    "[year]-[month]-[day] [hour]:[minute]:[second]"
                ))
                .ok()
        })
        .unwrap_or_else(|| stamp.to_string())
}

fn display_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Whether an imported id counts as present: empty, zero, false and null do not.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map_or(true, |n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
