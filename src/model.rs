use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    #[default]
    Active,
    Inactive,
}

text_enum!(ListingStatus { Active => "active", Inactive => "inactive" });

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PriorityStatus {
    Active,
    Inactive,
}

text_enum!(PriorityStatus { Active => "active", Inactive => "inactive" });

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PriorityKind {
    Permanent,
    Temporary,
}

text_enum!(PriorityKind { Permanent => "permanent", Temporary => "temporary" });

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Days,
    Months,
    Years,
}

text_enum!(DurationUnit { Days => "days", Months => "months", Years => "years" });

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

text_enum!(SubmissionStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

/// A directory entry for a business.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub company_name: String,
    pub contact_person: String,
    pub email: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub address: String,
    pub category: String,
    pub description: String,
    pub products: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certifications: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gst_number: Option<String>,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied listing fields for create and update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ListingInput {
    pub company_name: String,
    pub contact_person: String,
    pub email: String,
    pub phone: String,
    pub website: Option<String>,
    pub address: String,
    pub category: String,
    pub description: String,
    pub products: Vec<String>,
    pub certifications: Option<String>,
    pub gst_number: Option<String>,
    pub status: Option<ListingStatus>,
}

impl Listing {
    pub fn from_input(id: String, input: ListingInput, now: DateTime<Utc>) -> Self {
        Listing {
            id,
            company_name: input.company_name,
            contact_person: input.contact_person,
            email: input.email,
            phone: input.phone,
            website: input.website,
            address: input.address,
            category: input.category,
            description: input.description,
            products: input.products,
            certifications: input.certifications,
            gst_number: input.gst_number,
            status: input.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Time-bounded placement of a listing within a category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Priority {
    pub id: String,
    pub company_id: String,
    pub company_name: String,
    pub category: String,
    pub position: i64,
    pub priority_type: PriorityKind,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub duration: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_type: Option<DurationUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub status: PriorityStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

impl Priority {
    /// Active and not past its expiry at `now`.
    pub fn is_effectively_active(&self, now: DateTime<Utc>) -> bool {
        self.status == PriorityStatus::Active && self.expires_at.map_or(true, |exp| exp > now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriorityInput {
    pub company_id: String,
    #[serde(default)]
    pub company_name: String,
    pub category: String,
    pub position: i64,
    pub priority_type: PriorityKind,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub duration_type: Option<DurationUnit>,
    #[serde(default)]
    pub status: Option<PriorityStatus>,
}

/// Dynamic submission and settings value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FormValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<FormValue>),
    Map(BTreeMap<String, FormValue>),
}

pub type FormData = BTreeMap<String, FormValue>;

/// String value stored under `key`, or empty when absent or not a string.
pub fn form_string(data: &FormData, key: &str) -> String {
    match data.get(key) {
        Some(FormValue::String(s)) => s.clone(),
        _ => String::new(),
    }
}

/// A user-submitted form awaiting moderation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    #[serde(rename = "type")]
    pub submission_type: String,
    pub form_data: FormData,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewSubmission {
    #[serde(rename = "type", default)]
    pub submission_type: String,
    #[serde(default)]
    pub form_data: FormData,
    #[serde(default)]
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub display_order: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    /// Active listings in this category, computed at read time.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    pub id: String,
    pub key: String,
    pub value: FormData,
    pub updated_at: DateTime<Utc>,
}

/// History entry for a bulk upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Upload {
    pub id: String,
    pub file_name: String,
    pub file_url: String,
    pub category: String,
    pub uploaded_by: String,
    pub status: String,
    pub records_count: i64,
    pub success_count: i64,
    pub error_count: i64,
    pub errors: Vec<String>,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn form_data_accepts_mixed_values() {
        let data: FormData = serde_json::from_str(
            r#"{"companyName":"Acme","employees":12,"verified":true,"fax":null,
                "tags":["a","b"],"owner":{"name":"Jo"}}"#,
        )
        .unwrap();
        assert_eq!(form_string(&data, "companyName"), "Acme");
        assert_eq!(data.get("employees"), Some(&FormValue::Number(12.0)));
        assert_eq!(data.get("verified"), Some(&FormValue::Bool(true)));
        assert_eq!(data.get("fax"), Some(&FormValue::Null));
        assert!(matches!(data.get("owner"), Some(FormValue::Map(_))));
        assert!(matches!(data.get("tags"), Some(FormValue::List(_))));
    }

    #[test]
    fn form_string_falls_back_to_empty() {
        let data: FormData = serde_json::from_str(r#"{"phone":5551234}"#).unwrap();
        assert_eq!(form_string(&data, "phone"), "");
        assert_eq!(form_string(&data, "missing"), "");
    }

    #[test]
    fn wire_names_are_camel_case() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let p = Priority {
            id: "p".into(),
            company_id: "c".into(),
            company_name: "Acme".into(),
            category: "yarn".into(),
            position: 1,
            priority_type: PriorityKind::Temporary,
            duration: 3,
            duration_type: Some(DurationUnit::Days),
            expires_at: Some(now),
            status: PriorityStatus::Active,
            created_at: now,
            created_by: "admin".into(),
        };
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["priorityType"], "temporary");
        assert_eq!(v["durationType"], "days");
        assert!(v.get("expiresAt").is_some());
        assert_eq!(v["companyName"], "Acme");
    }

    #[test]
    fn status_text_round_trips() {
        assert_eq!(SubmissionStatus::parse("approved"), Some(SubmissionStatus::Approved));
        assert_eq!(SubmissionStatus::parse("APPROVED"), None);
        assert_eq!(ListingStatus::Inactive.as_str(), "inactive");
        assert_eq!(ListingStatus::default(), ListingStatus::Active);
    }
}
