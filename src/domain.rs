//! Closed vocabularies stored as `VARCHAR` columns.
//!
//! Rows keep these as plain strings; handlers parse incoming values through
//! the enums below so that only known values ever reach the database.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(ParseEnumError {
                        kind: $kind,
                        value: value.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum! {
    Role, "role" {
        Student => "student",
        Counselor => "counselor",
        Admin => "admin",
    }
}

string_enum! {
    UserStatus, "user status" {
        Active => "active",
        Pending => "pending",
        Suspended => "suspended",
        Inactive => "inactive",
    }
}

string_enum! {
    Priority, "priority" {
        Low => "low",
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
}

string_enum! {
    ReportStatus, "report status" {
        New => "new",
        InProgress => "in_progress",
        Resolved => "resolved",
        Closed => "closed",
    }
}

string_enum! {
    ResourceType, "resource type" {
        Article => "article",
        Video => "video",
        Audio => "audio",
        Resource => "resource",
    }
}

string_enum! {
    ResourceStatus, "resource status" {
        Published => "published",
        Draft => "draft",
        Archived => "archived",
    }
}

string_enum! {
    MoodLevel, "mood level" {
        VeryLow => "very_low",
        Low => "low",
        Neutral => "neutral",
        Good => "good",
        VeryGood => "very_good",
    }
}

impl Role {
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Counselor | Role::Admin)
    }
}

impl Priority {
    /// Higher rank means more urgent.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Low => 0,
            Priority::Medium => 1,
            Priority::High => 2,
            Priority::Urgent => 3,
        }
    }

    /// Rank for a stored priority string; unknown values sort last.
    pub fn rank_of(value: &str) -> u8 {
        value.parse::<Priority>().map(Priority::rank).unwrap_or(0)
    }
}

impl ReportStatus {
    pub fn is_open(self) -> bool {
        matches!(self, ReportStatus::New | ReportStatus::InProgress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Urgent".parse::<Priority>(), Ok(Priority::Urgent));
        assert_eq!(" in_progress ".parse::<ReportStatus>(), Ok(ReportStatus::InProgress));
        assert_eq!("VERY_GOOD".parse::<MoodLevel>(), Ok(MoodLevel::VeryGood));
    }

    #[test]
    fn rejects_unknown_values() {
        let err = "critical".parse::<Priority>().unwrap_err();
        assert_eq!(err.kind, "priority");
        assert_eq!(err.to_string(), "invalid priority: critical");
    }

    #[test]
    fn priority_rank_orders_by_urgency() {
        let mut ranked: Vec<Priority> = Priority::ALL.to_vec();
        ranked.sort_by_key(|priority| std::cmp::Reverse(priority.rank()));
        assert_eq!(
            ranked,
            vec![Priority::Urgent, Priority::High, Priority::Medium, Priority::Low]
        );
        assert_eq!(Priority::rank_of("bogus"), 0);
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&ReportStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let level: MoodLevel = serde_json::from_str("\"very_low\"").unwrap();
        assert_eq!(level, MoodLevel::VeryLow);
    }

    #[test]
    fn staff_roles() {
        assert!(Role::Admin.is_staff());
        assert!(Role::Counselor.is_staff());
        assert!(!Role::Student.is_staff());
    }
}
