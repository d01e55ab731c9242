use crate::normalize::NormalizeError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = NormalizeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(NormalizeError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(AppointmentStatus {
    Scheduled => "scheduled",
    Completed => "completed",
    Cancelled => "cancelled",
    NoShow => "no_show",
});

impl AppointmentStatus {
    /// Human-readable badge label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Scheduled => "Scheduled",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
            Self::NoShow => "No Show",
        }
    }
}

str_enum!(TaskStatus {
    Pending => "pending",
    Completed => "completed",
});

str_enum!(TaskPriority {
    High => "high",
    Medium => "medium",
    Low => "low",
});
