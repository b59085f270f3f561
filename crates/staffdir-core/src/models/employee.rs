use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An employee record as returned by `GET /employees`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Employee {
    pub id: i64,
    #[serde(flatten)]
    pub details: NewEmployee,
}

/// Employee fields without the server-assigned identifier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct NewEmployee {
    pub name: String,
    pub email: String,
    pub position: String,
    pub department: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub hire_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<f64>,
}

impl NewEmployee {
    /// First required field that is blank, if any.
    ///
    /// The backend rejects records without these, so a request is not
    /// worth sending.
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("name", &self.name),
            ("email", &self.email),
            ("position", &self.position),
            ("department", &self.department),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
    }
}

impl Employee {
    pub fn name(&self) -> &str {
        &self.details.name
    }

    pub fn hire_date_display(&self) -> String {
        self.details
            .hire_date
            .map(|d| d.format("%b %d, %Y").to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}
