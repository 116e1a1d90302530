//! Recent fixtures of the analysed opponent, as supplied by the caller

use serde::{Deserialize, Serialize};

use crate::table::{DataTable, Value};

pub const FIXTURE_COLUMNS: [&str; 6] = [
    "Team",
    "Date",
    "Field",
    "Season",
    "Competition",
    "Opposition",
];

const TEAM_NAME_LIMIT: usize = 15;
const OPPOSITION_NAME_LIMIT: usize = 21;

/// One past match of the rival, newest first in the caller's list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixtureRow {
    #[serde(rename = "localDate", alias = "date", default)]
    pub date: String,
    #[serde(rename = "home_name", default)]
    pub home_name: String,
    #[serde(rename = "away_name", default)]
    pub away_name: String,
    #[serde(rename = "home_shortName", default)]
    pub home_short_name: Option<String>,
    #[serde(rename = "away_shortName", default)]
    pub away_short_name: Option<String>,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub competition: Option<String>,
}

impl FixtureRow {
    fn home_short(&self) -> &str {
        non_empty(self.home_short_name.as_deref()).unwrap_or(&self.home_name)
    }

    fn away_short(&self) -> &str {
        non_empty(self.away_short_name.as_deref()).unwrap_or(&self.away_name)
    }

    /// `home`, `away`, or empty when the rival played neither side
    pub fn field_of(&self, rival: &str) -> &'static str {
        if same_team(&self.home_name, rival) {
            "home"
        } else if same_team(&self.away_name, rival) {
            "away"
        } else {
            ""
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

// Full names decide the side; short names are for display only
fn same_team(name: &str, rival: &str) -> bool {
    name.trim().to_lowercase() == rival.trim().to_lowercase()
}

/// Keep a name up to `limit` characters, otherwise fall back to its first word
///
/// ```
/// use matchdoc::builders::fixtures::shorten_name;
///
/// assert_eq!(shorten_name("Charlton Athletic", 21), "Charlton Athletic");
/// assert_eq!(shorten_name("Wolverhampton Wanderers", 15), "Wolverhampton");
/// ```
pub fn shorten_name(name: &str, limit: usize) -> String {
    let name = name.trim();
    if name.chars().count() <= limit {
        return name.to_string();
    }
    match name.split_whitespace().next() {
        Some(first) => first.to_string(),
        None => name.chars().take(limit).collect(),
    }
}

/// The fixtures table: at most `limit` rows taken from the front of `rows`
pub fn fixtures_table(rows: &[FixtureRow], rival: &str, limit: usize) -> DataTable {
    let mut table = DataTable::new(FIXTURE_COLUMNS.iter().map(|c| c.to_string()).collect());
    for row in rows.iter().take(limit) {
        let field = row.field_of(rival);
        let (team, opposition) = match field {
            "home" => (row.home_short(), row.away_short()),
            "away" => (row.away_short(), row.home_short()),
            _ => (rival.trim(), ""),
        };
        table.push_row(vec![
            Value::text(shorten_name(team, TEAM_NAME_LIMIT)),
            Value::text(row.date.trim()),
            Value::text(field),
            optional_text(row.season.as_deref()),
            optional_text(row.competition.as_deref()),
            Value::text(shorten_name(opposition, OPPOSITION_NAME_LIMIT)),
        ]);
    }
    table
}

fn optional_text(value: Option<&str>) -> Value {
    match non_empty(value) {
        Some(v) => Value::text(v.trim()),
        None => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(date: &str, home: &str, away: &str) -> FixtureRow {
        FixtureRow {
            date: date.into(),
            home_name: home.into(),
            away_name: away.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_shorten_name() {
        assert_eq!(shorten_name("  Luton Town ", 15), "Luton Town");
        assert_eq!(shorten_name("Sheffield Wednesday", 15), "Sheffield");
        assert_eq!(shorten_name("Queens Park Rangers Football", 21), "Queens");
    }

    #[test]
    fn test_rows_follow_rival_side() {
        let mut away_game = fixture("2025-08-02", "Sheffield Wednesday", "Charlton Athletic");
        away_game.away_short_name = Some("Charlton".into());
        away_game.home_short_name = Some("Sheff Wed".into());
        away_game.season = Some("2025-2026".into());
        let rows = vec![
            fixture("2025-08-09", "charlton athletic", "Wolverhampton Wanderers"),
            away_game,
            fixture("2025-07-26", "Luton Town", "Stoke City"),
        ];

        let table = fixtures_table(&rows, "Charlton Athletic", 5);
        assert_eq!(table.len(), 3);
        assert_eq!(table.columns, FIXTURE_COLUMNS);

        assert_eq!(table.rows[0][0], Value::text("charlton"));
        assert_eq!(table.rows[0][2], Value::text("home"));
        assert_eq!(table.rows[0][5], Value::text("Wolverhampton"));
        assert_eq!(table.rows[0][3], Value::Null);

        assert_eq!(table.rows[1][0], Value::text("Charlton"));
        assert_eq!(table.rows[1][1], Value::text("2025-08-02"));
        assert_eq!(table.rows[1][2], Value::text("away"));
        assert_eq!(table.rows[1][3], Value::text("2025-2026"));
        assert_eq!(table.rows[1][5], Value::text("Sheff Wed"));

        assert_eq!(table.rows[2][0], Value::text("Charlton"));
        assert_eq!(table.rows[2][2], Value::text(""));
        assert_eq!(table.rows[2][5], Value::text(""));
    }

    #[test]
    fn test_limit_takes_most_recent() {
        let rows: Vec<FixtureRow> = (1..=8)
            .map(|d| fixture(&format!("2025-08-0{}", d), "Alpha", "Beta"))
            .collect();
        let table = fixtures_table(&rows, "Alpha", 3);
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows[2][1], Value::text("2025-08-03"));
    }

    #[test]
    fn test_deserialize_caller_keys() {
        let row: FixtureRow = serde_json::from_str(
            r#"{"localDate": "2025-08-09", "home_name": "Alpha FC", "away_name": "Beta United", "away_shortName": "Beta"}"#,
        )
        .unwrap();
        assert_eq!(row.date, "2025-08-09");
        assert_eq!(row.away_short(), "Beta");
        assert_eq!(row.home_short(), "Alpha FC");
    }
}
