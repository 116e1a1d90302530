//! Match-by-match overview of the analysed team

use std::collections::HashSet;

use crate::table::{DataTable, Value};

/// One row per match: opponent, date, venue, formation and substitutions
///
/// Reads the event-level table, so rows are collapsed to the first row of each
/// `matchId` before projecting.
pub fn stats_detailed(events: &DataTable) -> DataTable {
    let matches = if events.has_column("matchId") {
        let mut seen = HashSet::new();
        events.filter(|t, i| seen.insert(t.get(i, "matchId").as_label()))
    } else {
        events.clone()
    };

    let opponents: Vec<Value> = (0..matches.len())
        .map(|i| {
            let away = matches.get(i, "away_name");
            if !away.is_null() && away.as_label() == matches.get(i, "teamName").as_label() {
                matches.get(i, "home_name").clone()
            } else {
                away.clone()
            }
        })
        .collect();

    let mut out = matches.select_as(&[
        ("Against", None),
        ("Date", Some("localDate")),
        ("Field", Some("field")),
        ("Formation", Some("team_formation_desc")),
        ("Substitutions", Some("changes_num")),
    ]);
    for (row, opponent) in out.rows.iter_mut().zip(opponents) {
        row[0] = opponent;
    }
    out.sort_by_column("Date", false);
    out
}
