//! League-wide set-piece rankings, one row per team

use std::cmp::Ordering;

use crate::table::{compare_values, DataTable, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rounding {
    /// Label or text column, left as is
    Keep,
    Whole,
    TwoDecimals,
}

/// One output column: label, source column, rounding, and whether the
/// defensive variant reads the `opp_` prefixed source
struct RankColumn {
    label: &'static str,
    source: &'static str,
    rounding: Rounding,
    per_side: bool,
}

const fn label(label: &'static str, source: &'static str) -> RankColumn {
    RankColumn {
        label,
        source,
        rounding: Rounding::Keep,
        per_side: false,
    }
}

const fn whole(label: &'static str, source: &'static str) -> RankColumn {
    RankColumn {
        label,
        source,
        rounding: Rounding::Whole,
        per_side: true,
    }
}

const fn ratio(label: &'static str, source: &'static str) -> RankColumn {
    RankColumn {
        label,
        source,
        rounding: Rounding::TwoDecimals,
        per_side: true,
    }
}

const SET_PIECES: &[RankColumn] = &[
    label("Team Name", "teamName"),
    RankColumn {
        per_side: false,
        ..whole("Games", "games")
    },
    whole("SP Goals", "goals_sp"),
    ratio("SP xG", "xg_sp"),
    whole("SP Shots", "shots_sp"),
    ratio("Goals/SP", "goals_sp_pct"),
    ratio("xG/SP", "xg_sp_pct"),
    ratio("Shots/SP", "shots_sp_pct"),
];

const CORNERS: &[RankColumn] = &[
    label("Team Name", "teamName"),
    whole("Corner Goals", "goals_fromcorner"),
    ratio("Corner xG", "xg_fromcorner"),
    whole("Corner Shots", "shots_fromcorner"),
    ratio("Goals/Corner", "goals_fromcorner_pct"),
    ratio("xG/Corner", "xg_fromcorner_pct"),
    ratio("Shots/Corner", "shots_fromcorner_pct"),
];

const DIRECT_FREE_KICKS: &[RankColumn] = &[
    label("Team Name", "teamName"),
    whole("DFK Goals", "goals_fromdfk"),
    ratio("DFK xG", "xg_fromdfk"),
    whole("DFK Shots", "shots_fromdfk"),
    ratio("Goals/DFK", "goals_fromdfk_pct"),
    ratio("xG/DFK", "xg_fromdfk_pct"),
    ratio("Shots/DFK", "shots_dfk_pct"),
];

const INDIRECT_FREE_KICKS: &[RankColumn] = &[
    label("Team Name", "teamName"),
    whole("IFK Goals", "goals_fromifk"),
    ratio("IFK xG", "xg_fromifk"),
    whole("IFK Shots", "shots_fromifk"),
    ratio("Goals/IFK", "goals_fromifk_pct"),
    ratio("xG/IFK", "xg_fromifk_pct"),
    ratio("Shots/IFK", "shots_fromifk_pct"),
];

const THROW_INS: &[RankColumn] = &[
    label("Team Name", "teamName"),
    whole("Throw-in Goals", "goals_fromthrowin"),
    ratio("Throw-in xG", "xg_fromthrowin"),
    whole("Throw-in Shots", "shots_fromthrowin"),
    ratio("Goals/Throw-in", "goals_fromthrowin_pct"),
    ratio("xG/Throw-in", "xg_fromthrowin_pct"),
    ratio("Shots/Throw-in", "shots_fromthrowin_pct"),
];

pub fn set_pieces(team: &DataTable, defensive: bool) -> DataTable {
    ranking(team, SET_PIECES, defensive)
}

pub fn corners(team: &DataTable, defensive: bool) -> DataTable {
    ranking(team, CORNERS, defensive)
}

pub fn direct_free_kicks(team: &DataTable, defensive: bool) -> DataTable {
    ranking(team, DIRECT_FREE_KICKS, defensive)
}

pub fn indirect_free_kicks(team: &DataTable, defensive: bool) -> DataTable {
    ranking(team, INDIRECT_FREE_KICKS, defensive)
}

pub fn throw_ins(team: &DataTable, defensive: bool) -> DataTable {
    ranking(team, THROW_INS, defensive)
}

fn ranking(team: &DataTable, columns: &[RankColumn], defensive: bool) -> DataTable {
    let sources: Vec<String> = columns
        .iter()
        .map(|c| {
            if defensive && c.per_side {
                format!("opp_{}", c.source)
            } else {
                c.source.to_string()
            }
        })
        .collect();
    let mapping: Vec<(&str, Option<&str>)> = columns
        .iter()
        .zip(&sources)
        .map(|(c, source)| (c.label, Some(source.as_str())))
        .collect();

    let mut out = team.select_as(&mapping);
    for column in columns {
        match column.rounding {
            Rounding::Keep => {}
            Rounding::Whole => out.map_column(column.label, |v| v.rounded(0)),
            Rounding::TwoDecimals => out.map_column(column.label, |v| v.rounded(2)),
        }
    }
    sort_by_second_then_rest(&mut out);
    out
}

/// Order rows by every column after the first, left to right
///
/// Columns holding any number sort descending by value, other columns
/// ascending by text; nulls go last and the first column breaks ties.
pub fn sort_by_second_then_rest(table: &mut DataTable) {
    if table.width() <= 1 {
        return;
    }
    let numeric: Vec<bool> = (0..table.width())
        .map(|col| {
            table
                .rows
                .iter()
                .any(|row| row.get(col).and_then(Value::as_f64).is_some())
        })
        .collect();

    table.rows.sort_by(|a, b| {
        for (col, is_numeric) in numeric.iter().enumerate().skip(1) {
            let (x, y) = (cell(a, col), cell(b, col));
            let ordering = if *is_numeric {
                compare_values(&numeric_view(x), &numeric_view(y), true)
            } else {
                x.as_label().cmp(&y.as_label())
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        cell(a, 0).as_label().cmp(&cell(b, 0).as_label())
    });
}

fn cell(row: &[Value], col: usize) -> &Value {
    static NULL: Value = Value::Null;
    row.get(col).unwrap_or(&NULL)
}

fn numeric_view(value: &Value) -> Value {
    value.as_f64().map(Value::Number).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team_aggregate() -> DataTable {
        DataTable::from_rows(
            vec![
                "teamName",
                "games",
                "goals_sp",
                "xg_sp",
                "shots_sp",
                "goals_sp_pct",
                "xg_sp_pct",
                "shots_sp_pct",
                "opp_goals_sp",
                "opp_xg_sp",
            ],
            vec![
                vec![
                    Value::text("Alpha FC"),
                    Value::Number(10.0),
                    Value::Number(7.0),
                    Value::Number(5.123),
                    Value::Number(40.4),
                    Value::Number(0.3),
                    Value::Number(0.25),
                    Value::Number(0.333),
                    Value::Number(2.0),
                    Value::Number(1.5),
                ],
                vec![
                    Value::text("Beta United"),
                    Value::Number(12.0),
                    Value::Number(3.0),
                    Value::Number(2.0),
                    Value::Number(22.0),
                    Value::Number(0.1),
                    Value::Number(0.12),
                    Value::Number(0.2),
                    Value::Number(6.0),
                    Value::Number(4.0),
                ],
                vec![
                    Value::text("Gamma Town"),
                    Value::Number(12.0),
                    Value::Number(3.0),
                    Value::Number(2.5),
                    Value::Null,
                    Value::Null,
                    Value::Null,
                    Value::Null,
                    Value::Null,
                    Value::Null,
                ],
            ],
        )
    }

    #[test]
    fn test_set_pieces_columns_and_rounding() {
        let out = set_pieces(&team_aggregate(), false);
        assert_eq!(
            out.columns,
            vec!["Team Name", "Games", "SP Goals", "SP xG", "SP Shots", "Goals/SP", "xG/SP", "Shots/SP"]
        );
        let alpha = out
            .rows
            .iter()
            .find(|r| r[0] == Value::text("Alpha FC"))
            .unwrap();
        assert_eq!(alpha[3], Value::Number(5.12));
        assert_eq!(alpha[4], Value::Number(40.0));
        assert_eq!(alpha[7], Value::Number(0.33));
    }

    #[test]
    fn test_ranking_sorts_by_second_then_rest() {
        let out = set_pieces(&team_aggregate(), false);
        let order: Vec<String> = out.rows.iter().map(|r| r[0].as_label()).collect();
        // Games desc; Beta and Gamma tie on games and goals, Gamma has more xG
        assert_eq!(order, vec!["Gamma Town", "Beta United", "Alpha FC"]);
    }

    #[test]
    fn test_defensive_reads_opponent_columns() {
        let out = set_pieces(&team_aggregate(), true);
        let beta = out
            .rows
            .iter()
            .find(|r| r[0] == Value::text("Beta United"))
            .unwrap();
        assert_eq!(beta[1], Value::Number(12.0));
        assert_eq!(beta[2], Value::Number(6.0));
        assert_eq!(beta[3], Value::Number(4.0));
        // No opp_shots_sp column in the source
        assert_eq!(beta[4], Value::Null);
    }

    #[test]
    fn test_missing_sources_are_blank() {
        let out = corners(&team_aggregate(), false);
        assert_eq!(out.len(), 3);
        assert!(out.rows.iter().all(|r| r[1..].iter().all(Value::is_null)));
        let order: Vec<String> = out.rows.iter().map(|r| r[0].as_label()).collect();
        assert_eq!(order, vec!["Alpha FC", "Beta United", "Gamma Town"]);
    }
}
