//! Per-opponent and per-player set-piece summaries
//!
//! Output is transposed: one row per named metric, one column per opponent
//! (defensive) or player (offensive), after a leading label column.

use super::BuildOptions;
use crate::table::{DataTable, Value};

pub const OPPOSITION_LABEL: &str = "Per Opposition";
pub const PLAYER_LABEL: &str = "Per Player";

/// Which rows and entity column a summary reads
struct Scope<'a> {
    entity_column: &'static str,
    label_header: &'static str,
    /// Keep only rows against this opponent
    rival: Option<&'a str>,
    /// Keep only rows where this column is positive
    active_column: Option<&'static str>,
}

impl<'a> Scope<'a> {
    fn new(options: &'a BuildOptions, active_column: &'static str) -> Self {
        if options.defensive {
            Scope {
                entity_column: "teamName",
                label_header: OPPOSITION_LABEL,
                rival: Some(options.rival.as_str()),
                active_column: None,
            }
        } else {
            Scope {
                entity_column: "playerName",
                label_header: PLAYER_LABEL,
                rival: None,
                active_column: Some(active_column),
            }
        }
    }

    fn rows(&self, input: &DataTable) -> DataTable {
        let mut rows = input.filter(|t, i| {
            let against_rival = match self.rival {
                Some(rival) if t.has_column("oppositionTeamName") => {
                    t.get(i, "oppositionTeamName").as_label() == rival
                }
                _ => true,
            };
            let active = match self.active_column {
                Some(col) if t.has_column(col) => {
                    t.get(i, col).as_f64().is_some_and(|v| v > 0.0)
                }
                _ => true,
            };
            against_rival && active
        });
        if self.rival.is_some() {
            rows.sort_by_column("localDate", false);
        }
        rows
    }
}

fn summarize(input: &DataTable, scope: Scope<'_>, metrics: &[(String, String)]) -> DataTable {
    if input.is_empty() {
        return DataTable::new(vec![scope.label_header.to_string()]);
    }
    let rows = scope.rows(input);

    let entity_label = "__entity";
    let mut mapping: Vec<(&str, Option<&str>)> = vec![(entity_label, Some(scope.entity_column))];
    mapping.extend(
        metrics
            .iter()
            .map(|(label, source)| (label.as_str(), Some(source.as_str()))),
    );
    rows.select_as(&mapping)
        .transpose(entity_label, scope.label_header)
}

fn metric(label: &str, source: String) -> (String, String) {
    (label.to_string(), source)
}

/// Corner summary for one side
pub fn corners(input: &DataTable, options: &BuildOptions) -> DataTable {
    let t = options.side.as_str();
    let action = |kind: &str| format!("actions_{t}_{kind}_fromcorner");
    let metrics = vec![
        metric("Actions", format!("actions_{t}_fromcorner")),
        metric("Foot: Right", action("rightfoot")),
        metric("Foot: Left", action("leftfoot")),
        metric("Foot Approach: Natural", action("pfoot")),
        metric("Foot Approach: Opposite", action("ofoot")),
        metric("Kind: Short", action("short")),
        metric("Kind: Long (In)", action("long_in")),
        metric("Kind: Long (Out)", action("long_out")),
        metric("Kind: Long (Straight)", action("long_str")),
        metric("End: P. Penalty", action("ppenalty")),
        metric("End: Smallbox", action("smallbox")),
        metric("End: 1p", action("1p")),
        metric("End: 2p", action("2p")),
        metric("End: Opposite", action("toolong")),
        metric("End: Near", action("near")),
        metric("End: Front Box", action("frontbox")),
        metric("Outcome: Success", action("succ")),
        metric("Inmediate Outcome: Shot", format!("shots_created_{t}_fromcorner")),
        metric("Inmediate Outcome: xG", format!("xg_created_{t}_fromcorner")),
        metric("Outcome: Shot", format!("shots_{t}_fromcorner")),
        metric("Outcome: Goal", format!("goals_{t}_fromcorner")),
        metric("Outcome: xG", format!("xg_{t}_fromcorner")),
    ];
    summarize(input, Scope::new(options, "actions_fromcorner"), &metrics)
}

/// Indirect free-kick summary; these metrics are not split by side
pub fn indirect_free_kicks(input: &DataTable, options: &BuildOptions) -> DataTable {
    let metrics: Vec<(String, String)> = [
        ("Actions", "actions_fromifk"),
        ("End: Box", "actions_fromifkbox"),
        ("End: Other", "actions_other_fromifk"),
        ("Foot: Right", "actions_rightfoot_fromifkbox"),
        ("Foot: Left", "actions_leftfoot_fromifkbox"),
        ("Foot Approach: Natural", "actions_pfoot_fromifkbox"),
        ("Foot Approach: Opposite", "actions_ofoot_fromifkbox"),
        ("From: Right", "actions_right_fromifkbox"),
        ("From: Left", "actions_left_fromifkbox"),
        ("From: Side", "actions_lat_fromifkbox"),
        ("From: Front", "actions_cen_fromifkbox"),
        ("Kind: Short (F3rd)", "actions_short_lastthird_fromifk"),
        ("Kind: Long (In)", "actions_in_fromifkbox"),
        ("Kind: Long (Out)", "actions_out_fromifkbox"),
        ("Kind: Long (Straight)", "actions_str_fromifkbox"),
        ("End: P. Penalty", "actions_ppenalty_fromifkbox"),
        ("End: Smallbox", "actions_smallbox_fromifkbox"),
        ("End: 1p", "actions_1p_fromifkbox"),
        ("End: 2p", "actions_2p_fromifkbox"),
        ("Outcome: Success", "actions_succ_fromifkbox"),
        ("Inmediate Outcome: Shot", "shots_created_fromifkbox"),
        ("Inmediate Outcome: xG", "xg_created_fromifkbox"),
        ("Outcome: Shot", "shots_fromifkbox"),
        ("Outcome: Goal", "goals_fromifkbox"),
        ("Outcome: xG", "xg_fromifkbox"),
    ]
    .iter()
    .map(|(label, source)| metric(label, source.to_string()))
    .collect();
    summarize(input, Scope::new(options, "actions_fromifk"), &metrics)
}

/// Throw-in summary for one side
pub fn throw_ins(input: &DataTable, options: &BuildOptions) -> DataTable {
    let t = options.side.as_str();
    let boxed = |kind: &str| format!("actions_{t}_{kind}_fromthrowinbox");
    let metrics = vec![
        metric("Actions: FinalThird", format!("actions_{t}_fromthrowin")),
        metric("Outcome: Box", format!("actions_{t}_finalthird_fromthrowin")),
        metric("End: P. Penalty", boxed("ppenalty")),
        metric("End: Smallbox", boxed("smallbox")),
        metric("End: 1p", boxed("1p")),
        metric("End: 2p", boxed("2p")),
        metric("Outcome: Success", boxed("succ")),
        metric("Inmediate Outcome: Shot", format!("shots_created_{t}_fromthrowinbox")),
        metric("Inmediate Outcome: xG", format!("xg_created_{t}_fromthrowinbox")),
        metric("Outcome: Shot", format!("shots_{t}_fromthrowin")),
        metric("Outcome: Goal", format!("goals_{t}_fromthrowin")),
        metric("Outcome: xG", format!("xg_{t}_fromthrowin")),
    ];
    summarize(input, Scope::new(options, "actions_fromthrowin"), &metrics)
}

/// Entity names of a summary, in column order
pub fn entities(summary: &DataTable) -> Vec<String> {
    summary.columns.iter().skip(1).cloned().collect()
}

/// Metric value for one entity, null when absent
pub fn value<'a>(summary: &'a DataTable, metric: &str, entity: &str) -> &'a Value {
    static NULL: Value = Value::Null;
    summary
        .rows
        .iter()
        .position(|row| row.first().map(Value::as_label).as_deref() == Some(metric))
        .map(|row| summary.get(row, entity))
        .unwrap_or(&NULL)
}
