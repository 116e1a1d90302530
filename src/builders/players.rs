//! Player-level tables: set-piece takers, aerial contacts and the squad overview

use super::Side;
use crate::table::{DataTable, Value};

const CONTACTS_LIMIT: usize = 9;

const TAKER_ORDER: [&str; 7] = [
    "Player Name",
    "All Events",
    "Lost Out",
    "Lost in Play",
    "Success - Contact",
    "Success - Shot",
    "xG",
];

const CONTACT_ORDER: [&str; 18] = [
    "Player Name",
    "Contacts",
    "Contacts - Header",
    "Contacts (Lost in Play)",
    "Contacts (Lost Out)",
    "Contacts (Success)",
    "Shot",
    "Shot - Header",
    "Shot (Blocked)",
    "Shot - Header (Blocked)",
    "Shot (Miss)",
    "Shot - Header (Miss)",
    "Shot (Stopped)",
    "Shot - Header (Stopped)",
    "xG",
    "xG - Header",
    "Goal",
    "Goal - Header",
];

fn positive(table: &DataTable, row: usize, column: &str) -> bool {
    table.get(row, column).as_f64().is_some_and(|v| v > 0.0)
}

/// Project `order` out of `players`, where `source` names each label's column
fn project(players: &DataTable, order: &[&str], source: impl Fn(&str) -> Option<String>) -> DataTable {
    let sources: Vec<Option<String>> = order.iter().map(|label| source(label)).collect();
    let mapping: Vec<(&str, Option<&str>)> = order
        .iter()
        .zip(&sources)
        .map(|(label, src)| (*label, src.as_deref()))
        .collect();
    players.select_as(&mapping)
}

/// Takers: players with at least one delivery, most deliveries first
fn takers(players: &DataTable, source: impl Fn(&str) -> Option<String>) -> DataTable {
    let out = project(players, &TAKER_ORDER, source);
    let mut out = out.filter(|t, i| positive(t, i, "All Events"));
    out.sort_by_column("All Events", true);
    out
}

pub fn corner_takers(players: &DataTable, side: Side) -> DataTable {
    let t = side.as_str();
    takers(players, |label| {
        let column = match label {
            "Player Name" => "playerName".to_string(),
            "All Events" => format!("actions_{t}_fromcorner"),
            "Success - Contact" => format!("actions_{t}_succ_fromcorner"),
            "Lost Out" => format!("actions_{t}_lostout_fromcorner"),
            "Lost in Play" => format!("actions_{t}_lostinplay_fromcorner"),
            "Success - Shot" => format!("shots_created_{t}_fromcorner"),
            "xG" => format!("xg_created_{t}_fromcorner"),
            _ => return None,
        };
        Some(column)
    })
}

pub fn indirect_free_kick_takers(players: &DataTable) -> DataTable {
    takers(players, |label| {
        let column = match label {
            "Player Name" => "playerName",
            "All Events" => "actions_fromifkbox",
            "Success - Contact" => "actions_succ_fromifkbox",
            "Lost Out" => "actions_lostout_fromifkbox",
            "Lost in Play" => "actions_lostinplay_fromifkbox",
            "Success - Shot" => "shots_created_fromifkbox",
            "xG" => "xg_created_fromifkbox",
            _ => return None,
        };
        Some(column.to_string())
    })
}

pub fn throw_in_takers(players: &DataTable, side: Side) -> DataTable {
    let t = side.as_str();
    takers(players, |label| {
        let column = match label {
            "Player Name" => "playerName".to_string(),
            "All Events" => format!("actions_{t}_fromthrowinbox"),
            "Success - Contact" => format!("actions_{t}_succ_fromthrowinbox"),
            "Lost Out" => format!("actions_{t}_lostout_fromthrowinbox"),
            "Lost in Play" => format!("actions_{t}_lostinplay_fromthrowinbox"),
            "Success - Shot" => format!("shots_created_{t}_fromthrowinbox"),
            "xG" => format!("xg_created_{t}_fromthrowinbox"),
            _ => return None,
        };
        Some(column)
    })
}

/// Source columns of a contact table
///
/// `contacts` suffixes the contact columns, `shots` the shot, goal and xG
/// columns; `xg_header` is separate because one variant reads it elsewhere.
struct ContactSources {
    contacts: &'static str,
    shots: &'static str,
    xg_header: &'static str,
}

impl ContactSources {
    fn column(&self, label: &str) -> Option<String> {
        let (c, s) = (self.contacts, self.shots);
        let column = match label {
            "Player Name" => "playerName".to_string(),
            "Contacts" => format!("actions_contacts_{c}"),
            "Contacts - Header" => format!("actions_contacts_header_{c}"),
            "Contacts (Lost in Play)" => format!("actions_contacts_lostinplay_{c}"),
            "Contacts (Lost Out)" => format!("actions_contacts_lostout_{c}"),
            "Contacts (Success)" => format!("actions_contacts_succ_{c}"),
            "Shot" => format!("shots_{s}"),
            "Shot - Header" => format!("shots_header_{s}"),
            "Shot (Miss)" => format!("shots_miss_{s}"),
            "Shot - Header (Miss)" => format!("shots_header_miss_{s}"),
            "Shot (Blocked)" => format!("shots_blocked_{s}"),
            "Shot - Header (Blocked)" => format!("shots_header_blocked_{s}"),
            "Shot (Stopped)" => format!("shots_stopped_{s}"),
            "Shot - Header (Stopped)" => format!("shots_header_stopped_{s}"),
            "Goal" => format!("goals_{s}"),
            "Goal - Header" => format!("goals_header_{s}"),
            "xG" => format!("xg_{s}"),
            "xG - Header" => self.xg_header.to_string(),
            _ => return None,
        };
        Some(column)
    }
}

/// Contacts: players who shot at least once (or, when `count_contacts`, who
/// also only touched the ball), most shots first, capped
fn contacts(players: &DataTable, sources: ContactSources, count_contacts: bool) -> DataTable {
    let out = project(players, &CONTACT_ORDER, |label| sources.column(label));
    let mut out = out.filter(|t, i| {
        positive(t, i, "Shot") || (count_contacts && positive(t, i, "Contacts"))
    });
    out.sort_by_column("Shot", true);
    out.truncate(CONTACTS_LIMIT);
    out
}

pub fn corner_contacts(players: &DataTable) -> DataTable {
    contacts(
        players,
        ContactSources {
            contacts: "fromcorner",
            shots: "fromcorner",
            xg_header: "xg_header_fromcorner",
        },
        false,
    )
}

pub fn indirect_free_kick_contacts(players: &DataTable) -> DataTable {
    contacts(
        players,
        ContactSources {
            contacts: "fromifkbox",
            shots: "fromifk",
            xg_header: "xg_header_fromifkbox",
        },
        false,
    )
}

pub fn throw_in_contacts(players: &DataTable) -> DataTable {
    contacts(
        players,
        ContactSources {
            contacts: "fromthrowinbox",
            shots: "fromthrowin",
            xg_header: "xg_header_fromthrowin",
        },
        true,
    )
}

/// Squad overview columns and their roster sources
const OVERVIEW_COLUMNS: [(&str, &str); 21] = [
    ("No", "shirtNo"),
    ("Player", "playerName"),
    ("Pos", "position"),
    ("Age", "age"),
    ("Height", "height"),
    ("Corner Taker", "corner_taker_sn"),
    ("IFK Taker", "ifk_taker_sn"),
    ("Throwin Taker", "throwin_taker_sn"),
    ("DFK Taker", "dfk_taker_sn"),
    ("SP", "passes_sp"),
    ("SP Succ", "passes_succ_sp"),
    ("SP Shots", "shots_sp"),
    ("SP Goals", "goals_sp"),
    ("SP xG", "xg_sp"),
    ("Corners", "actions_fromcorner"),
    ("Corners Succ", "actions_succ_fromcorner"),
    ("IFK Box", "actions_fromifkbox"),
    ("IFK Box Succ", "actions_succ_fromifkbox"),
    ("ThrowIns to Box", "actions_fromthrowinbox"),
    ("ThrowIns to Box Succ", "actions_succ_fromthrowinbox"),
    ("DFK Shots", "shots_fromdfk"),
];

/// Columns shown as whole numbers with zero left blank
const FLAG_COLUMNS: [&str; 5] = ["No", "Corner Taker", "IFK Taker", "Throwin Taker", "DFK Taker"];

/// The rival's squad in positional order
pub fn overview(roster: &DataTable, rival: &str) -> DataTable {
    let mut squad = if roster.has_column("teamName") {
        roster.filter(|t, i| t.get(i, "teamName").as_label() == rival)
    } else {
        roster.clone()
    };
    squad.sort_by_column("orden", false);

    let mapping: Vec<(&str, Option<&str>)> = OVERVIEW_COLUMNS
        .iter()
        .map(|(label, source)| (*label, Some(*source)))
        .collect();
    let mut out = squad.select_as(&mapping);

    let positions: Vec<Value> = (0..squad.len())
        .map(|i| {
            let primary = squad.get(i, "position");
            let secondary = squad.get(i, "position2");
            if secondary.is_null() {
                Value::text(primary.as_label())
            } else {
                Value::text(format!("{}/{}", primary.as_label(), secondary.as_label()))
            }
        })
        .collect();
    if let Some(pos) = out.column_index("Pos") {
        for (row, value) in out.rows.iter_mut().zip(positions) {
            row[pos] = value;
        }
    }

    for (label, _) in OVERVIEW_COLUMNS {
        match label {
            "Player" => out.map_column(label, |v| Value::text(v.as_label())),
            "Pos" => {}
            "SP xG" => out.map_column(label, |v| Value::Number(v.as_f64().unwrap_or(0.0)).rounded(2)),
            flag if FLAG_COLUMNS.contains(&flag) => out.map_column(label, |v| {
                let n = v.as_f64().unwrap_or(0.0).round();
                if n == 0.0 {
                    Value::Null
                } else {
                    Value::Number(n)
                }
            }),
            _ => out.map_column(label, |v| Value::Number(v.as_f64().unwrap_or(0.0).round())),
        }
    }
    out
}
