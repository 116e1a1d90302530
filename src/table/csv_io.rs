use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use super::{DataTable, Value};

/// Read a headered CSV document into a table
pub fn read_csv<R: Read>(reader: R) -> csv::Result<DataTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    let mut table = DataTable::new(columns);
    for record in rdr.records() {
        let record = record?;
        table.push_row(record.iter().map(Value::parse).collect());
    }
    Ok(table)
}

pub fn read_csv_path(path: &Path) -> csv::Result<DataTable> {
    read_csv(File::open(path)?)
}

/// Write a table as CSV; nulls become empty cells
pub fn write_csv<W: Write>(table: &DataTable, writer: W) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(&table.columns)?;
    for row in &table.rows {
        wtr.write_record(row.iter().map(|v| match v {
            Value::Null => String::new(),
            Value::Number(n) => n.to_string(),
            Value::Text(s) => s.clone(),
        }))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_csv_path(table: &DataTable, path: &Path) -> csv::Result<()> {
    write_csv(table, File::create(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_parses_cells() {
        let data = "teamName,games,xg_sp\nWigan,10,1.25\nBolton,,x\n";
        let table = read_csv(data.as_bytes()).unwrap();
        assert_eq!(table.columns, vec!["teamName", "games", "xg_sp"]);
        assert_eq!(table.rows[0][1], Value::Number(10.0));
        assert_eq!(table.rows[1][1], Value::Null);
        assert_eq!(table.rows[1][2], Value::text("x"));
    }

    #[test]
    fn test_write_then_read_preserves_values() {
        let table = DataTable::from_rows(
            vec!["name", "value"],
            vec![vec!["a, b".into(), 0.1.into()], vec![Value::Null, 2.0.into()]],
        );
        let mut buf = Vec::new();
        write_csv(&table, &mut buf).unwrap();
        assert_eq!(read_csv(buf.as_slice()).unwrap(), table);
    }
}
