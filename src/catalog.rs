// Pick database table: parsed from the CSV fetched from GitHub, narrowed to
// publishable rows, and used to draft README descriptions.

use crate::error::{Error, Result};
use std::io::{Read, Write};
use std::path::Path;

pub const PLECTRUM: &str = "Plectrum";
pub const LONG_DESCRIPTION: &str = "Long Description";
pub const MATERIALS: &str = "Materials";
pub const PUBLISH: &str = "Publish";
pub const CUSTOM_SENTINEL: &str = "Custom";
pub const DEFAULT_MATERIAL: &str = "resin";

/// Columns that play no part in choosing or describing a design.
pub const DROPPED_COLUMNS: &[&str] = &[
    PUBLISH,
    "Make time (3d printed)",
    "Make time (handmade)",
    "Make time (cast)",
    "Image folder",
];

/// A small in-memory table: ordered headers plus string rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Catalog {
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(bytes)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            // Short rows are padded so they are treated as having empty fields.
            row.resize(headers.len(), String::new());
            rows.push(row);
        }
        Ok(Catalog { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn require_column(&self, name: &str) -> Result<usize> {
        self.column(name).ok_or_else(|| {
            Error::validation("pick database", format!("missing column `{name}`"))
        })
    }

    /// Value of `column` in row `index`, if both exist.
    pub fn get(&self, index: usize, column: &str) -> Option<&str> {
        let col = self.column(column)?;
        self.rows.get(index).map(|row| row[col].as_str())
    }

    /// Keep publishable rows made from `material`, drop the bookkeeping
    /// columns, then drop incomplete rows and the `Custom` placeholder design.
    pub fn filter_publishable(&self, material: &str) -> Result<Catalog> {
        let materials = self.require_column(MATERIALS)?;
        let publish = self.require_column(PUBLISH)?;
        let plectrum = self.require_column(PLECTRUM)?;

        let keep: Vec<usize> = (0..self.headers.len())
            .filter(|i| !DROPPED_COLUMNS.contains(&self.headers[*i].as_str()))
            .collect();

        let headers = keep.iter().map(|i| self.headers[*i].clone()).collect();
        let rows = self
            .rows
            .iter()
            .filter(|row| row[materials].contains(material) && parse_bool(&row[publish]))
            .filter(|row| row[plectrum].trim() != CUSTOM_SENTINEL)
            .map(|row| keep.iter().map(|i| row[*i].clone()).collect::<Vec<_>>())
            .filter(|row| row.iter().all(|field| !field.trim().is_empty()))
            .collect();

        Ok(Catalog { headers, rows })
    }

    /// Draft description for a design file name. Returns `None` when nothing
    /// matches; lookups never fail.
    pub fn description_for(&self, file_name: &str) -> Option<&str> {
        let plectrum = self.column(PLECTRUM)?;
        let description = self.column(LONG_DESCRIPTION)?;
        let key = design_key(file_name);
        self.rows
            .iter()
            .find(|row| row[plectrum].trim().to_lowercase() == key)
            .map(|row| row[description].as_str())
            .filter(|d| !d.trim().is_empty())
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }
}

/// Normalised join key for a design file name: extension stripped, lower case.
pub fn design_key(file_name: &str) -> String {
    let name = file_name.trim();
    let stem = match name.len().checked_sub(4) {
        Some(cut) if name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(".stl") => {
            &name[..cut]
        }
        _ => name,
    };
    stem.to_lowercase()
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DB: &str = "\
Plectrum,Materials,Publish,Long Description,Make time (3d printed),Make time (handmade),Make time (cast),Image folder,Shape
Jazz,resin; brass,True,A small jazz pick.,1h,,2h,img/jazz,Teardrop
Rock,wood,True,A chunky wooden pick.,1h,,,img/rock,Triangle
Custom,resin,True,Anything you like.,,,,,Any
Blues,resin,False,Not yet.,,,,,Round
Ghost,Resin,True,Capital R does not count.,,,,,Round
Hollow,resin,True,,,,,,Round
Swing,clear resin,TRUE,Swings.,,,,,Teardrop
";

    fn filtered() -> Catalog {
        Catalog::from_csv_bytes(DB.as_bytes())
            .unwrap()
            .filter_publishable(DEFAULT_MATERIAL)
            .unwrap()
    }

    #[test]
    fn keeps_only_complete_publishable_resin_rows() {
        let cat = filtered();
        assert_eq!(cat.len(), 2);
        assert_eq!(cat.get(0, PLECTRUM), Some("Jazz"));
        assert_eq!(cat.get(1, PLECTRUM), Some("Swing"));
    }

    #[test]
    fn drops_bookkeeping_columns() {
        let cat = filtered();
        assert_eq!(
            cat.headers(),
            &["Plectrum", "Materials", "Long Description", "Shape"]
        );
    }

    #[test]
    fn filtering_is_deterministic() {
        assert_eq!(filtered(), filtered());
    }

    #[test]
    fn missing_required_column_is_a_validation_error() {
        let cat = Catalog::from_csv_bytes(b"Plectrum,Publish\nJazz,True\n").unwrap();
        let err = cat.filter_publishable("resin").unwrap_err();
        assert!(err.to_string().contains("Materials"));
    }

    #[test]
    fn description_lookup_is_case_insensitive_and_strips_extension() {
        let cat = filtered();
        assert_eq!(cat.description_for("jazz.stl"), Some("A small jazz pick."));
        assert_eq!(cat.description_for("JAZZ.STL"), Some("A small jazz pick."));
        assert_eq!(cat.description_for("Swing"), Some("Swings."));
        assert_eq!(cat.description_for("rock.stl"), None);
        assert_eq!(cat.description_for(""), None);
    }

    #[test]
    fn design_key_only_strips_a_trailing_extension() {
        assert_eq!(design_key("Pick1.stl"), "pick1");
        assert_eq!(design_key("my.stl.design"), "my.stl.design");
        assert_eq!(design_key(".stl"), "");
        assert_eq!(design_key("é.stl"), "é");
    }

    #[test]
    fn cached_table_reloads_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.csv");
        let cat = filtered();
        cat.save(&path).unwrap();
        assert_eq!(Catalog::load(&path).unwrap(), cat);
    }
}
