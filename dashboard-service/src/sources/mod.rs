pub mod energy_csv_file;

pub use energy_csv_file::{required_columns, EnergyCsvFileSource};

#[cfg(test)]
pub(crate) mod test_support {
    use std::{collections::HashMap, io::Write};

    use tempfile::NamedTempFile;

    pub(crate) fn row<'a>(cells: &[(&'a str, &'a str)]) -> HashMap<&'a str, &'a str> {
        cells.iter().copied().collect()
    }

    /// Write a CSV with the given header; cells not named in a row are blank.
    pub(crate) fn csv_file(columns: &[&str], rows: &[HashMap<&str, &str>]) -> NamedTempFile {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(columns).unwrap();
        for r in rows {
            wtr.write_record(columns.iter().map(|c| r.get(c).copied().unwrap_or("")))
                .unwrap();
        }
        let bytes = wtr.into_inner().unwrap();

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();
        file.flush().unwrap();
        file
    }
}
