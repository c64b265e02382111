use super::ReflectivityCurve;
use crate::error::{XrrError, XrrResult};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Reads a two-column `angle_deg,intensity` CSV. A header line and `#`
/// comments are allowed; rows that do not parse are skipped.
pub fn read_curve<R: Read>(reader: R, db: bool) -> XrrResult<ReflectivityCurve> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut angles = Vec::new();
    let mut values = Vec::new();
    let mut skipped = 0;

    for (row, result) in rdr.records().enumerate() {
        let rec = result?;
        if rec.len() < 2 {
            skipped += 1;
            continue;
        }
        match (rec[0].parse::<f64>(), rec[1].parse::<f64>()) {
            (Ok(angle), Ok(value)) => {
                angles.push(angle);
                values.push(value);
            }
            _ => {
                if row > 0 {
                    debug!("Skipping row {}: {:?}", row + 1, rec);
                }
                skipped += 1;
            }
        }
    }

    if skipped > 1 {
        warn!("Skipped {} unparsable rows", skipped);
    }
    if let Some(bad) = values.iter().position(|v| !v.is_finite()) {
        return Err(XrrError::Validation(format!(
            "Non-finite intensity at angle {}",
            angles[bad]
        )));
    }

    if db {
        ReflectivityCurve::from_db(angles, &values)
    } else {
        ReflectivityCurve::new(angles, values)
    }
}

pub fn load_curve<P: AsRef<Path>>(path: P, db: bool) -> XrrResult<ReflectivityCurve> {
    let path = path.as_ref();
    debug!("Loading curve from {}", path.display());
    let file = File::open(path)?;
    read_curve(file, db)
}

/// Name of the first column of curve files.
pub const ANGLE_COLUMN: &str = "angle_deg";

/// Writes the `index` column plus one column per `(name, values)` pair.
pub fn write_columns<W: Write>(
    writer: W,
    index: (&str, &[f64]),
    columns: &[(&str, &[f64])],
) -> XrrResult<()> {
    let (index_name, index) = index;
    if let Some((name, _)) = columns.iter().find(|(_, c)| c.len() != index.len()) {
        return Err(XrrError::Validation(format!(
            "Column '{}' does not match the length of '{}'",
            name, index_name
        )));
    }

    let mut wtr = csv::Writer::from_writer(writer);
    let mut header = vec![index_name];
    header.extend(columns.iter().map(|(name, _)| *name));
    wtr.write_record(&header)?;

    for (i, x) in index.iter().enumerate() {
        let mut record = vec![x.to_string()];
        record.extend(columns.iter().map(|(_, c)| c[i].to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_columns<P: AsRef<Path>>(
    path: P,
    index: (&str, &[f64]),
    columns: &[(&str, &[f64])],
) -> XrrResult<()> {
    let file = File::create(path)?;
    write_columns(file, index, columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_and_comments() {
        let text = "angle_deg,intensity\n# comment\n0.1, 1.0\n0.2,0.5\n";
        let curve = read_curve(text.as_bytes(), false).unwrap();
        assert_eq!(curve.angles, vec![0.1, 0.2]);
        assert_eq!(curve.intensity, vec![1.0, 0.5]);
    }

    #[test]
    fn test_db_input() {
        let curve = read_curve("0.1,-10\n".as_bytes(), true).unwrap();
        assert!((curve.intensity[0] - 0.1).abs() < 1e-15);
    }

    #[test]
    fn test_write_then_read() {
        let mut buf = Vec::new();
        write_columns(
            &mut buf,
            (ANGLE_COLUMN, &[0.5, 1.0][..]),
            &[("intensity", &[0.25, 0.125][..])],
        )
        .unwrap();
        let curve = read_curve(buf.as_slice(), false).unwrap();
        assert_eq!(curve.intensity, vec![0.25, 0.125]);
    }
}
