//! Keypoint track table persistence.
//!
//! The delimited-text form carries the three-level header of the source
//! tracking tool verbatim:
//!
//! ```text
//! scorer,model-v1,model-v1,model-v1
//! bodyparts,nose,nose,nose
//! coords,x,y,likelihood
//! 0,320.0,240.0,0.99
//! 1,420.0,240.0,0.42
//! ```
//!
//! Row one names the scorer for every data column, row two the keypoint, row
//! three the field; the leading column is the integer frame index. The
//! structured form is a JSON serialization of [`TrackTable`] itself. Both
//! readers produce the same in-memory model, and the writer mirrors whichever
//! form the output extension selects.

use log::info;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::io::{extension_of, unsupported, IoError};
use crate::track::{KeypointSeries, SeriesColumn, TrackTable};

/// Reads a track table from a `.csv` or `.json` file.
///
/// # Errors
///
/// * [`IoError::UnsupportedFormat`] for any other extension.
/// * [`IoError::MalformedTable`] when headers or rows do not line up, the
///   frame index does not increase strictly, or a cell does not parse.
pub fn read_track_table(path: &Path) -> Result<TrackTable, IoError> {
    let table = match extension_of(path).as_deref() {
        Some("csv") => read_csv(path)?,
        Some("json") => serde_json::from_str(&fs::read_to_string(path)?)?,
        _ => return Err(unsupported(path)),
    };
    info!(
        "read track table from {}: {} keypoints x {} frames",
        path.display(),
        table.keypoints.len(),
        table.n_frames()
    );
    Ok(table)
}

/// Writes a track table to a `.csv` or `.json` file, using the same
/// extension dispatch as [`read_track_table`].
pub fn write_track_table(path: &Path, table: &TrackTable) -> Result<(), IoError> {
    match extension_of(path).as_deref() {
        Some("csv") => write_csv(path, table)?,
        Some("json") => fs::write(path, serde_json::to_string_pretty(table)?)?,
        _ => return Err(unsupported(path)),
    }
    info!("wrote track table to {}", path.display());
    Ok(())
}

fn malformed(message: impl Into<String>) -> IoError {
    IoError::MalformedTable(message.into())
}

fn split_row(line: &str) -> Vec<&str> {
    line.trim_end_matches('\r').split(',').map(str::trim).collect()
}

fn read_csv(path: &Path) -> Result<TrackTable, IoError> {
    let contents = fs::read_to_string(path)?;
    let mut lines = contents.lines();

    let scorer_row = split_row(lines.next().ok_or_else(|| malformed("missing scorer row"))?);
    let bodypart_row =
        split_row(lines.next().ok_or_else(|| malformed("missing bodyparts row"))?);
    let coords_row = split_row(lines.next().ok_or_else(|| malformed("missing coords row"))?);

    let n_columns = scorer_row.len();
    if n_columns < 2 {
        return Err(malformed("header has no data columns"));
    }
    if bodypart_row.len() != n_columns || coords_row.len() != n_columns {
        return Err(malformed(format!(
            "header rows disagree on column count: {} vs {} vs {}",
            n_columns,
            bodypart_row.len(),
            coords_row.len()
        )));
    }

    let scorer = scorer_row[1].to_string();

    // Rebuild the keypoint groups in first-appearance order and remember,
    // per data column, where its values go.
    let mut keypoints: Vec<KeypointSeries> = Vec::new();
    let mut slots: Vec<(usize, usize)> = Vec::with_capacity(n_columns - 1);
    for column in 1..n_columns {
        let name = bodypart_row[column];
        let keypoint_index = match keypoints.iter().position(|k| k.name == name) {
            Some(index) => index,
            None => {
                keypoints.push(KeypointSeries {
                    name: name.to_string(),
                    columns: Vec::new(),
                });
                keypoints.len() - 1
            }
        };
        let series = &mut keypoints[keypoint_index];
        series.columns.push(SeriesColumn {
            label: coords_row[column].to_string(),
            values: Vec::new(),
        });
        slots.push((keypoint_index, series.columns.len() - 1));
    }

    let mut frames: Vec<i64> = Vec::new();
    for (row_number, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let cells = split_row(line);
        if cells.len() != n_columns {
            return Err(malformed(format!(
                "row {} has {} cells, expected {}",
                row_number + 4,
                cells.len(),
                n_columns
            )));
        }

        let frame: i64 = cells[0]
            .parse()
            .map_err(|_| malformed(format!("invalid frame index '{}'", cells[0])))?;
        if let Some(&last) = frames.last() {
            if frame <= last {
                return Err(malformed(format!(
                    "frame index not strictly increasing at {frame}"
                )));
            }
        }
        frames.push(frame);

        for (cell, &(keypoint_index, column_index)) in cells[1..].iter().zip(&slots) {
            let value = if cell.is_empty() {
                f64::NAN
            } else {
                cell.parse()
                    .map_err(|_| malformed(format!("invalid value '{cell}'")))?
            };
            keypoints[keypoint_index].columns[column_index].values.push(value);
        }
    }

    Ok(TrackTable {
        scorer,
        frames,
        keypoints,
    })
}

fn write_csv(path: &Path, table: &TrackTable) -> Result<(), IoError> {
    // Reject ragged tables up front rather than truncating rows mid-file.
    for series in &table.keypoints {
        for column in &series.columns {
            if column.values.len() != table.n_frames() {
                return Err(malformed(format!(
                    "keypoint '{}' column '{}' has {} values for {} frames",
                    series.name,
                    column.label,
                    column.values.len(),
                    table.n_frames()
                )));
            }
        }
    }

    let mut file = File::create(path)?;

    let mut scorer_row = vec!["scorer".to_string()];
    let mut bodypart_row = vec!["bodyparts".to_string()];
    let mut coords_row = vec!["coords".to_string()];
    for series in &table.keypoints {
        for column in &series.columns {
            scorer_row.push(table.scorer.clone());
            bodypart_row.push(series.name.clone());
            coords_row.push(column.label.clone());
        }
    }
    writeln!(file, "{}", scorer_row.join(","))?;
    writeln!(file, "{}", bodypart_row.join(","))?;
    writeln!(file, "{}", coords_row.join(","))?;

    for (row, &frame) in table.frames.iter().enumerate() {
        let mut cells = vec![frame.to_string()];
        for series in &table.keypoints {
            for column in &series.columns {
                let value = column.values[row];
                cells.push(if value.is_nan() {
                    String::new()
                } else {
                    value.to_string()
                });
            }
        }
        writeln!(file, "{}", cells.join(","))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::{COLUMN_LIKELIHOOD, COLUMN_X, COLUMN_Y};

    fn sample_table() -> TrackTable {
        TrackTable {
            scorer: "model-v1".to_string(),
            frames: vec![0, 1, 2],
            keypoints: vec![
                KeypointSeries::from_parts(
                    "nose",
                    vec![320.0, 420.0, 320.0],
                    vec![240.0, 240.0, 340.0],
                    vec![0.99, 0.42, 0.87],
                ),
                KeypointSeries::from_parts(
                    "tail",
                    vec![10.0, 11.5, 13.25],
                    vec![20.0, 21.0, 22.0],
                    vec![0.5, 0.25, 0.125],
                ),
            ],
        }
    }

    #[test]
    fn test_csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracks.csv");

        let table = sample_table();
        write_track_table(&path, &table).unwrap();
        let loaded = read_track_table(&path).unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracks.json");

        let table = sample_table();
        write_track_table(&path, &table).unwrap();
        let loaded = read_track_table(&path).unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_read_handwritten_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracks.csv");
        fs::write(
            &path,
            "scorer,net,net,net\n\
             bodyparts,nose,nose,nose\n\
             coords,x,y,likelihood\n\
             0,320.0,240.0,0.99\n\
             5,420.0,240.0,0.42\n",
        )
        .unwrap();

        let table = read_track_table(&path).unwrap();
        assert_eq!(table.scorer, "net");
        assert_eq!(table.frames, vec![0, 5]);
        assert_eq!(table.keypoint_names(), vec!["nose"]);
        let nose = &table.keypoints[0];
        assert_eq!(nose.column(COLUMN_X), Some([320.0, 420.0].as_slice()));
        assert_eq!(nose.column(COLUMN_Y), Some([240.0, 240.0].as_slice()));
        assert_eq!(nose.column(COLUMN_LIKELIHOOD), Some([0.99, 0.42].as_slice()));
    }

    /// Empty cells are read back as NaN and written back out as empty.
    #[test]
    fn test_empty_cells_round_trip_as_nan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracks.csv");
        fs::write(
            &path,
            "scorer,net,net,net\n\
             bodyparts,paw,paw,paw\n\
             coords,x,y,likelihood\n\
             0,,240.0,0.0\n",
        )
        .unwrap();

        let table = read_track_table(&path).unwrap();
        assert!(table.keypoints[0].column(COLUMN_X).unwrap()[0].is_nan());

        let out = dir.path().join("out.csv");
        write_track_table(&out, &table).unwrap();
        let written = fs::read_to_string(&out).unwrap();
        assert!(written.lines().nth(3).unwrap().starts_with("0,,240,0"));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracks.h5");
        fs::write(&path, b"\x89HDF").unwrap();

        assert!(matches!(
            read_track_table(&path),
            Err(IoError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            write_track_table(&path, &sample_table()),
            Err(IoError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_non_increasing_frames_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracks.csv");
        fs::write(
            &path,
            "scorer,net,net,net\n\
             bodyparts,nose,nose,nose\n\
             coords,x,y,likelihood\n\
             1,1.0,2.0,0.9\n\
             1,3.0,4.0,0.9\n",
        )
        .unwrap();

        assert!(matches!(
            read_track_table(&path),
            Err(IoError::MalformedTable(_))
        ));
    }

    #[test]
    fn test_ragged_row_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracks.csv");
        fs::write(
            &path,
            "scorer,net,net,net\n\
             bodyparts,nose,nose,nose\n\
             coords,x,y,likelihood\n\
             0,1.0,2.0\n",
        )
        .unwrap();

        assert!(matches!(
            read_track_table(&path),
            Err(IoError::MalformedTable(_))
        ));
    }

    /// A keypoint whose header group omits a field still parses; the gap is
    /// the undistorter's problem, not the reader's.
    #[test]
    fn test_missing_field_column_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracks.csv");
        fs::write(
            &path,
            "scorer,net,net\n\
             bodyparts,paw,paw\n\
             coords,x,y\n\
             0,1.0,2.0\n",
        )
        .unwrap();

        let table = read_track_table(&path).unwrap();
        assert_eq!(table.keypoints[0].column(COLUMN_LIKELIHOOD), None);
    }
}
