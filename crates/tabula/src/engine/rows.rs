use super::rights::{Applied, DELETE_COLUMN, EDIT_COLUMN};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tabula_core::{
    rowset::{ColumnInfo, Row},
    schema::DataType,
    stmt::Value,
    RowSet, SimpleRowSet,
};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Reads driver rows into a [`RowSet`].
pub(super) struct RowReader<'a> {
    pub(super) view: &'a str,
    pub(super) id_name: &'a str,
    pub(super) version_name: &'a str,
    pub(super) rights: Applied,
    pub(super) max_scale: u32,
}

impl RowReader<'_> {
    pub(super) fn read(&self, infos: Vec<ColumnInfo>, columns: &[String], rows: Vec<Vec<Value>>) -> RowSet {
        let position = |name: &str| columns.iter().position(|c| c.eq_ignore_ascii_case(name));
        // Rights columns come last, after any view column of the same name.
        let rposition = |name: &str| columns.iter().rposition(|c| c.eq_ignore_ascii_case(name));

        let id = position(self.id_name);
        let version = position(self.version_name);
        let edit = self.rights.edit.then(|| rposition(EDIT_COLUMN)).flatten();
        let delete = self.rights.delete.then(|| rposition(DELETE_COLUMN)).flatten();
        let values: Vec<(usize, DataType, Option<u32>)> = infos
            .iter()
            .filter_map(|info| Some((position(&info.id)?, info.ty, info.scale)))
            .collect();

        let view_name = id.map(|_| self.view.to_string());
        let mut rowset = RowSet::new(view_name, infos);

        for (index, row) in rows.into_iter().enumerate() {
            let flag = |at: Option<usize>, default: bool| {
                at.and_then(|at| row.get(at))
                    .and_then(Value::to_i64)
                    .map_or(default, |v| v != 0)
            };

            rowset.rows.push(Row {
                id: id
                    .and_then(|at| row.get(at))
                    .and_then(Value::to_i64)
                    .unwrap_or(index as i64 + 1),
                version: version
                    .and_then(|at| row.get(at))
                    .and_then(Value::to_i64)
                    .unwrap_or(0),
                editable: flag(edit, self.rights.editable),
                removable: flag(delete, self.rights.removable),
                values: values
                    .iter()
                    .map(|&(at, ty, scale)| format_value(row.get(at)?, ty, scale, self.max_scale))
                    .collect(),
            });
        }
        rowset
    }
}

/// Rows of a raw query, in the driver's text form.
pub(super) fn simple_rowset(columns: Vec<String>, rows: Vec<Vec<Value>>) -> SimpleRowSet {
    SimpleRowSet {
        columns,
        rows: rows
            .into_iter()
            .map(|row| row.iter().map(Value::to_text).collect())
            .collect(),
    }
}

/// The string form of a column value handed to callers.
pub(super) fn format_value(value: &Value, ty: DataType, scale: Option<u32>, max_scale: u32) -> Option<String> {
    if value.is_null() {
        return None;
    }
    match ty {
        DataType::Boolean => value.to_bool().filter(|b| *b).map(|_| "t".to_string()),
        DataType::Date => value
            .to_i64()
            .map(|millis| millis.div_euclid(MILLIS_PER_DAY).to_string()),
        DataType::Double | DataType::Decimal => match value.to_f64() {
            Some(number) => Some(format_number(number, scale, max_scale)),
            None => value.to_text(),
        },
        DataType::Blob => match value {
            Value::Bytes(bytes) => Some(STANDARD.encode(bytes)),
            other => other.to_text().map(|text| STANDARD.encode(text.as_bytes())),
        },
        _ => value.to_text(),
    }
}

/// Fixed to `scale` digits when the column has one, otherwise to
/// `max_scale` digits with trailing zeros dropped.
fn format_number(number: f64, scale: Option<u32>, max_scale: u32) -> String {
    match scale {
        Some(scale) => format!("{:.*}", scale as usize, number),
        None => {
            let text = format!("{:.*}", max_scale as usize, number);
            if text.contains('.') {
                text.trim_end_matches('0').trim_end_matches('.').to_string()
            } else {
                text
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn reader(rights: Applied) -> RowReader<'static> {
        RowReader {
            view: "Orders",
            id_name: "ID",
            version_name: "Version",
            rights,
            max_scale: 7,
        }
    }

    #[test]
    fn values_are_formatted_per_type() {
        let text = |value: Value, ty, scale| format_value(&value, ty, scale, 7);

        assert_eq!(text(Value::I64(1), DataType::Boolean, None), Some("t".into()));
        assert_eq!(text(Value::I64(0), DataType::Boolean, None), None);
        assert_eq!(text(Value::I64(2 * MILLIS_PER_DAY + 5), DataType::Date, None), Some("2".into()));
        assert_eq!(text(Value::F64(2.5), DataType::Decimal, Some(2)), Some("2.50".into()));
        assert_eq!(text(Value::F64(1.0 / 3.0), DataType::Double, None), Some("0.3333333".into()));
        assert_eq!(text(Value::F64(4.0), DataType::Double, None), Some("4".into()));
        assert_eq!(text(Value::Bytes(b"hi".to_vec()), DataType::Blob, None), Some("aGk=".into()));
        assert_eq!(text(Value::Null, DataType::String, None), None);
    }

    #[test]
    fn ids_come_from_the_result_or_are_numbered() {
        let infos = vec![ColumnInfo::new("Name", DataType::String)];

        let with_ids = reader(Applied::ALL).read(
            infos.clone(),
            &["ID".into(), "Version".into(), "Name".into()],
            vec![vec![Value::I64(10), Value::I64(3), Value::from("a")]],
        );
        assert_eq!(with_ids.view_name.as_deref(), Some("Orders"));
        assert_eq!((with_ids.rows[0].id, with_ids.rows[0].version), (10, 3));

        let numbered = reader(Applied::ALL).read(
            infos,
            &["Name".into()],
            vec![vec![Value::from("a")], vec![Value::from("b")]],
        );
        assert_eq!(numbered.view_name, None);
        assert_eq!(numbered.ids(), vec![1, 2]);
        assert_eq!(numbered.value(1, "Name"), Some("b"));
    }

    #[test]
    fn rights_columns_override_defaults() {
        let rights = Applied {
            edit: true,
            delete: false,
            editable: true,
            removable: false,
        };
        let rowset = reader(rights).read(
            vec![],
            &["ID".into(), "Version".into(), "EDIT".into()],
            vec![
                vec![Value::I64(1), Value::I64(1), Value::I64(0)],
                vec![Value::I64(2), Value::I64(1), Value::I64(1)],
            ],
        );
        assert!(!rowset.rows[0].editable);
        assert!(rowset.rows[1].editable);
        assert!(!rowset.rows[1].removable);
    }
}
