use crate::Result;

use tabula_core::{
    driver::{Operation, Response, Sql},
    Connection,
};
use tabula_sql::{Serializer, Statement};

/// Renders `stmt` and runs it: queries return rows, everything else an
/// update count.
pub(crate) fn run(
    conn: &mut dyn Connection,
    serializer: &Serializer,
    stmt: impl Into<Statement>,
) -> Result<Response> {
    let stmt = stmt.into();
    let mut params = vec![];
    let text = serializer.serialize(&stmt, &mut params);
    tracing::debug!(sql = %text, params = params.len(), "exec");

    let sql = Sql::new(text, params);
    conn.exec(if stmt.is_query() {
        Operation::Query(sql)
    } else {
        Operation::Execute(sql)
    })
}

/// Milliseconds since the epoch, the value written to version fields.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
