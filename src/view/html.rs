use axum::body::Bytes;
use std::convert::Infallible;
use std::io::{self, Write};

use super::fmt::{Cell, CellFormat};
use crate::models::{LogRecord, QueryResult};

/// One table column: its header name and how to pull its value from a record.
pub struct Column<R> {
    pub name: &'static str,
    pub cell: fn(&R) -> Cell<'_>,
}

/// A record type with a declared, ordered column list.
pub trait Tabular: Sized + 'static {
    const COLUMNS: &'static [Column<Self>];
}

impl Tabular for LogRecord {
    const COLUMNS: &'static [Column<Self>] = &[
        Column {
            name: "row",
            cell: |r| Cell::Int(r.row_number),
        },
        Column {
            name: "start_time",
            cell: |r| Cell::Time(r.start_time),
        },
        Column {
            name: "duration",
            cell: |r| Cell::Duration(r.duration),
        },
        Column {
            name: "host_name",
            cell: |r| Cell::Text(&r.host_name),
        },
        Column {
            name: "command_name",
            cell: |r| Cell::Text(&r.command_name),
        },
        Column {
            name: "exit_code",
            cell: |r| Cell::Int(i64::from(r.exit_code)),
        },
    ];
}

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <title>Command History</title>
    <style>
      table {
        border: 2px solid #aaa;
        table-layout: fixed;
      }
      tr:nth-child(even) {
        background: #f4f4f4;
      }
      th,td {
        padding: 0.1em 0.5em;
      }
      td {
        border: 1px solid #aaa;
      }
      th {
        background: #eee;
        border: 1px solid #aaa;
        font-weight: bold;
        text-align: center;
      }
    </style>
  </head>
  <body>
"#;

pub const FOOTER: &str = "      </tbody>
    </table>
  </body>
</html>
";

pub fn render_header<R: Tabular>(row_limit: i64, total_count: i64, failed_count: i64) -> String {
    let mut out = String::from(PAGE_HEAD);
    out.push_str(&format!(
        "    <h3>Displaying up to {row_limit} out of {total_count} commands, including {failed_count} non-zero exit codes.</h3>\n"
    ));
    out.push_str("    <table>\n      <thead>\n        <tr>\n          ");
    for column in R::COLUMNS {
        out.push_str(&format!("<th>{}</th>", column.name));
    }
    out.push_str("\n        </tr>\n      </thead>\n      <tbody>\n");
    out
}

pub fn render_row<R: Tabular>(record: &R, format: &CellFormat) -> String {
    let mut out = String::from("        <tr>\n");
    for column in R::COLUMNS {
        let cell = (column.cell)(record);
        out.push_str(&format!("          <td>{}</td>\n", format.format(&cell)));
    }
    out.push_str("        </tr>\n");
    out
}

/// Write the whole document: header, one block per row, footer.
pub fn write_page<W: Write>(
    w: &mut W,
    result: &QueryResult,
    row_limit: i64,
    format: &CellFormat,
) -> io::Result<()> {
    w.write_all(
        render_header::<LogRecord>(row_limit, result.total_count, result.failed_count).as_bytes(),
    )?;
    for row in &result.rows {
        w.write_all(render_row(row, format).as_bytes())?;
    }
    w.write_all(FOOTER.as_bytes())
}

/// The same document as `write_page`, one chunk per block, for a streamed body.
pub fn page_stream(
    result: QueryResult,
    row_limit: i64,
    format: CellFormat,
) -> impl tokio_stream::Stream<Item = Result<Bytes, Infallible>> {
    async_stream::stream! {
        yield Ok(Bytes::from(render_header::<LogRecord>(
            row_limit,
            result.total_count,
            result.failed_count,
        )));
        for row in &result.rows {
            yield Ok(Bytes::from(render_row(row, &format)));
        }
        yield Ok(Bytes::from_static(FOOTER.as_bytes()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeDelta};
    use tokio_stream::StreamExt;

    fn record(n: i64, host: &str, cmd: &str, code: i32) -> LogRecord {
        LogRecord {
            row_number: n,
            start_time: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            duration: TimeDelta::seconds(75),
            host_name: host.to_string(),
            command_name: cmd.to_string(),
            exit_code: code,
        }
    }

    fn page(result: &QueryResult, limit: i64) -> String {
        let mut buf = Vec::new();
        write_page(&mut buf, result, limit, &CellFormat::default()).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn header_reports_counts() {
        let h = render_header::<LogRecord>(50, 1234, 17);
        assert!(h.contains(
            "Displaying up to 50 out of 1234 commands, including 17 non-zero exit codes."
        ));
        assert!(h.contains("<title>Command History</title>"));
    }

    #[test]
    fn header_columns_follow_declared_order() {
        let h = render_header::<LogRecord>(1, 0, 0);
        assert!(h.contains(
            "<th>row</th><th>start_time</th><th>duration</th><th>host_name</th><th>command_name</th><th>exit_code</th>"
        ));
    }

    #[test]
    fn row_cells_follow_declared_order() {
        let row = render_row(&record(7, "web01", "ls -la", 2), &CellFormat::default());
        let cells: Vec<&str> = row
            .lines()
            .filter_map(|l| l.trim().strip_prefix("<td>"))
            .filter_map(|l| l.strip_suffix("</td>"))
            .collect();
        assert_eq!(
            cells,
            ["7", "2024-03-01 10:00:00", "00:01:15", "web01", "ls -la", "2"]
        );
    }

    #[test]
    fn column_count_matches_cells() {
        let row = render_row(&record(1, "h", "c", 0), &CellFormat::default());
        assert_eq!(row.matches("<td>").count(), LogRecord::COLUMNS.len());
    }

    #[test]
    fn text_cells_are_escaped() {
        let row = render_row(
            &record(1, "<h>", "echo '<script>' && true", 0),
            &CellFormat::default(),
        );
        assert!(!row.contains("<script>"));
        assert!(row.contains("&lt;h&gt;"));
        assert!(row.contains("echo &#39;&lt;script&gt;&#39; &amp;&amp; true"));
    }

    #[test]
    fn empty_result_still_reports_counts() {
        let result = QueryResult {
            total_count: 42,
            failed_count: 5,
            rows: Vec::new(),
        };
        let html = page(&result, 1000);
        assert!(html.contains("out of 42 commands, including 5 non-zero"));
        let body = html.split("<tbody>").nth(1).unwrap();
        assert_eq!(body.matches("<tr>").count(), 0);
        assert!(html.ends_with(FOOTER));
    }

    #[test]
    fn page_has_one_block_per_row_in_order() {
        let result = QueryResult {
            total_count: 3,
            failed_count: 1,
            rows: vec![record(1, "a", "first", 0), record(2, "b", "second", 1)],
        };
        let html = page(&result, 10);
        let body = html.split("<tbody>").nth(1).unwrap();
        assert_eq!(body.matches("<tr>").count(), 2);
        assert!(body.find("first").unwrap() < body.find("second").unwrap());
        assert!(html.starts_with("<!DOCTYPE html>"));
    }

    #[tokio::test]
    async fn stream_matches_written_page() {
        let result = QueryResult {
            total_count: 2,
            failed_count: 0,
            rows: vec![record(1, "a", "x", 0), record(2, "b", "y", 0)],
        };
        let expected = page(&result, 2);

        let chunks: Vec<Bytes> = page_stream(result, 2, CellFormat::default())
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert_eq!(chunks.len(), 4);
        let joined: Vec<u8> = chunks.iter().flat_map(|c| c.iter().copied()).collect();
        assert_eq!(String::from_utf8(joined).unwrap(), expected);
    }
}
