pub mod fmt;
pub mod html;

pub use fmt::{Cell, CellFormat, DisplayZone};
pub use html::{page_stream, render_header, render_row, write_page, Column, Tabular, FOOTER};
