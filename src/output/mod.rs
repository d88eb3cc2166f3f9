//! Output formatting module.
//!
//! Formatters for plain text, JSON, CSV, and TXT output of scan results.
//! Presentation only consumes records and snapshots; it never reaches into
//! the scanning engine.

mod csv_format;
mod json_format;
mod plain;
mod txt_format;

pub use csv_format::print_csv;
pub use json_format::print_json;
pub use plain::{
    print_error, print_info, print_plain, print_results, print_scan_header, print_success,
    print_warning,
};
pub use txt_format::render_txt;
