use crate::query::types::{LogRecord, POINTER_FIELD};

/// Render a record as one output line: field values in order, space
/// separated, without `@ptr`, trailing whitespace trimmed.
pub fn render_line(record: &LogRecord) -> String {
    let mut line = String::new();
    for (name, value) in record.fields() {
        if name == POINTER_FIELD {
            continue;
        }
        line.push_str(value);
        line.push(' ');
    }
    line.truncate(line.trim_end().len());
    line
}
