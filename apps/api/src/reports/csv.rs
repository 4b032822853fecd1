use std::borrow::Cow;

/// A record that can be written as one CSV line.
pub trait CsvRow {
    const HEADERS: &'static [&'static str];

    fn fields(&self) -> Vec<String>;
}

/// Quotes a field when it contains a comma, quote or line break; inner quotes are doubled.
pub fn escape_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

fn render_line(fields: impl IntoIterator<Item = impl AsRef<str>>) -> String {
    fields
        .into_iter()
        .map(|f| escape_field(f.as_ref()).into_owned())
        .collect::<Vec<_>>()
        .join(",")
}

/// Header line followed by one line per row, joined with `\n`.
pub fn render<R: CsvRow>(rows: &[R]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(render_line(R::HEADERS));
    lines.extend(rows.iter().map(|row| render_line(row.fields())));
    lines.join("\n")
}

pub fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Person {
        name: &'static str,
        note: Option<&'static str>,
    }

    impl CsvRow for Person {
        const HEADERS: &'static [&'static str] = &["Name", "Note"];

        fn fields(&self) -> Vec<String> {
            vec![self.name.to_string(), opt(&self.note)]
        }
    }

    #[test]
    fn test_plain_fields_are_untouched() {
        assert_eq!(escape_field("Engineering"), "Engineering");
    }

    #[test]
    fn test_special_characters_are_quoted() {
        assert_eq!(escape_field("Pune, India"), "\"Pune, India\"");
        assert_eq!(escape_field("the \"best\""), "\"the \"\"best\"\"\"");
        assert_eq!(escape_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_render_rows() {
        let rows = [
            Person {
                name: "Asha",
                note: Some("on leave, back Monday"),
            },
            Person {
                name: "Ben",
                note: None,
            },
        ];
        assert_eq!(
            render(&rows),
            "Name,Note\nAsha,\"on leave, back Monday\"\nBen,"
        );
    }

    #[test]
    fn test_empty_report_is_header_only() {
        assert_eq!(render::<Person>(&[]), "Name,Note");
    }
}
