//! Custom [`upon`] formatters for writing WXR.

use crate::sanitize::is_xml_char;
use rslug::slugify;
use std::fmt::Write;
use upon::{Engine, Value, fmt as upon_fmt};

/// Escapes text for use in element content or a double-quoted attribute.
fn xml_formatter(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
    match value {
        Value::String(s) => {
            for c in s.chars().filter(|c| is_xml_char(*c)) {
                match c {
                    '&' => f.write_str("&amp;")?,
                    '<' => f.write_str("&lt;")?,
                    '>' => f.write_str("&gt;")?,
                    '"' => f.write_str("&quot;")?,
                    '\'' => f.write_str("&apos;")?,
                    c => f.write_char(c)?,
                }
            }
        },
        v => upon_fmt::default(f, v)?,
    };
    Ok(())
}

/// Writes text that goes between `<![CDATA[` and `]]>`. A terminator inside the
/// text is split across two sections.
fn cdata_formatter(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
    match value {
        Value::String(s) => f.write_str(&s.replace("]]>", "]]]]><![CDATA[>"))?,
        v => upon_fmt::default(f, v)?,
    };
    Ok(())
}

/// Converts a term name into a WordPress nicename.
///
/// Strips quotation marks before slugifying to avoid output like `"hello"`
/// becoming `-hello-`.
fn slug_formatter(f: &mut upon_fmt::Formatter<'_>, value: &Value) -> upon_fmt::Result {
    match value {
        Value::String(s) => {
            // Various quotation marks: '"''""„"`«»
            let marks = [
                '\u{0027}', '\u{0022}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{201E}', '\u{201B}',
                '\u{0060}', '\u{00AB}', '\u{00BB}', '\u{2039}', '\u{203A}',
            ];
            let stripped: String = s.chars().filter(|c| !marks.contains(c)).collect();
            write!(f, "{}", slugify!(&stripped))?
        },
        v => upon_fmt::default(f, v)?,
    };
    Ok(())
}

/// Registers the `xml`, `cdata` and `slug` formatters on the given engine.
pub(crate) fn configure(engine: &mut Engine<'_>) {
    engine.add_formatter("xml", xml_formatter);
    engine.add_formatter("cdata", cdata_formatter);
    engine.add_formatter("slug", slug_formatter);
}
