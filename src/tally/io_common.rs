use crate::tally::*;

use std::collections::BTreeSet;
use std::io::Write;

/// Stands in for a constituency number or name that could not be found.
pub const UNKNOWN: &str = "UNKNOWN";

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

pub fn path_string(p: &Path) -> String {
    p.display().to_string()
}

/// Paths of the configuration are relative to the configuration file.
pub fn resolve_path(root: &Path, rel: &str) -> PathBuf {
    root.join(rel)
}

/// Letters and digits kept, any other run of characters becomes one underscore.
pub fn file_safe_name(name: &str) -> String {
    let clean: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let parts: Vec<&str> = clean.split('_').filter(|s| !s.is_empty()).collect();
    parts.join("_")
}

/// "AC036_Uthiramerur", usable as a file name prefix.
pub fn document_stem(number: &str, name: &str) -> String {
    format!("AC{}_{}", number, file_safe_name(name))
}

/// Reserves the output stem of a document for the current run.
///
/// A stem already taken by an earlier document gets the input file name
/// appended. If that is taken too the document has no place for its outputs.
pub fn reserve_stem(
    used: &mut BTreeSet<String>,
    number: &str,
    name: &str,
    input_path: &str,
) -> TallyResult<String> {
    let stem = document_stem(number, name);
    if used.insert(stem.clone()) {
        return Ok(stem);
    }
    let input_stem = Path::new(input_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(input_path);
    let alt = format!("{}_{}", stem, file_safe_name(input_stem));
    if used.insert(alt.clone()) {
        warn!(
            "Outputs {} already written in this run, {} goes to {}",
            stem,
            simplify_file_name(input_path),
            alt
        );
        return Ok(alt);
    }
    DuplicateOutputSnafu { stem: alt }.fail()
}

/// Writes next to the target then renames, so a reader never sees a partial file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> TallyResult<()> {
    let tmp_path = path.with_extension("tmp");
    let mut f = fs::File::create(&tmp_path).context(WritingFileSnafu {
        path: path_string(&tmp_path),
    })?;
    f.write_all(contents).context(WritingFileSnafu {
        path: path_string(&tmp_path),
    })?;
    fs::rename(&tmp_path, path).context(WritingFileSnafu {
        path: path_string(path),
    })?;
    debug!("write_atomic: {} bytes to {:?}", contents.len(), path);
    Ok(())
}

pub fn write_json(path: &Path, js: &JSValue) -> TallyResult<()> {
    let pretty = serde_json::to_string_pretty(js).context(SerializingJsonSnafu {})?;
    write_atomic(path, pretty.as_bytes())
}

/// The message of an error followed by the messages of its causes.
pub fn error_chain(e: &TallyError) -> String {
    let mut msgs: Vec<String> = vec![e.to_string()];
    let mut current = std::error::Error::source(e);
    while let Some(cause) = current {
        msgs.push(cause.to_string());
        current = cause.source();
    }
    msgs.join(": ")
}

/// The text of a JSON table cell. Numbers that are integers lose their
/// fractional part, as spreadsheets tend to store them as floats.
pub fn js_cell_text(v: &JSValue) -> Option<String> {
    match v {
        JSValue::Null => None,
        JSValue::String(s) => Some(s.clone()),
        JSValue::Number(n) => match (n.as_u64(), n.as_i64(), n.as_f64()) {
            (Some(x), _, _) => Some(x.to_string()),
            (_, Some(x), _) => Some(x.to_string()),
            (_, _, Some(f)) => Some(float_text(f)),
            _ => Some(n.to_string()),
        },
        JSValue::Bool(b) => Some(b.to_string()),
        x => Some(x.to_string()),
    }
}

pub fn float_text(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}
