/*!
Page tables as produced by a PDF table extractor, in JSON:

```json
{"pages": [
  {"number": 1, "title": "FORM 20 ... 036- Uthiramerur", "table": [["1", "12", 100, null]]},
  {"number": 2, "table": null}
]}
```

Cells may be strings, numbers or null. A page without table stands for a
page where the extractor found nothing.
*/
use crate::tally::*;

use serde::{Deserialize, Serialize};

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
struct JsonPage {
    number: u32,
    title: Option<String>,
    table: Option<Vec<Vec<JSValue>>>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
struct JsonDocument {
    pages: Vec<JsonPage>,
}

pub fn read_json_pages(path: &str) -> TallyResult<Vec<PageExtract>> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    parse_json_pages(&contents, path)
}

fn parse_json_pages(contents: &str, path: &str) -> TallyResult<Vec<PageExtract>> {
    let doc: JsonDocument = serde_json::from_str(contents).context(ParsingJsonSnafu { path })?;
    let res: Vec<PageExtract> = doc
        .pages
        .into_iter()
        .map(|p| PageExtract {
            number: p.number,
            table: p.table.map(|rows| {
                rows.iter()
                    .map(|row| row.iter().map(js_cell_text).collect())
                    .collect()
            }),
            title: p.title,
        })
        .collect();
    debug!("read_json_pages: {}: {} pages", path, res.len());
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_and_cells() {
        let pages = parse_json_pages(
            r#"{"pages": [
                {"number": 1, "title": "036- Uthiramerur", "table": [["1", "12 (M)", 100, null, 7.0]]},
                {"number": 2, "table": null},
                {"number": 3}
            ]}"#,
            "test.json",
        )
        .unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].title.as_deref(), Some("036- Uthiramerur"));
        assert_eq!(
            pages[0].table,
            Some(vec![vec![
                Some("1".to_string()),
                Some("12 (M)".to_string()),
                Some("100".to_string()),
                None,
                Some("7".to_string()),
            ]])
        );
        assert_eq!(pages[1], PageExtract::empty(2));
        assert_eq!(pages[2].table, None);
    }

    #[test]
    fn not_a_document() {
        assert!(matches!(
            parse_json_pages(r#"{"tables": []}"#, "test.json"),
            Err(TallyError::ParsingJson { .. })
        ));
    }
}
