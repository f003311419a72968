// human
// Pulls the record id out of one line of XML. Pure function, no I/O.
// The query it answers is //doc/field[@name='id'] — a <field> element
// carrying name="id", as a direct child of a <doc> element.

use anyhow::{Context, Result, bail};
use roxmltree::Document;

pub(crate) fn extract_id(line: &str) -> Result<String> {
    let document = Document::parse(line).context("record line is not parseable XML")?;

    let id_node = document.descendants().find(|node| {
        node.has_tag_name("field")
            && node.attribute("name") == Some("id")
            && node.parent().is_some_and(|p| p.has_tag_name("doc"))
    });

    let Some(id_node) = id_node else {
        bail!("record has no doc/field[@name='id'] element");
    };

    let id = id_node.text().map(str::trim).unwrap_or_default();
    if id.is_empty() {
        bail!("record id field is empty");
    }

    Ok(id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_a_wellformed_record_yields_its_id() {
        let line = r#"<add><doc><field name="id">u12345</field><field name="title">a title</field></doc></add>"#;
        assert_eq!(extract_id(line).unwrap(), "u12345");
    }

    #[test]
    fn the_one_where_the_id_field_is_missing() {
        let line = r#"<add><doc><field name="title">no id here</field></doc></add>"#;
        let err = extract_id(line).unwrap_err();
        assert!(err.to_string().contains("no doc/field"));
    }

    #[test]
    fn the_one_where_the_line_is_not_even_xml() {
        let err = extract_id("{\"this\": \"is json, kevin\"}").unwrap_err();
        assert!(err.to_string().contains("not parseable XML"));
    }

    #[test]
    fn the_one_where_the_id_is_empty() {
        let line = r#"<add><doc><field name="id"> </field></doc></add>"#;
        let err = extract_id(line).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn the_one_where_a_field_outside_a_doc_does_not_count() {
        // the id must live under <doc>, not float at the top level
        let line = r#"<add><field name="id">u1</field><doc><field name="other">x</field></doc></add>"#;
        assert!(extract_id(line).is_err());
    }

    #[test]
    fn the_one_where_a_deeply_nested_field_does_not_count() {
        // direct child of <doc> only — a field buried one level deeper is not it
        let line = r#"<add><doc><wrapper><field name="id">u1</field></wrapper></doc></add>"#;
        assert!(extract_id(line).is_err());
    }
}
