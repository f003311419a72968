// ai
//! 📦 Transport messages — the building blocks of inq
//!
//! 🎬 COLD OPEN — INT. INGEST FLOOR — 3:47 AM
//!
//! A line of XML rolls off the file reader. It has no idea what it is yet.
//! Then the builder stamps it: an id, a type, a source, an operation. Four
//! attributes, no more, no less. The message steps onto the dispatch queue
//! carrying its raw payload like a responsible adult carrying groceries in
//! one trip. It will never be modified again. It wouldn't even know how.
//!
//! 🦆 (the duck notarized the attribute list. it is final.)
//!
//! This module defines the unit of data that moves through the whole
//! pipeline: driver → dispatch queue → batch worker → queue sink. Once a
//! `TransportMessage` is built it is immutable — the struct exposes read
//! access only, and nothing downstream has any business changing it.

use serde::Serialize;

// 🏷️ Attribute names the downstream indexer keys on. Keep in lockstep with
// whatever is consuming the destination queue, or enjoy your silent data loss.
pub(crate) const ATTR_RECORD_ID: &str = "record-id";
pub(crate) const ATTR_RECORD_TYPE: &str = "record-type";
pub(crate) const ATTR_RECORD_SOURCE: &str = "record-source";
pub(crate) const ATTR_RECORD_OPERATION: &str = "record-operation";

// 🏷️ Fixed attribute values. Every record this service ships is a structured
// document being updated. There is no delete path here. There never was.
pub(crate) const RECORD_TYPE_STRUCTURED_DOCUMENT: &str = "structured-document";
pub(crate) const RECORD_OPERATION_UPDATE: &str = "update";

/// 🏷️ One name/value pair riding on a message. Names are unique within a
/// message because the builder is the only thing that ever writes them.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Attribute {
    pub name: String,
    pub value: String,
}

/// 📦 The unit moved through the pipeline: four descriptive attributes plus
/// the raw input line, exactly as it was read.
///
/// Fields are private on purpose. A message is constructed once by
/// [`TransportMessage::new`] and then only ever read — the dispatch queue,
/// the batch workers, and the sink all get a finished artifact.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct TransportMessage {
    attributes: Vec<Attribute>,
    payload: String,
}

impl TransportMessage {
    /// 🏗️ The message builder. Pure, total, no failure mode — you give it a
    /// source name, an extracted id, and the raw line, and you get a message.
    ///
    /// Always attaches exactly four attributes: record id, record type
    /// (fixed), record source (the configured data-source name), and record
    /// operation (fixed). The payload is the line as the driver hands it
    /// over: record-separator stripped, content untouched.
    pub(crate) fn new(source: &str, id: &str, raw_line: &str) -> Self {
        let attributes = vec![
            Attribute {
                name: ATTR_RECORD_ID.to_string(),
                value: id.to_string(),
            },
            Attribute {
                name: ATTR_RECORD_TYPE.to_string(),
                value: RECORD_TYPE_STRUCTURED_DOCUMENT.to_string(),
            },
            Attribute {
                name: ATTR_RECORD_SOURCE.to_string(),
                value: source.to_string(),
            },
            Attribute {
                name: ATTR_RECORD_OPERATION.to_string(),
                value: RECORD_OPERATION_UPDATE.to_string(),
            },
        ];
        Self {
            attributes,
            payload: raw_line.to_string(),
        }
    }

    pub(crate) fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub(crate) fn payload(&self) -> &str {
        &self.payload
    }

    /// 🔎 Convenience lookup, mostly for logs and tests.
    pub(crate) fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_every_message_gets_exactly_four_attributes() {
        let message = TransportMessage::new("archive-a", "rec-001", "<doc/>");
        assert_eq!(message.attributes().len(), 4);
        assert_eq!(message.attribute(ATTR_RECORD_ID), Some("rec-001"));
        assert_eq!(
            message.attribute(ATTR_RECORD_TYPE),
            Some(RECORD_TYPE_STRUCTURED_DOCUMENT)
        );
        assert_eq!(message.attribute(ATTR_RECORD_SOURCE), Some("archive-a"));
        assert_eq!(
            message.attribute(ATTR_RECORD_OPERATION),
            Some(RECORD_OPERATION_UPDATE)
        );
    }

    #[test]
    fn the_one_where_the_payload_is_exactly_what_was_given() {
        let line = r#"<add><doc><field name="id">u42</field></doc></add>"#;
        let message = TransportMessage::new("archive-a", "u42", line);
        assert_eq!(message.payload(), line);
    }

    #[test]
    fn the_one_where_attribute_names_are_unique() {
        // the builder is the only writer, so uniqueness is structural
        let message = TransportMessage::new("src", "id", "payload");
        let mut names: Vec<_> = message.attributes().iter().map(|a| &a.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 4);
    }
}
