use std::fmt::Write as _;
use std::str::FromStr;

use super::error::{RecordError, RecordResult};
use super::schema::{Attribute, Schema};
use super::value::DataType;
use crate::file::PageNumber;

/// Table-level metadata persisted on page 0.
///
/// Text format, newline-delimited:
/// ```text
/// <num_tuples> <next_free_page>
/// <num_attr>
/// <type_code> <type_length> <attr_name>     (one line per attribute)
/// <key_count> <key_idx>...
/// ```
/// `next_free_page` is `-1` when no page is known to have free slots.
#[derive(Debug, Clone, PartialEq)]
pub struct TableMeta {
    pub num_tuples: usize,
    pub next_free_page: Option<PageNumber>,
    pub schema: Schema,
}

impl TableMeta {
    /// Render into a page buffer. Fails before touching `buf` when the
    /// serialized form would not fit one page.
    pub fn encode(&self, buf: &mut [u8]) -> RecordResult<()> {
        let mut text = String::new();

        let hint = self.next_free_page.map(|p| p as i64).unwrap_or(-1);
        let _ = writeln!(text, "{} {}", self.num_tuples, hint);
        let _ = writeln!(text, "{}", self.schema.num_attrs());

        for attr in self.schema.attributes() {
            if attr.name.is_empty() || attr.name.chars().any(|c| c.is_whitespace()) {
                return Err(RecordError::InvalidAttributeName(attr.name.clone()));
            }
            let _ = writeln!(
                text,
                "{} {} {}",
                attr.data_type.type_code(),
                attr.data_type.type_length(),
                attr.name
            );
        }

        let _ = write!(text, "{}", self.schema.key_attrs().len());
        for &key in self.schema.key_attrs() {
            let _ = write!(text, " {}", key);
        }
        text.push('\n');

        if text.len() > buf.len() {
            return Err(RecordError::MetadataTooLarge {
                needed: text.len(),
                limit: buf.len(),
            });
        }

        buf.fill(0);
        buf[..text.len()].copy_from_slice(text.as_bytes());
        Ok(())
    }

    /// Parse a page-0 buffer written by `encode`.
    pub fn decode(buf: &[u8]) -> RecordResult<Self> {
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        let text = std::str::from_utf8(&buf[..end])
            .map_err(|e| RecordError::CorruptMetadata(format!("not UTF-8: {}", e)))?;
        let mut lines = text.lines();

        let mut header = tokens(lines.next(), "header line")?;
        let num_tuples: usize = parse(header.next(), "tuple count")?;
        let hint: i64 = parse(header.next(), "free page hint")?;
        let next_free_page = (hint >= 1).then_some(hint as PageNumber);

        let num_attrs: usize = parse(tokens(lines.next(), "attribute count")?.next(), "attribute count")?;

        let mut attributes = Vec::with_capacity(num_attrs);
        for i in 0..num_attrs {
            let mut toks = tokens(lines.next(), "attribute line")?;
            let code: u8 = parse(toks.next(), "type code")?;
            let length: usize = parse(toks.next(), "type length")?;
            let name = toks
                .next()
                .ok_or_else(|| RecordError::CorruptMetadata(format!("attribute {} has no name", i)))?;
            attributes.push(Attribute::new(name, DataType::from_code(code, length)?));
        }

        let mut key_toks = tokens(lines.next(), "key line")?;
        let key_count: usize = parse(key_toks.next(), "key count")?;
        let mut key_attrs = Vec::with_capacity(key_count);
        for _ in 0..key_count {
            let idx: usize = parse(key_toks.next(), "key index")?;
            if idx >= num_attrs {
                return Err(RecordError::CorruptMetadata(format!(
                    "key index {} out of range for {} attributes",
                    idx, num_attrs
                )));
            }
            key_attrs.push(idx);
        }

        Ok(Self {
            num_tuples,
            next_free_page,
            schema: Schema::new(attributes, key_attrs),
        })
    }
}

fn tokens<'a>(
    line: Option<&'a str>,
    what: &str,
) -> RecordResult<std::str::SplitWhitespace<'a>> {
    line.map(str::split_whitespace)
        .ok_or_else(|| RecordError::CorruptMetadata(format!("missing {}", what)))
}

fn parse<T: FromStr>(token: Option<&str>, what: &str) -> RecordResult<T> {
    let token =
        token.ok_or_else(|| RecordError::CorruptMetadata(format!("missing {}", what)))?;
    token
        .parse()
        .map_err(|_| RecordError::CorruptMetadata(format!("bad {}: {:?}", what, token)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::PAGE_SIZE;

    fn sample_meta() -> TableMeta {
        TableMeta {
            num_tuples: 17,
            next_free_page: Some(3),
            schema: Schema::new(
                vec![
                    Attribute::new("id", DataType::Int),
                    Attribute::new("name", DataType::String(10)),
                    Attribute::new("salary", DataType::Float),
                    Attribute::new("active", DataType::Bool),
                ],
                vec![0, 1],
            ),
        }
    }

    #[test]
    fn test_round_trip() {
        let meta = sample_meta();
        let mut buf = vec![0u8; PAGE_SIZE];
        meta.encode(&mut buf).unwrap();
        assert_eq!(TableMeta::decode(&buf).unwrap(), meta);
    }

    #[test]
    fn test_no_hint_round_trip() {
        let mut meta = sample_meta();
        meta.next_free_page = None;
        let mut buf = vec![0u8; PAGE_SIZE];
        meta.encode(&mut buf).unwrap();

        let text_end = buf.iter().position(|&b| b == 0).unwrap();
        let text = std::str::from_utf8(&buf[..text_end]).unwrap();
        assert!(text.starts_with("17 -1\n"));

        assert_eq!(TableMeta::decode(&buf).unwrap().next_free_page, None);
    }

    #[test]
    fn test_wire_text() {
        let meta = TableMeta {
            num_tuples: 2,
            next_free_page: Some(1),
            schema: Schema::new(vec![Attribute::new("a", DataType::Int)], vec![0]),
        };
        let mut buf = vec![0u8; PAGE_SIZE];
        meta.encode(&mut buf).unwrap();

        let text_end = buf.iter().position(|&b| b == 0).unwrap();
        let text = std::str::from_utf8(&buf[..text_end]).unwrap();
        assert_eq!(text, "2 1\n1\n0 0 a\n1 0\n");
    }

    #[test]
    fn test_too_large() {
        let attributes = (0..200)
            .map(|i| Attribute::new(format!("attribute_with_a_rather_long_name_{:04}", i), DataType::Int))
            .collect();
        let meta = TableMeta {
            num_tuples: 0,
            next_free_page: None,
            schema: Schema::new(attributes, vec![]),
        };
        let mut buf = vec![0u8; PAGE_SIZE];
        let before = buf.clone();
        let result = meta.encode(&mut buf);
        assert!(matches!(result, Err(RecordError::MetadataTooLarge { .. })));
        assert_eq!(buf, before);
    }

    #[test]
    fn test_name_with_whitespace_rejected() {
        let meta = TableMeta {
            num_tuples: 0,
            next_free_page: None,
            schema: Schema::new(vec![Attribute::new("bad name", DataType::Int)], vec![]),
        };
        let mut buf = vec![0u8; PAGE_SIZE];
        assert!(matches!(
            meta.encode(&mut buf),
            Err(RecordError::InvalidAttributeName(_))
        ));
    }

    #[test]
    fn test_decode_garbage() {
        let mut buf = vec![0u8; PAGE_SIZE];
        buf[..7].copy_from_slice(b"zz yy\n?");
        assert!(matches!(
            TableMeta::decode(&buf),
            Err(RecordError::CorruptMetadata(_))
        ));
    }

    #[test]
    fn test_decode_bad_key_index() {
        let mut buf = vec![0u8; PAGE_SIZE];
        let text = b"0 -1\n1\n0 0 a\n1 5\n";
        buf[..text.len()].copy_from_slice(text);
        assert!(matches!(
            TableMeta::decode(&buf),
            Err(RecordError::CorruptMetadata(_))
        ));
    }
}
