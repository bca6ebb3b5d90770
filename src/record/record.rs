use super::error::{RecordError, RecordResult};
use super::schema::Schema;
use super::value::Value;
use crate::file::PageNumber;

/// Slot index within a data page
pub type SlotId = usize;

/// Physical identifier for a record (data page + slot). Stable across updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page: PageNumber,
    pub slot: SlotId,
}

impl RecordId {
    pub fn new(page: PageNumber, slot: SlotId) -> Self {
        Self { page, slot }
    }
}

/// A fixed-width record buffer plus its RID. Attribute values are read and
/// written in place at schema-computed offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: Option<RecordId>,
    data: Vec<u8>,
}

impl Record {
    /// Allocate a zeroed record buffer sized by the schema. The RID is unset
    /// until the record is inserted or fetched.
    pub fn new(schema: &Schema) -> Self {
        Self {
            id: None,
            data: vec![0u8; schema.record_size()],
        }
    }

    /// Wrap an existing serialized payload.
    pub fn from_bytes(id: RecordId, data: Vec<u8>) -> Self {
        Self { id: Some(id), data }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Decode attribute `idx` into a freshly allocated value.
    pub fn get_attr(&self, schema: &Schema, idx: usize) -> RecordResult<Value> {
        let attr = schema
            .attribute(idx)
            .ok_or(RecordError::AttributeOutOfRange(idx))?;
        let offset = schema.attr_offset(idx);
        Value::decode(&attr.data_type, &self.data[offset..offset + attr.size()])
    }

    /// Encode `value` into attribute `idx`'s window of the record buffer.
    pub fn set_attr(&mut self, schema: &Schema, idx: usize, value: &Value) -> RecordResult<()> {
        let attr = schema
            .attribute(idx)
            .ok_or(RecordError::AttributeOutOfRange(idx))?;
        let offset = schema.attr_offset(idx);
        value.encode(
            &attr.data_type,
            &mut self.data[offset..offset + attr.size()],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Attribute, DataType};

    fn test_schema() -> Schema {
        Schema::new(
            vec![
                Attribute::new("id", DataType::Int),
                Attribute::new("name", DataType::String(10)),
                Attribute::new("salary", DataType::Float),
                Attribute::new("active", DataType::Bool),
            ],
            vec![0],
        )
    }

    #[test]
    fn test_new_record_zeroed() {
        let schema = test_schema();
        let record = Record::new(&schema);
        assert_eq!(record.data().len(), schema.record_size());
        assert!(record.data().iter().all(|&b| b == 0));
        assert!(record.id.is_none());
    }

    #[test]
    fn test_attr_round_trip() {
        let schema = test_schema();
        let mut record = Record::new(&schema);

        record.set_attr(&schema, 0, &Value::Int(7)).unwrap();
        record
            .set_attr(&schema, 1, &Value::String("alice".to_string()))
            .unwrap();
        record.set_attr(&schema, 2, &Value::Float(512.25)).unwrap();
        record.set_attr(&schema, 3, &Value::Bool(true)).unwrap();

        assert_eq!(record.get_attr(&schema, 0).unwrap(), Value::Int(7));
        assert_eq!(
            record.get_attr(&schema, 1).unwrap(),
            Value::String("alice".to_string())
        );
        assert_eq!(record.get_attr(&schema, 2).unwrap(), Value::Float(512.25));
        assert_eq!(record.get_attr(&schema, 3).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_set_attr_does_not_disturb_neighbors() {
        let schema = test_schema();
        let mut record = Record::new(&schema);

        record.set_attr(&schema, 0, &Value::Int(1)).unwrap();
        record
            .set_attr(&schema, 1, &Value::String("abcdefghij".to_string()))
            .unwrap();
        record
            .set_attr(&schema, 1, &Value::String("xy".to_string()))
            .unwrap();

        assert_eq!(record.get_attr(&schema, 0).unwrap(), Value::Int(1));
        assert_eq!(
            record.get_attr(&schema, 1).unwrap(),
            Value::String("xy".to_string())
        );
    }

    #[test]
    fn test_attr_out_of_range() {
        let schema = test_schema();
        let record = Record::new(&schema);
        assert!(matches!(
            record.get_attr(&schema, 4),
            Err(RecordError::AttributeOutOfRange(4))
        ));
    }
}
