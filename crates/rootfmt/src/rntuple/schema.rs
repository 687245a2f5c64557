//! Schema reader (spec §4.3).
//!
//! Parses the header envelope's payload, and the structurally-identical
//! schema extension embedded in the footer: a feature flag, a writer tag,
//! three strings, then four lists (fields, columns, alias columns, extra
//! type info). Field and column records are the vocabulary the form builder
//! (`form.rs`) walks to produce the logical schema.

use thiserror::Error;

use crate::cursor::{Chunk, Cursor, CursorError};
use crate::rntuple::envelope::{read_list_of_records, EnvelopeError};

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error(transparent)]
    Cursor(#[from] CursorError),
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    #[error("struct_role {0} is not one of leaf/collection/record/variant")]
    UnknownStructRole(u16),
}

pub type SchemaResult<T> = Result<T, SchemaError>;

/// `struct_role` (spec §3): dispatch key the form builder switches on.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StructRole {
    Leaf,
    Collection,
    Record,
    Variant,
}

impl StructRole {
    fn from_u16(value: u16) -> SchemaResult<Self> {
        match value {
            0 => Ok(StructRole::Leaf),
            1 => Ok(StructRole::Collection),
            2 => Ok(StructRole::Record),
            3 => Ok(StructRole::Variant),
            other => Err(SchemaError::UnknownStructRole(other)),
        }
    }
}

/// Spec §3/§6 field record.
#[derive(Clone, Debug)]
pub struct FieldRecord {
    pub field_id: u32,
    pub field_version: u32,
    pub type_version: u32,
    pub parent_field_id: u32,
    pub struct_role: StructRole,
    pub flags: u16,
    pub repetition: u64,
    pub field_name: String,
    pub type_name: String,
    pub type_alias: String,
    pub description: String,
}

impl FieldRecord {
    pub fn is_top_level(&self) -> bool {
        self.parent_field_id == self.field_id
    }

    fn read(cursor: &mut Cursor, chunk: &Chunk, field_id: u32) -> SchemaResult<Self> {
        let field_version = cursor.read_u32(chunk)?;
        let type_version = cursor.read_u32(chunk)?;
        let parent_field_id = cursor.read_u32(chunk)?;
        let struct_role = StructRole::from_u16(cursor.read_u16(chunk)?)?;
        let flags = cursor.read_u16(chunk)?;
        let repetition = if flags & 0x1 != 0 {
            cursor.read_u64(chunk)?
        } else {
            0
        };
        let field_name = cursor.read_string(chunk)?;
        let type_name = cursor.read_string(chunk)?;
        let type_alias = cursor.read_string(chunk)?;
        let description = cursor.read_string(chunk)?;
        Ok(FieldRecord {
            field_id,
            field_version,
            type_version,
            parent_field_id,
            struct_role,
            flags,
            repetition,
            field_name,
            type_name,
            type_alias,
            description,
        })
    }
}

/// Spec §3/§6 column record.
#[derive(Clone, Copy, Debug)]
pub struct ColumnRecord {
    pub column_id: u32,
    pub type_id: u16,
    pub nbits: u16,
    pub field_id: u32,
    pub flags: u16,
}

impl ColumnRecord {
    fn read(cursor: &mut Cursor, chunk: &Chunk, column_id: u32) -> SchemaResult<Self> {
        Ok(ColumnRecord {
            column_id,
            type_id: cursor.read_u16(chunk)?,
            nbits: cursor.read_u16(chunk)?,
            field_id: cursor.read_u32(chunk)?,
            flags: cursor.read_u16(chunk)?,
        })
    }
}

#[derive(Clone, Copy, Debug)]
pub struct AliasColumn {
    pub physical_id: u32,
    pub field_id: u32,
}

impl AliasColumn {
    fn read(cursor: &mut Cursor, chunk: &Chunk) -> SchemaResult<Self> {
        Ok(AliasColumn {
            physical_id: cursor.read_u32(chunk)?,
            field_id: cursor.read_u32(chunk)?,
        })
    }
}

#[derive(Clone, Debug)]
pub struct ExtraTypeInfo {
    pub type_ver_from: u32,
    pub type_ver_to: u32,
    pub content_id: u32,
    pub content: String,
}

impl ExtraTypeInfo {
    fn read(cursor: &mut Cursor, chunk: &Chunk) -> SchemaResult<Self> {
        Ok(ExtraTypeInfo {
            type_ver_from: cursor.read_u32(chunk)?,
            type_ver_to: cursor.read_u32(chunk)?,
            content_id: cursor.read_u32(chunk)?,
            content: cursor.read_string(chunk)?,
        })
    }
}

/// The four lists that make up both the header's schema and the footer's
/// schema extension (spec §4.3: "structurally identical").
#[derive(Clone, Debug, Default)]
pub struct SchemaLists {
    pub fields: Vec<FieldRecord>,
    pub columns: Vec<ColumnRecord>,
    pub alias_columns: Vec<AliasColumn>,
    pub extra_type_info: Vec<ExtraTypeInfo>,
}

impl SchemaLists {
    /// Reads the four lists in field/column/alias/extra-type-info order,
    /// numbering ids starting at `field_id_base`/`column_id_base` so an
    /// extension's records continue past the header's (spec §4.3).
    pub fn read(
        cursor: &mut Cursor,
        chunk: &Chunk,
        field_id_base: u32,
        column_id_base: u32,
    ) -> SchemaResult<Self> {
        let mut next_field_id = field_id_base;
        let fields = read_list_of_records(cursor, chunk, |c, ch| {
            let id = next_field_id;
            next_field_id += 1;
            Ok(FieldRecord::read(c, ch, id)?)
        })?;

        let mut next_column_id = column_id_base;
        let columns = read_list_of_records(cursor, chunk, |c, ch| {
            let id = next_column_id;
            next_column_id += 1;
            Ok(ColumnRecord::read(c, ch, id)?)
        })?;

        let alias_columns = read_list_of_records(cursor, chunk, |c, ch| Ok(AliasColumn::read(c, ch)?))?;
        let extra_type_info = read_list_of_records(cursor, chunk, |c, ch| Ok(ExtraTypeInfo::read(c, ch)?))?;

        Ok(SchemaLists {
            fields,
            columns,
            alias_columns,
            extra_type_info,
        })
    }
}

/// The full header envelope payload (spec §4.3): feature flag, writer tag,
/// three identifying strings, then the schema lists.
#[derive(Clone, Debug)]
pub struct HeaderPayload {
    pub feature_flag: u64,
    pub writer_tag: u32,
    pub name: String,
    pub description: String,
    pub writer_identifier: String,
    pub schema: SchemaLists,
}

impl HeaderPayload {
    pub fn read(cursor: &mut Cursor, chunk: &Chunk) -> SchemaResult<Self> {
        let feature_flag = cursor.read_u64(chunk)?;
        let writer_tag = cursor.read_u32(chunk)?;
        let name = cursor.read_string(chunk)?;
        let description = cursor.read_string(chunk)?;
        let writer_identifier = cursor.read_string(chunk)?;
        let schema = SchemaLists::read(cursor, chunk, 0, 0)?;
        Ok(HeaderPayload {
            feature_flag,
            writer_tag,
            name,
            description,
            writer_identifier,
            schema,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_list() -> Vec<u8> {
        let mut v = (-8_i32).to_le_bytes().to_vec();
        v.extend_from_slice(&0_i32.to_le_bytes());
        v
    }

    #[test]
    fn test_struct_role_rejects_unknown() {
        assert!(matches!(
            StructRole::from_u16(9),
            Err(SchemaError::UnknownStructRole(9))
        ));
    }

    #[test]
    fn test_header_payload_with_empty_schema() {
        let mut data = 0_u64.to_le_bytes().to_vec(); // feature_flag
        data.extend_from_slice(&1_u32.to_le_bytes()); // writer_tag
        for s in ["ntpl", "desc", "writer"] {
            data.extend_from_slice(&(s.len() as u32).to_le_bytes());
            data.extend_from_slice(s.as_bytes());
        }
        for _ in 0..4 {
            data.extend_from_slice(&empty_list());
        }
        let chunk = Chunk::new(0, data);
        let mut cursor = Cursor::new(0);
        let payload = HeaderPayload::read(&mut cursor, &chunk).unwrap();
        assert_eq!(payload.name, "ntpl");
        assert_eq!(payload.writer_tag, 1);
        assert!(payload.schema.fields.is_empty());
    }

    #[test]
    fn test_field_record_top_level() {
        let mut data = 1_u32.to_le_bytes().to_vec(); // field_version
        data.extend_from_slice(&1_u32.to_le_bytes()); // type_version
        data.extend_from_slice(&0_u32.to_le_bytes()); // parent_field_id == self (0)
        data.extend_from_slice(&0_u16.to_le_bytes()); // struct_role = leaf
        data.extend_from_slice(&0_u16.to_le_bytes()); // flags = 0, no repetition
        for s in ["x", "std::int32_t", "", ""] {
            data.extend_from_slice(&(s.len() as u32).to_le_bytes());
            data.extend_from_slice(s.as_bytes());
        }
        let chunk = Chunk::new(0, data);
        let mut cursor = Cursor::new(0);
        let field = FieldRecord::read(&mut cursor, &chunk, 0).unwrap();
        assert!(field.is_top_level());
        assert_eq!(field.struct_role, StructRole::Leaf);
        assert_eq!(field.repetition, 0);
    }
}
