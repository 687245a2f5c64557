//! Form builder (spec §4.5).
//!
//! Walks the merged header+extension field/column records and produces an
//! abstract *form*: a tree naming how page-decoded buffers reassemble into
//! a nested record value. This module never touches a byte-range source —
//! it only consumes the schema records `schema.rs` already parsed.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::rntuple::coltype::{self, ColumnTypeError, Dtype};
use crate::rntuple::schema::{ColumnRecord, FieldRecord, StructRole};

#[derive(Error, Debug)]
pub enum FormError {
    #[error(transparent)]
    ColumnType(#[from] ColumnTypeError),
    #[error("field {field_id} (leaf) has {count} columns; leaves must have exactly 1, or exactly 2 ending in a char column")]
    UnsupportedColumnArity { field_id: u32, count: usize },
    #[error("field {0} (non-leaf) has no child field")]
    MissingChild(u32),
    #[error("field {0} is its own ancestor (cyclic parent_field_id graph)")]
    Cyclic(u32),
}

pub type FormResult<T> = Result<T, FormError>;

/// Spec §3 form node.
#[derive(Clone, Debug)]
pub enum Form {
    Numpy {
        dtype: Dtype,
        form_key: String,
    },
    ListOffset {
        offset_dtype: Dtype,
        child: Box<Form>,
        form_key: String,
        /// Set for the string special case: `child` is a char buffer rather
        /// than a general nested form (spec §4.5.1).
        is_string: bool,
    },
    Regular {
        child: Box<Form>,
        size: u64,
    },
    Record {
        children: Vec<Form>,
        field_names: Vec<String>,
        form_key: String,
    },
    Union {
        tag_dtype: Dtype,
        index_dtype: Dtype,
        children: Vec<Form>,
        form_key: String,
    },
}

impl Form {
    pub fn form_key(&self) -> Option<&str> {
        match self {
            Form::Numpy { form_key, .. } => Some(form_key),
            Form::ListOffset { form_key, .. } => Some(form_key),
            Form::Record { form_key, .. } => Some(form_key),
            Form::Union { form_key, .. } => Some(form_key),
            Form::Regular { .. } => None,
        }
    }
}

struct Schema<'a> {
    fields: &'a [FieldRecord],
    columns_by_field: HashMap<u32, Vec<&'a ColumnRecord>>,
    children_of: HashMap<u32, Vec<&'a FieldRecord>>,
}

impl<'a> Schema<'a> {
    fn new(fields: &'a [FieldRecord], columns: &'a [ColumnRecord]) -> Self {
        let mut columns_by_field: HashMap<u32, Vec<&ColumnRecord>> = HashMap::new();
        for col in columns {
            columns_by_field.entry(col.field_id).or_default().push(col);
        }
        for cols in columns_by_field.values_mut() {
            cols.sort_by_key(|c| c.column_id);
        }

        let mut children_of: HashMap<u32, Vec<&FieldRecord>> = HashMap::new();
        for field in fields {
            if !field.is_top_level() {
                children_of.entry(field.parent_field_id).or_default().push(field);
            }
        }

        Schema {
            fields,
            columns_by_field,
            children_of,
        }
    }

    fn children(&self, field_id: u32) -> &[&'a FieldRecord] {
        self.children_of.get(&field_id).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

/// Builds the root form: a `Record` over every top-level field (spec §4.5).
pub fn build_form(fields: &[FieldRecord], columns: &[ColumnRecord]) -> FormResult<Form> {
    let schema = Schema::new(fields, columns);
    let top_level: Vec<&FieldRecord> = fields.iter().filter(|f| f.is_top_level()).collect();

    let mut visited = HashSet::new();
    let mut children = Vec::with_capacity(top_level.len());
    let mut field_names = Vec::with_capacity(top_level.len());
    for field in &top_level {
        children.push(build_field_form(&schema, field, &mut visited)?);
        field_names.push(field.field_name.clone());
    }

    Ok(Form::Record {
        children,
        field_names,
        form_key: "root".to_string(),
    })
}

fn build_field_form<'a>(
    schema: &Schema<'a>,
    field: &'a FieldRecord,
    visited: &mut HashSet<u32>,
) -> FormResult<Form> {
    if !visited.insert(field.field_id) {
        return Err(FormError::Cyclic(field.field_id));
    }

    let form = match field.struct_role {
        StructRole::Leaf if field.repetition == 0 => build_leaf_form(schema, field)?,
        StructRole::Leaf => {
            // repetition > 0: Regular(child, repetition) over the sole child field.
            let child_field = schema
                .children(field.field_id)
                .first()
                .ok_or(FormError::MissingChild(field.field_id))?;
            let child = build_field_form(schema, child_field, visited)?;
            Form::Regular {
                child: Box::new(child),
                size: field.repetition,
            }
        }
        StructRole::Collection => {
            let child_field = schema
                .children(field.field_id)
                .first()
                .ok_or(FormError::MissingChild(field.field_id))?;
            let inner = build_field_form(schema, child_field, visited)?;
            let cols = schema.columns_by_field.get(&field.field_id).cloned().unwrap_or_default();
            let offset_col = cols
                .first()
                .ok_or(FormError::UnsupportedColumnArity {
                    field_id: field.field_id,
                    count: 0,
                })?;
            let info = coltype::lookup(offset_col.type_id)?;
            Form::ListOffset {
                offset_dtype: info.dtype,
                child: Box::new(inner),
                form_key: offset_form_key(field.field_id, offset_col.column_id),
                is_string: false,
            }
        }
        StructRole::Record => {
            let child_fields = schema.children(field.field_id);
            let mut children = Vec::with_capacity(child_fields.len());
            let mut field_names = Vec::with_capacity(child_fields.len());
            for child_field in child_fields {
                children.push(build_field_form(schema, child_field, visited)?);
                field_names.push(child_field.field_name.clone());
            }
            Form::Record {
                children,
                field_names,
                form_key: format!("field-{}", field.field_id),
            }
        }
        StructRole::Variant => {
            let child_fields = schema.children(field.field_id);
            let mut children = Vec::with_capacity(child_fields.len());
            for child_field in child_fields {
                children.push(build_field_form(schema, child_field, visited)?);
            }
            let cols = schema.columns_by_field.get(&field.field_id).cloned().unwrap_or_default();
            let switch_col = cols.first().ok_or(FormError::UnsupportedColumnArity {
                field_id: field.field_id,
                count: 0,
            })?;
            Form::Union {
                tag_dtype: Dtype::I8,
                index_dtype: Dtype::I64,
                children,
                form_key: format!("switch-{}", switch_col.column_id),
            }
        }
    };

    Ok(form)
}

/// Leaf column selection (spec §4.5.1).
fn build_leaf_form(schema: &Schema<'_>, field: &FieldRecord) -> FormResult<Form> {
    let empty: Vec<&ColumnRecord> = Vec::new();
    let cols = schema.columns_by_field.get(&field.field_id).unwrap_or(&empty);

    match cols.as_slice() {
        [col] => {
            let info = coltype::lookup(col.type_id)?;
            Ok(Form::Numpy {
                dtype: info.dtype,
                form_key: data_form_key(field.field_id, col.column_id),
            })
        }
        [offset_col, char_col] => {
            let char_info = coltype::lookup(char_col.type_id)?;
            if !char_info.is_char {
                return Err(FormError::UnsupportedColumnArity {
                    field_id: field.field_id,
                    count: 2,
                });
            }
            let offset_info = coltype::lookup(offset_col.type_id)?;
            Ok(Form::ListOffset {
                offset_dtype: offset_info.dtype,
                child: Box::new(Form::Numpy {
                    dtype: char_info.dtype,
                    form_key: data_form_key(field.field_id, char_col.column_id),
                }),
                form_key: offset_form_key(field.field_id, offset_col.column_id),
                is_string: true,
            })
        }
        other => Err(FormError::UnsupportedColumnArity {
            field_id: field.field_id,
            count: other.len(),
        }),
    }
}

fn data_form_key(field_id: u32, column_id: u32) -> String {
    format!("field-{field_id}-col-{column_id}")
}

fn offset_form_key(field_id: u32, column_id: u32) -> String {
    format!("field-{field_id}-col-{column_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rntuple::schema::StructRole;

    fn field(id: u32, parent: u32, role: StructRole, repetition: u64, name: &str) -> FieldRecord {
        FieldRecord {
            field_id: id,
            field_version: 0,
            type_version: 0,
            parent_field_id: parent,
            struct_role: role,
            flags: if repetition > 0 { 1 } else { 0 },
            repetition,
            field_name: name.to_string(),
            type_name: String::new(),
            type_alias: String::new(),
            description: String::new(),
        }
    }

    fn column(field_id: u32, column_id: u32, type_id: u16) -> ColumnRecord {
        ColumnRecord {
            column_id,
            type_id,
            nbits: 0,
            field_id,
            flags: 0,
        }
    }

    #[test]
    fn test_scalar_leaf() {
        let fields = vec![field(0, 0, StructRole::Leaf, 0, "x")];
        let columns = vec![column(0, 0, 10)]; // id 10 = Int32 (plain)
        let form = build_form(&fields, &columns).unwrap();
        match form {
            Form::Record { children, field_names, .. } => {
                assert_eq!(field_names, vec!["x"]);
                assert!(matches!(children[0], Form::Numpy { dtype: Dtype::I32, .. }));
            }
            _ => panic!("expected root record"),
        }
    }

    #[test]
    fn test_collection_of_leaf() {
        let fields = vec![
            field(0, 0, StructRole::Collection, 0, "v"),
            field(1, 0, StructRole::Leaf, 0, "v._0"),
        ];
        let columns = vec![column(0, 0, 1), column(1, 1, 7)]; // offset index32, Real32
        let form = build_form(&fields, &columns).unwrap();
        if let Form::Record { children, .. } = form {
            assert!(matches!(
                children[0],
                Form::ListOffset {
                    is_string: false,
                    ..
                }
            ));
        } else {
            panic!();
        }
    }

    #[test]
    fn test_string_leaf() {
        let fields = vec![field(0, 0, StructRole::Leaf, 0, "s")];
        let columns = vec![column(0, 0, 1), column(0, 1, 4)]; // index32, char
        let form = build_form(&fields, &columns).unwrap();
        if let Form::Record { children, .. } = form {
            assert!(matches!(
                children[0],
                Form::ListOffset { is_string: true, .. }
            ));
        } else {
            panic!();
        }
    }

    #[test]
    fn test_leaf_bad_arity_errors() {
        let fields = vec![field(0, 0, StructRole::Leaf, 0, "bad")];
        let columns = vec![column(0, 0, 10), column(0, 1, 11), column(0, 2, 12)];
        assert!(matches!(
            build_form(&fields, &columns),
            Err(FormError::UnsupportedColumnArity { count: 3, .. })
        ));
    }
}
