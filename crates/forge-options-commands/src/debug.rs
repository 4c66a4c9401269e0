//! Dumps the effective option values of a record, field by field.

use std::io::{self, Write as _};

use anstyle::{AnsiColor, Color, Style};
use forge_options::{DescribeFields, FieldAccess, FieldDescriptor, InvocationContext, PrimitiveValue};

const INDENT: &str = "  ";
const GROUP: Style = Style::new().bold();
const STRING: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan)));
const BOOL: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Yellow)));
const NUMBER: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green)));
const SECRET: Style = Style::new()
    .bg_color(Some(Color::Ansi(AnsiColor::Cyan)))
    .fg_color(None);

/// Prints every field's resolved value, indenting nested groups (struct and polymorphic fields)
/// under their own heading so it's clear which group a value belongs to.
///
/// # Errors
///
/// Propagates I/O errors from `out`.
pub fn print_debug<R: DescribeFields>(record: &R, ctx: &InvocationContext, out: &mut dyn io::Write) -> io::Result<()> {
    for field in R::fields() {
        if !field.is_visible() {
            continue;
        }
        write_field(out, record, field, ctx, 0)?;
    }
    Ok(())
}

fn write_field<R>(
    out: &mut dyn io::Write,
    record: &R,
    field: &FieldDescriptor<R>,
    ctx: &InvocationContext,
    indent: usize,
) -> io::Result<()> {
    let pad = INDENT.repeat(indent);
    match &field.access {
        FieldAccess::Primitive { get, .. } => {
            writeln!(out, "{pad}{} = {}", field.name, styled_primitive(&get(record)))
        }
        FieldAccess::Vector(ops) => {
            writeln!(out, "{pad}{} = [{}]", field.name, ops.serialize(record, ctx))
        }
        FieldAccess::Struct(ops) => {
            writeln!(out, "{pad}{GROUP}{}{GROUP:#}:", field.name)?;
            writeln!(out, "{pad}{INDENT}{}", ops.serialize(record, ctx))
        }
        FieldAccess::Polymorphic(ops) => {
            let id = ops.serialize(record, ctx, true);
            if id.is_empty() {
                writeln!(out, "{pad}{GROUP}{}{GROUP:#} = (unset)", field.name)
            } else {
                writeln!(out, "{pad}{GROUP}{}{GROUP:#} = {id} {{ {} }}", field.name, ops.serialize(record, ctx, false))
            }
        }
        FieldAccess::Custom { serialize, .. } => {
            writeln!(out, "{pad}{} = {}", field.name, serialize(record, ctx))
        }
    }
}

fn styled_primitive(value: &PrimitiveValue) -> String {
    match value {
        PrimitiveValue::Bool(val) => format!("{BOOL}{val}{BOOL:#}"),
        PrimitiveValue::Str(val) => format!("{STRING}{val:?}{STRING:#}"),
        PrimitiveValue::Secret(_) => format!("{SECRET}[REDACTED]{SECRET:#}"),
        other => format!("{NUMBER}{other}{NUMBER:#}"),
    }
}

/// Builds a JSON tree mirroring [`print_debug`]'s output, for tooling that wants a machine-readable
/// dump instead of (or alongside) the terminal rendering.
pub fn to_json<R: DescribeFields>(record: &R, ctx: &InvocationContext) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for field in R::fields() {
        if !field.is_visible() {
            continue;
        }
        map.insert(field.name.to_owned(), field_to_json(record, field, ctx));
    }
    serde_json::Value::Object(map)
}

fn field_to_json<R>(record: &R, field: &FieldDescriptor<R>, ctx: &InvocationContext) -> serde_json::Value {
    match &field.access {
        FieldAccess::Primitive { get, .. } => primitive_to_json(&get(record)),
        FieldAccess::Vector(ops) => serde_json::Value::String(ops.serialize(record, ctx)),
        FieldAccess::Struct(ops) => serde_json::Value::String(ops.serialize(record, ctx)),
        FieldAccess::Polymorphic(ops) => serde_json::Value::String(ops.serialize(record, ctx, false)),
        FieldAccess::Custom { serialize, .. } => serde_json::Value::String(serialize(record, ctx)),
    }
}

fn primitive_to_json(value: &PrimitiveValue) -> serde_json::Value {
    match value {
        PrimitiveValue::Bool(val) => serde_json::Value::Bool(*val),
        PrimitiveValue::I8(val) => serde_json::json!(val),
        PrimitiveValue::I16(val) => serde_json::json!(val),
        PrimitiveValue::I32(val) => serde_json::json!(val),
        PrimitiveValue::I64(val) => serde_json::json!(val),
        PrimitiveValue::U8(val) => serde_json::json!(val),
        PrimitiveValue::U16(val) => serde_json::json!(val),
        PrimitiveValue::U32(val) => serde_json::json!(val),
        PrimitiveValue::U64(val) => serde_json::json!(val),
        PrimitiveValue::Size(val) => serde_json::json!(val),
        PrimitiveValue::Str(val) => serde_json::Value::String(val.clone()),
        PrimitiveValue::Secret(_) => serde_json::Value::String("[REDACTED]".to_owned()),
        PrimitiveValue::Double(val) => serde_json::Number::from_f64(*val)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        _ => serde_json::Value::String(value.to_string()),
    }
}

/// Writes `value` as indented, syntax-highlighted JSON.
///
/// # Errors
///
/// Propagates I/O errors from `out`.
pub fn print_json(value: &serde_json::Value, out: &mut dyn io::Write) -> io::Result<()> {
    write_json_value(out, value, 0)?;
    writeln!(out)
}

fn write_json_value(out: &mut dyn io::Write, value: &serde_json::Value, indent: usize) -> io::Result<()> {
    match value {
        serde_json::Value::Null => write!(out, "null"),
        serde_json::Value::Bool(val) => write!(out, "{BOOL}{val}{BOOL:#}"),
        serde_json::Value::Number(val) => write!(out, "{NUMBER}{val}{NUMBER:#}"),
        serde_json::Value::String(val) => write!(out, "{STRING}{val:?}{STRING:#}"),
        serde_json::Value::Array(items) => {
            if items.is_empty() {
                return write!(out, "[]");
            }
            writeln!(out, "[")?;
            for (i, item) in items.iter().enumerate() {
                write!(out, "{:indent$}  ", "")?;
                write_json_value(out, item, indent + 2)?;
                writeln!(out, "{}", if i + 1 < items.len() { "," } else { "" })?;
            }
            write!(out, "{:indent$}]", "")
        }
        serde_json::Value::Object(entries) => {
            if entries.is_empty() {
                return write!(out, "{{}}");
            }
            writeln!(out, "{{")?;
            for (i, (key, val)) in entries.iter().enumerate() {
                write!(out, "{:indent$}  {key:?}: ", "")?;
                write_json_value(out, val, indent + 2)?;
                writeln!(out, "{}", if i + 1 < entries.len() { "," } else { "" })?;
            }
            write!(out, "{:indent$}}}", "")
        }
    }
}

#[cfg(test)]
mod tests {
    use forge_options::{ConfigurableObject, DescriptorFlags, OptionRecord, PrimitiveCodable, Verification};

    use super::*;

    #[derive(Debug, Clone, Default)]
    struct Leaf {
        capacity: u32,
        label: String,
    }

    impl DescribeFields for Leaf {
        fn fields() -> &'static [FieldDescriptor<Self>] {
            static FIELDS: std::sync::OnceLock<Vec<FieldDescriptor<Leaf>>> = std::sync::OnceLock::new();
            FIELDS.get_or_init(|| {
                vec![
                    FieldDescriptor {
                        name: "capacity",
                        aliases: &[],
                        help: "",
                        tag: <u32 as PrimitiveCodable>::tag(),
                        verification: Verification::Normal,
                        flags: DescriptorFlags::NONE,
                        access: FieldAccess::Primitive {
                            get: |record: &Leaf| PrimitiveValue::U32(record.capacity),
                            set: |record: &mut Leaf, value| {
                                record.capacity = <u32 as PrimitiveCodable>::from_primitive(value)?;
                                Ok(())
                            },
                        },
                    },
                    FieldDescriptor {
                        name: "label",
                        aliases: &[],
                        help: "",
                        tag: <String as PrimitiveCodable>::tag(),
                        verification: Verification::Normal,
                        flags: DescriptorFlags::NONE,
                        access: FieldAccess::Primitive {
                            get: |record: &Leaf| PrimitiveValue::Str(record.label.clone()),
                            set: |record: &mut Leaf, value| {
                                record.label = <String as PrimitiveCodable>::from_primitive(value)?;
                                Ok(())
                            },
                        },
                    },
                ]
            })
        }
    }

    #[test]
    fn prints_every_field() {
        let mut record = OptionRecord::new(Leaf::default());
        let ctx = InvocationContext::top_level();
        record.configure_from_string("capacity=4;label=north", &ctx).unwrap();

        let mut out = Vec::new();
        print_debug(record.get(), &ctx, &mut out).unwrap();
        let rendered = String::from_utf8(out).unwrap();
        assert!(rendered.contains("capacity ="));
        assert!(rendered.contains("label ="));
    }

    #[test]
    fn json_dump_matches_field_values() {
        let mut record = OptionRecord::new(Leaf::default());
        let ctx = InvocationContext::top_level();
        record.configure_from_string("capacity=4;label=north", &ctx).unwrap();

        let json = to_json(record.get(), &ctx);
        assert_eq!(json["capacity"], serde_json::json!(4));
        assert_eq!(json["label"], serde_json::json!("north"));
    }

    #[test]
    fn json_renders_without_panicking() {
        let mut record = OptionRecord::new(Leaf::default());
        let ctx = InvocationContext::top_level();
        record.configure_from_string("capacity=4;label=north", &ctx).unwrap();

        let json = to_json(record.get(), &ctx);
        let mut out = Vec::new();
        print_json(&json, &mut out).unwrap();
        assert!(!out.is_empty());
    }
}
