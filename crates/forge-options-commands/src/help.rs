//! Human-readable dumps of a record's field descriptors.

use std::io::{self, Write as _};

use anstyle::{AnsiColor, Color, Style};
use forge_options::{DescribeFields, FieldAccess, FieldDescriptor, TypeTag};

const INDENT: &str = "  ";
const NAME: Style = Style::new().bold();
const DIMMED: Style = Style::new().dimmed();
const FIELD: Style = Style::new().underline();
const FLAGS: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan)));

/// Prints help for every visible field of `R`, in declaration order.
///
/// Deprecated and alias descriptors are skipped -- they exist for backward-compatible parsing,
/// not as part of the surface a user should configure against. `filter` narrows the listing to
/// field names containing a substring (an empty filter matches everything).
///
/// # Errors
///
/// Propagates I/O errors from `out`.
pub fn print_help<R: DescribeFields>(out: &mut dyn io::Write, filter: &str) -> io::Result<()> {
    for field in R::fields() {
        if !field.is_visible() || !field.name.contains(filter) {
            continue;
        }
        write_descriptor(out, field)?;
        writeln!(out)?;
    }
    Ok(())
}

fn write_descriptor<R>(out: &mut dyn io::Write, field: &FieldDescriptor<R>) -> io::Result<()> {
    writeln!(out, "{NAME}{}{NAME:#}", field.name)?;
    for alias in field.aliases {
        writeln!(out, "{DIMMED}alias:{DIMMED:#} {alias}")?;
    }

    writeln!(out, "{INDENT}{FIELD}Type{FIELD:#}: {}", describe_tag(&field.access, &field.tag))?;

    let flags = field.flags.to_string();
    if flags != "none" {
        writeln!(out, "{INDENT}{FIELD}Flags{FIELD:#}: {FLAGS}{flags}{FLAGS:#}")?;
    }

    if !field.help.is_empty() {
        for line in field.help.lines() {
            writeln!(out, "{INDENT}{line}")?;
        }
    }
    Ok(())
}

fn describe_tag<R>(access: &FieldAccess<R>, tag: &TypeTag) -> String {
    match access {
        FieldAccess::Vector(_) => format!("{tag} (vector)"),
        _ => tag.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use forge_options::{
        ConfigurableObject, DescriptorFlags, InvocationContext, OptionRecord, PrimitiveCodable, PrimitiveValue, Verification,
    };

    use super::*;

    #[derive(Debug, Clone, Default)]
    struct Leaf {
        capacity: u32,
    }

    impl DescribeFields for Leaf {
        fn fields() -> &'static [FieldDescriptor<Self>] {
            static FIELDS: std::sync::OnceLock<Vec<FieldDescriptor<Leaf>>> = std::sync::OnceLock::new();
            FIELDS.get_or_init(|| {
                vec![FieldDescriptor {
                    name: "capacity",
                    aliases: &["cap"],
                    help: "maximum number of entries",
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
                }]
            })
        }
    }

    #[test]
    fn prints_name_type_and_help() {
        let mut out = Vec::new();
        print_help::<Leaf>(&mut out, "").unwrap();
        let rendered = strip_ansi(&out);
        assert!(rendered.contains("capacity"));
        assert!(rendered.contains("alias: cap"));
        assert!(rendered.contains("maximum number of entries"));
    }

    #[test]
    fn filter_narrows_output() {
        let mut out = Vec::new();
        print_help::<Leaf>(&mut out, "nonexistent").unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn record_round_trips_through_help_visible_fields() {
        let record = OptionRecord::new(Leaf::default());
        let ctx = InvocationContext::top_level();
        assert!(record.get_option_string(&ctx).is_empty() || record.get_option_string(&ctx).contains("capacity"));
    }

    fn strip_ansi(bytes: &[u8]) -> String {
        let text = String::from_utf8_lossy(bytes);
        let mut out = String::new();
        let mut in_escape = false;
        for ch in text.chars() {
            if ch == '\u{1b}' {
                in_escape = true;
                continue;
            }
            if in_escape {
                if ch == 'm' {
                    in_escape = false;
                }
                continue;
            }
            out.push(ch);
        }
        out
    }
}
