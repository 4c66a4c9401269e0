//! End-to-end scenarios driving the engine through its public surface: derive a struct, configure
//! it from text, serialize it back, compare two trees, and push a value through the Prepare/
//! Validate lifecycle. Unlike the per-module unit tests, these never reach into `group`/`lexer`
//! directly -- everything goes through `ConfigurableObject`/`OptionRecord`/`DescribeFields` the way
//! an embedder of the engine would use it.

use assert_matches::assert_matches;
use forge_options::{
    ConfigErrorKind, ConfigurableObject, Customizable, IdentifiedRecord, InvocationContext, ObjectRegistry,
    OptionRecord, Pattern, PolymorphicSlot, SanityLevel,
};
use forge_options_derive::ConfigurableOptions;
use proptest::prelude::*;

#[test]
fn ui() {
    let t = trybuild::TestCases::new();
    t.compile_fail("tests/ui/derives/*.rs");
}

#[derive(Debug, Clone, Default, ConfigurableOptions)]
struct Flat {
    #[option(help = "first value")]
    a: i32,
    #[option(help = "second value")]
    b: i32,
}

#[derive(Debug, Clone, Default, ConfigurableOptions)]
struct Nested {
    x: i32,
    y: i32,
}

#[derive(Debug, Clone, Default, ConfigurableOptions)]
struct WithStruct {
    #[option(struct)]
    s: Nested,
}

#[derive(Debug, Clone, Default, ConfigurableOptions)]
struct WithVectorInt {
    #[option(vector(separator = ':'))]
    v: Vec<i32>,
}

#[derive(Debug, Clone, Default, ConfigurableOptions)]
struct WithVectorStr {
    #[option(vector(separator = ':'))]
    v: Vec<String>,
}

#[derive(Debug, Clone, Default, ConfigurableOptions)]
struct Backend {
    p: i32,
}

#[derive(Debug, Clone, Default, ConfigurableOptions)]
struct WithChild {
    #[option(polymorphic(namespace = "backend"))]
    child: PolymorphicSlot,
}

fn backend_registry() -> ObjectRegistry {
    let mut registry = ObjectRegistry::new();
    for id in ["A", "B"] {
        registry.register("backend", Pattern::Exact(id.to_owned()), move |id, _ctx| {
            Ok(Box::new(IdentifiedRecord::new(id, Backend::default())) as Box<dyn Customizable>)
        });
    }
    registry
}

// S1: a flat record round-trips a plain `a=1;b=2` string through Configure/GetOptionString.
#[test]
fn s1_flat_record_round_trips() {
    let mut record = OptionRecord::new(Flat::default());
    let ctx = InvocationContext::top_level();
    record.configure_from_string("a=1;b=2", &ctx).unwrap();
    assert_eq!(record.get().a, 1);
    assert_eq!(record.get().b, 2);
    assert_eq!(record.get_option_string(&ctx), "a=1;b=2");
}

// S2: a struct field accepts a brace-wrapped block and serializes back wrapped the same way.
#[test]
fn s2_struct_field_round_trips_brace_block() {
    let mut record = OptionRecord::new(WithStruct::default());
    let ctx = InvocationContext::top_level();
    record.configure_from_string("s={x=3;y=4}", &ctx).unwrap();
    assert_eq!(record.get().s.x, 3);
    assert_eq!(record.get().s.y, 4);
    assert_eq!(record.get_option_string(&ctx), "s={x=3;y=4}");
}

// S3: a dotted path updates one sub-field of an already-configured struct, leaving its sibling
// untouched.
#[test]
fn s3_dotted_path_partially_updates_struct() {
    let mut record = OptionRecord::new(WithStruct::default());
    let ctx = InvocationContext::top_level();
    record.configure_from_string("s={x=3;y=4}", &ctx).unwrap();
    record.configure_from_string("s.x=7", &ctx).unwrap();
    assert_eq!(record.get().s.x, 7);
    assert_eq!(record.get().s.y, 4);
}

// S4: a vector field parses a delimiter-separated list, and an element containing `=` forces the
// whole rendered list into a brace-wrapped block so it survives re-parsing.
#[test]
fn s4_vector_field_round_trips_and_escapes_when_needed() {
    let mut record = OptionRecord::new(WithVectorInt::default());
    let ctx = InvocationContext::top_level();
    record.configure_from_string("v=1:2:3", &ctx).unwrap();
    assert_eq!(record.get().v, vec![1, 2, 3]);
    assert_eq!(record.get_option_string(&ctx), "v=1:2:3");

    let mut record = OptionRecord::new(WithVectorStr::default());
    record.configure_from_string("v=a=b:plain", &ctx).unwrap();
    assert_eq!(record.get().v, vec!["a=b".to_owned(), "plain".to_owned()]);
    assert_eq!(record.get_option_string(&ctx), "v={a\\=b:plain}");
}

// S5: swapping a polymorphic slot's `id` drops the previous child and constructs a fresh one from
// its own defaults, rather than reusing the old child's field values.
#[test]
fn s5_polymorphic_swap_replaces_child_wholesale() {
    let mut record = OptionRecord::new(WithChild::default());
    let ctx = InvocationContext::top_level().with_registry(backend_registry());
    record.configure_from_string("child={id=A;p=1}", &ctx).unwrap();
    assert_eq!(record.get_option_string(&ctx), "child={id=A;p=1}");

    record.configure_from_string("child={id=B}", &ctx).unwrap();
    assert_eq!(record.get_option_string(&ctx), "child={id=B;p=0}");
}

// S6: an unknown key is either collected (when ignored) or fails fast with `InvalidArgument`
// naming the offending key.
#[test]
fn s6_unknown_option_is_ignored_or_rejected() {
    let mut record = OptionRecord::new(Flat::default());
    let ctx = InvocationContext::top_level().with_ignore_unknown_options(true);
    let unused = record.configure_from_string("bogus=1", &ctx).unwrap();
    assert_eq!(unused, vec!["bogus".to_owned()]);

    let mut record = OptionRecord::new(Flat::default());
    let ctx = InvocationContext::top_level().with_ignore_unknown_options(false);
    let err = record.configure_from_string("bogus=1", &ctx).unwrap_err();
    assert_matches!(err.kind(), ConfigErrorKind::InvalidArgument);
    assert!(err.to_string().contains("bogus"));
}

// S7: comparing two trees that differ inside a nested struct reports the dotted path down to the
// mismatching leaf, not just the top-level field name.
#[test]
fn s7_mismatch_reports_dotted_path() {
    let ctx = InvocationContext::top_level();
    let mut a = OptionRecord::new(WithStruct::default());
    a.configure_from_string("s={x=1;y=2}", &ctx).unwrap();
    let mut b = OptionRecord::new(WithStruct::default());
    b.configure_from_string("s={x=1;y=9}", &ctx).unwrap();
    let err = a.matches(&b, &ctx).unwrap_err();
    assert_eq!(err, "s.y");
}

// Property: round-trip. Configuring from a serialized tree and re-serializing yields the same
// string, for any pair of integers.
proptest! {
    #[test]
    fn property_round_trip_is_stable(a in any::<i32>(), b in any::<i32>()) {
        let ctx = InvocationContext::top_level();
        let mut record = OptionRecord::new(Flat::default());
        record.configure_from_string(&format!("a={a};b={b}"), &ctx).unwrap();
        let rendered = record.get_option_string(&ctx);
        let mut reparsed = OptionRecord::new(Flat::default());
        reparsed.configure_from_string(&rendered, &ctx).unwrap();
        prop_assert_eq!(reparsed.get_option_string(&ctx), rendered);
    }
}

// Property: idempotence. Applying the same option string twice leaves the tree exactly where the
// first application did.
proptest! {
    #[test]
    fn property_reapplying_same_string_is_idempotent(a in any::<i32>(), b in any::<i32>()) {
        let ctx = InvocationContext::top_level();
        let text = format!("a={a};b={b}");
        let mut record = OptionRecord::new(Flat::default());
        record.configure_from_string(&text, &ctx).unwrap();
        let once = record.get_option_string(&ctx);
        record.configure_from_string(&text, &ctx).unwrap();
        prop_assert_eq!(record.get_option_string(&ctx), once);
    }
}

// Property: grammar tolerance. Whitespace around keys/values and doubled outer braces parse to the
// same result as the canonical form.
#[test]
fn property_grammar_tolerates_whitespace_and_doubled_braces() {
    let ctx = InvocationContext::top_level();
    let mut canonical = OptionRecord::new(Flat::default());
    canonical.configure_from_string("a=1;b=2", &ctx).unwrap();

    let mut loose = OptionRecord::new(Flat::default());
    loose.configure_from_string("  { { a = 1 ; b = 2 } }  ", &ctx).unwrap();

    assert_eq!(canonical.get_option_string(&ctx), loose.get_option_string(&ctx));
}

#[derive(Debug, Clone, Default, ConfigurableOptions)]
struct Inner {
    value: i32,
}

#[derive(Debug, Clone, Default, ConfigurableOptions)]
struct Middle {
    #[option(struct)]
    inner: Inner,
}

#[derive(Debug, Clone, Default, ConfigurableOptions)]
struct Outer {
    #[option(struct)]
    middle: Middle,
}

// Property: nesting. A multi-level chain of single-field structs still resolves a dotted path all
// the way to its leaf, and serializes back with one brace layer per level.
#[test]
fn property_nesting_resolves_multi_level_dotted_paths() {
    let mut record = OptionRecord::new(Outer::default());
    let ctx = InvocationContext::top_level();
    record.configure_from_string("middle.inner.value=5", &ctx).unwrap();
    assert_eq!(record.get().middle.inner.value, 5);
    assert_eq!(record.get_option_string(&ctx), "middle={inner={value=5}}");
}

#[derive(Debug, Clone, Default, ConfigurableOptions)]
struct WithLooseField {
    exact: i32,
    #[option(compare_loose)]
    loose: i32,
}

// Property: sanity levels. A `CompareLoose`-flagged field is only checked at `ExactMatch`; an
// unflagged sibling is always checked regardless of sanity level.
#[test]
fn property_sanity_levels_gate_only_loose_fields() {
    let ctx = InvocationContext::top_level();
    let mut a = OptionRecord::new(WithLooseField::default());
    a.configure_from_string("exact=1;loose=1", &ctx).unwrap();
    let mut b = OptionRecord::new(WithLooseField::default());
    b.configure_from_string("exact=1;loose=2", &ctx).unwrap();

    let loose_ctx = InvocationContext::top_level().with_sanity_level(SanityLevel::LooselyCompatible);
    assert!(a.matches(&b, &loose_ctx).is_ok());

    let exact_ctx = InvocationContext::top_level().with_sanity_level(SanityLevel::ExactMatch);
    assert_eq!(a.matches(&b, &exact_ctx).unwrap_err(), "loose");

    let mut c = OptionRecord::new(WithLooseField::default());
    c.configure_from_string("exact=9;loose=1", &ctx).unwrap();
    assert_eq!(a.matches(&c, &loose_ctx).unwrap_err(), "exact");
}

// Property: polymorphic identity. Two trees holding differently-identified children never compare
// equal, even when their nested option strings happen to coincide.
#[test]
fn property_polymorphic_identity_is_part_of_equality() {
    let ctx = InvocationContext::top_level().with_registry(backend_registry());
    let mut a = OptionRecord::new(WithChild::default());
    a.configure_from_string("child={id=A;p=1}", &ctx).unwrap();
    let mut b = OptionRecord::new(WithChild::default());
    b.configure_from_string("child={id=B;p=1}", &ctx).unwrap();
    assert_eq!(a.matches(&b, &ctx), Err("child.id".to_owned()));
}

// Property: lifecycle gating. `ValidateOptions` refuses to run before a successful
// `PrepareOptions`, and succeeds immediately after one does.
#[test]
fn property_validate_is_gated_by_prepare_lifecycle() {
    let mut record = OptionRecord::new(Flat::default());
    let ctx = InvocationContext::top_level();
    let err = record.validate_options(&ctx).unwrap_err();
    assert_matches!(err.kind(), ConfigErrorKind::NotSupported);

    record.prepare_options(&ctx).unwrap();
    assert!(record.validate_options(&ctx).is_ok());
}
