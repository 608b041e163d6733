//! Properties that hold for every input, plus the log lines a compile emits

use std::io;
use std::sync::Arc;

use grove_compiler::{ClassNodeResolver, DefaultClassNodeResolver, NoOpResourceLoader};
use grove_runtime::SystemClassLoader;
use grove_scripts::{
    can_skip_lookup, metadata, DefaultImportsReader, DefaultScriptCompilationHandler, ScriptCompilationHandler,
    ScriptFlags, ShortcutClassNodeResolver, StringScriptSource,
};
use parking_lot::Mutex;
use proptest::prelude::*;
use tracing_subscriber::fmt::MakeWriter;

fn resolver() -> DefaultClassNodeResolver {
    DefaultClassNodeResolver::new(Arc::new(SystemClassLoader::new()), Arc::new(NoOpResourceLoader))
}

/// Names shaped like the probes class resolution generates
fn probe_name() -> impl Strategy<Value = String> {
    let package = prop::sample::select(vec![
        "", "java.", "java.lang.", "java.util.", "java.io.", "java.math.", "groovy.", "groovy.lang.",
        "org.gradle", "org.gradle.", "org.gradle.api.", "org$gradle$", "a.b.",
    ]);
    let segment = prop::sample::select(vec![
        "String", "Map", "Map$Entry", "Entry", "Script", "Object", "lang", "util", "$java$lang",
        "$org$gradle", "$groovy$lang", "org.gradle", "$Inner", "x", ".", "$", "api",
    ]);
    (package, prop::collection::vec(segment, 1..4))
        .prop_map(|(package, segments)| format!("{}{}", package, segments.concat()))
}

proptest! {
    #[test]
    fn prefilter_only_rejects_unresolvable_names(name in probe_name()) {
        if can_skip_lookup(&name) {
            prop_assert!(resolver().find_class_node(&name).is_none(), "{} resolves", name);
        }
    }

    #[test]
    fn prefilter_agrees_with_plain_resolver_on_hits(name in probe_name()) {
        let mut plain = resolver();
        let mut filtered = ShortcutClassNodeResolver::new(resolver());
        let expected = plain.find_class_node(&name).and_then(|r| r.class().map(|c| c.name().to_string()));
        let actual = filtered.find_class_node(&name).and_then(|r| r.class().map(|c| c.name().to_string()));
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn flags_round_trip(is_empty: bool, has_methods: bool, reserved in 0u8..64) {
        let flags = ScriptFlags::new(is_empty, has_methods);
        prop_assert_eq!(ScriptFlags::from_byte(flags.to_byte()), flags);
        prop_assert_eq!(ScriptFlags::from_byte(flags.to_byte() | (reserved << 2)), flags);
    }
}

#[test]
fn test_platform_classes_are_never_rejected() {
    for name in [
        "java.lang.String",
        "java.lang.Object",
        "java.util.Map",
        "java.util.Map$Entry",
        "java.math.BigDecimal",
        "groovy.lang.Script",
        "groovy.lang.GroovyObject",
    ] {
        assert!(!can_skip_lookup(name), "{} rejected", name);
        assert!(ShortcutClassNodeResolver::new(resolver()).find_class_node(name).is_some());
    }
}

#[test]
fn test_compiling_twice_writes_identical_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let (classes, meta) = (dir.path().join("classes"), dir.path().join("meta"));
    let system = Arc::new(SystemClassLoader::new());
    let base = system.script_class();
    let handler = DefaultScriptCompilationHandler::new(
        Arc::new(grove_runtime::DefaultClassLoaderCache::new()),
        &DefaultImportsReader::new().unwrap(),
    );

    for text in ["", "def foo() {}", "println 1", "def foo() {}\nfoo()"] {
        let source = StringScriptSource::new("script 'law'", text).with_class_name("law_1");
        let mut outputs = Vec::new();
        for _ in 0..2 {
            handler
                .compile_to_dir::<()>(&source, system.clone(), &classes, &meta, None, &base, None)
                .unwrap();
            outputs.push(std::fs::read(metadata::metadata_file(&meta)).unwrap());
        }
        assert_eq!(outputs[0], outputs[1], "{:?}", text);
    }
}

#[derive(Clone, Default)]
struct SharedWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl SharedWriter {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }
}

struct SharedWriterGuard<'a> {
    buffer: &'a Mutex<Vec<u8>>,
}

impl io::Write for SharedWriterGuard<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for SharedWriter {
    type Writer = SharedWriterGuard<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        SharedWriterGuard { buffer: &self.buffer }
    }
}

#[test]
fn test_compile_logs() {
    let writer = SharedWriter::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let dir = tempfile::tempdir().unwrap();
    let classes = dir.path().join("classes");
    let system = Arc::new(SystemClassLoader::new());
    let handler = DefaultScriptCompilationHandler::new(
        Arc::new(grove_runtime::DefaultClassLoaderCache::new()),
        &DefaultImportsReader::new().unwrap(),
    );
    let source = StringScriptSource::new("settings file 'settings.grv'", "println 1");
    handler
        .compile_to_dir::<()>(
            &source,
            system.clone(),
            &classes,
            &dir.path().join("meta"),
            None,
            &system.script_class(),
            None,
        )
        .unwrap();

    let logs = writer.contents();
    assert!(
        logs.contains("Compiling settings file 'settings.grv' using no transformer."),
        "{}",
        logs
    );
    assert!(
        logs.contains(&format!("Timing: Writing script to cache at {} took", classes.display())),
        "{}",
        logs
    );
}
