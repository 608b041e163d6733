//! Lexical prefilter in front of class resolution
//!
//! Resolving a single identifier probes many qualified forms of it (star
//! import packages, default packages, nested class spellings). Most of the
//! forms built from Gradle and JDK package names cannot name a real class,
//! and [`can_skip_lookup`] recognises them without touching the class
//! loader.

use grove_compiler::{ClassNodeResolver, LookupResult};

const ORG_GRADLE_PSEUDO_PACKAGE: &str = "org$gradle$";
const EMBEDDED_PACKAGE_FRAGMENTS: [&str; 3] = ["$org$gradle", "$java$lang", "$groovy$lang"];
const PACKAGE_PREFIXES: [&str; 3] = ["java.", "groovy.", "org.gradle"];

/// Where the lowercase scan starts, in characters: on the second character
/// of the segment after `java.`, on the separator of `groovy.`, inside
/// `gradle` for `org.gradle`.
const SCAN_OFFSET: usize = 6;

/// Whether no class can have this binary name
pub fn can_skip_lookup(name: &str) -> bool {
    if name.starts_with(ORG_GRADLE_PSEUDO_PACKAGE) {
        return true;
    }
    if EMBEDDED_PACKAGE_FRAGMENTS
        .iter()
        .any(|fragment| name.find(fragment).is_some_and(|index| index > 0))
    {
        return true;
    }
    if PACKAGE_PREFIXES.iter().any(|prefix| name.starts_with(prefix)) {
        return dollar_after_package(name) || repeats_org_gradle(name);
    }
    false
}

/// A package-looking run of lowercase letters and dots that ends in `$`,
/// e.g. `java.lang$Foo`
fn dollar_after_package(name: &str) -> bool {
    name.chars()
        .skip(SCAN_OFFSET)
        .find(|c| !(*c == '.' || c.is_lowercase()))
        == Some('$')
}

fn repeats_org_gradle(name: &str) -> bool {
    name.get(1..).is_some_and(|rest| rest.contains("org.gradle"))
}

/// Answers not-found for names [`can_skip_lookup`] rejects and delegates
/// everything else.
#[derive(Debug)]
pub struct ShortcutClassNodeResolver<R> {
    delegate: R,
}

impl<R: ClassNodeResolver> ShortcutClassNodeResolver<R> {
    pub fn new(delegate: R) -> Self {
        Self { delegate }
    }

    pub fn delegate(&self) -> &R {
        &self.delegate
    }

    pub fn into_inner(self) -> R {
        self.delegate
    }
}

impl<R: ClassNodeResolver> ClassNodeResolver for ShortcutClassNodeResolver<R> {
    fn find_class_node(&mut self, name: &str) -> Option<LookupResult> {
        if can_skip_lookup(name) {
            return None;
        }
        self.delegate.find_class_node(name)
    }
}
