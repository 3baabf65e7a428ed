//! Identifier derivation for inferred field and type names.

use std::collections::HashSet;

/// Reserved words that get a trailing `_` when they appear as field names.
const RESERVED: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true", "type",
    "unsafe", "use", "where", "while",
];

/// Snake-case field identifier for a directory entry name.
///
/// Runs of characters outside `[0-9A-Za-z]` become a single `_`, camel
/// humps are split, and the result is lower-cased. An empty result becomes
/// `node`; a leading digit gets an `n_` prefix.
pub fn snake_case(raw: &str) -> String {
    let mut collapsed = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            collapsed.push(c);
        } else if !collapsed.ends_with('_') {
            collapsed.push('_');
        }
    }
    let trimmed = collapsed.trim_matches('_');

    let mut out = String::with_capacity(trimmed.len() + 4);
    let mut prev: Option<char> = None;
    for c in trimmed.chars() {
        if c.is_ascii_uppercase()
            && prev.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit())
        {
            out.push('_');
        }
        out.push(c.to_ascii_lowercase());
        prev = Some(c);
    }

    if out.is_empty() {
        out.push_str("node");
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert_str(0, "n_");
    }
    if RESERVED.contains(&out.as_str()) {
        out.push('_');
    }
    out
}

/// Camel-case type name for a directory name: each alphanumeric run is
/// capitalized and the rest lower-cased.
pub fn camel_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for token in raw
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
    {
        let mut chars = token.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.extend(chars.map(|c| c.to_ascii_lowercase()));
        }
    }
    with_type_fallbacks(out)
}

/// Type name from a caller-supplied override: only non-alphanumerics are
/// dropped, casing is kept.
pub fn sanitize_type_name(raw: &str) -> String {
    with_type_fallbacks(raw.chars().filter(char::is_ascii_alphanumeric).collect())
}

fn with_type_fallbacks(mut name: String) -> String {
    if name.is_empty() {
        name.push_str("Node");
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, 'N');
    }
    name
}

/// Returns `candidate`, or `candidate_2`, `candidate_3`, ... if taken,
/// and records the result as taken.
pub fn unique_field_name(taken: &mut HashSet<String>, candidate: String) -> String {
    let mut name = candidate.clone();
    let mut counter = 1;
    while taken.contains(&name) {
        counter += 1;
        name = format!("{candidate}_{counter}");
    }
    taken.insert(name.clone());
    name
}

/// Allocates type names. The first use of a base name gets it bare, later
/// uses get the lowest free numeric suffix starting at 2. No name is ever
/// issued twice, even when a suffixed name collides with another base.
#[derive(Debug, Default)]
pub struct TypeNames {
    issued: HashSet<String>,
}

/// A reserved type name, which can be handed back if the type it was
/// reserved for turns out to be a duplicate.
#[derive(Debug)]
pub struct Reservation {
    pub name: String,
}

impl TypeNames {
    pub fn reserve(&mut self, base: String) -> Reservation {
        let mut name = base.clone();
        let mut suffix = 1;
        while self.issued.contains(&name) {
            suffix += 1;
            name = format!("{base}{suffix}");
        }
        self.issued.insert(name.clone());
        Reservation { name }
    }

    pub fn release(&mut self, reservation: Reservation) {
        self.issued.remove(&reservation.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_rules() {
        assert_eq!(snake_case("run-001"), "run_001");
        assert_eq!(snake_case("MyReport.final"), "my_report_final");
        assert_eq!(snake_case("__weird  name__"), "weird_name");
        assert_eq!(snake_case("001"), "n_001");
        assert_eq!(snake_case("---"), "node");
        assert_eq!(snake_case("type"), "type_");
        assert_eq!(snake_case("HTTPServer"), "httpserver");
        assert_eq!(snake_case("grüße"), "gr_e");
    }

    #[test]
    fn camel_case_rules() {
        assert_eq!(camel_case("run-001"), "Run001");
        assert_eq!(camel_case("experiments"), "Experiments");
        assert_eq!(camel_case("MyDir"), "Mydir");
        assert_eq!(camel_case("2024_data"), "N2024Data");
        assert_eq!(camel_case("..."), "Node");
    }

    #[test]
    fn sanitize_keeps_case() {
        assert_eq!(sanitize_type_name("ExperimentBundle"), "ExperimentBundle");
        assert_eq!(sanitize_type_name("my-Bundle!"), "myBundle");
        assert_eq!(sanitize_type_name(""), "Node");
        assert_eq!(sanitize_type_name("9lives"), "N9lives");
    }

    #[test]
    fn field_names_are_disambiguated() {
        let mut taken = HashSet::new();
        assert_eq!(unique_field_name(&mut taken, "data".into()), "data");
        assert_eq!(unique_field_name(&mut taken, "data".into()), "data_2");
        assert_eq!(unique_field_name(&mut taken, "data".into()), "data_3");
    }

    #[test]
    fn type_names_count_and_release() {
        let mut names = TypeNames::default();
        let a = names.reserve("Data".into());
        assert_eq!(a.name, "Data");
        let b = names.reserve("Data".into());
        assert_eq!(b.name, "Data2");
        names.release(b);
        assert_eq!(names.reserve("Data".into()).name, "Data2");
        assert_eq!(names.reserve("Data".into()).name, "Data3");
    }

    #[test]
    fn suffixed_names_never_collide_with_other_bases() {
        let mut names = TypeNames::default();
        assert_eq!(names.reserve("Data".into()).name, "Data");
        assert_eq!(names.reserve("Data".into()).name, "Data2");
        // a directory literally called `data2` must not reuse `Data2`
        assert_eq!(names.reserve("Data2".into()).name, "Data22");
        assert_eq!(names.reserve("Data".into()).name, "Data3");
        assert_eq!(names.reserve("Data3".into()).name, "Data32");
    }
}
