//! Keyword vocabularies for each kind of service entry.

const SERVICE: &[&str] = &[
    "alias",
    "parent",
    "class",
    "shared",
    "synthetic",
    "lazy",
    "public",
    "abstract",
    "deprecated",
    "factory",
    "file",
    "arguments",
    "properties",
    "configurator",
    "calls",
    "tags",
    "decorates",
    "decoration_inner_name",
    "decoration_priority",
    "autowire",
    "autowiring_types",
    "getters",
    "inherit_tags",
];

const PROTOTYPE: &[&str] = &[
    "resource",
    "parent",
    "shared",
    "lazy",
    "public",
    "abstract",
    "deprecated",
    "factory",
    "arguments",
    "properties",
    "getters",
    "configurator",
    "calls",
    "tags",
    "inherit_tags",
    "autowire",
];

const INSTANCEOF: &[&str] = &[
    "shared",
    "lazy",
    "public",
    "abstract",
    "deprecated",
    "factory",
    "arguments",
    "properties",
    "getters",
    "configurator",
    "calls",
    "tags",
    "autowire",
];

const DEFAULTS: &[&str] = &["public", "tags", "inherit_tags", "autowire"];

/// The kind of entry whose keys are being checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    /// An ordinary service definition.
    Service,
    /// A definition carrying a `resource` glob.
    Prototype,
    /// A fragment inside `_instanceof`.
    Instanceof,
    /// The `_defaults` block.
    Defaults,
}

impl Context {
    /// Keys accepted in this context.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Context::Service => SERVICE,
            Context::Prototype => PROTOTYPE,
            Context::Instanceof => INSTANCEOF,
            Context::Defaults => DEFAULTS,
        }
    }

    pub fn allows(self, key: &str) -> bool {
        self.keywords().contains(&key)
    }

    /// Whether an unknown key is an error rather than a deprecation.
    pub fn is_closed(self) -> bool {
        !matches!(self, Context::Service)
    }
}

/// Levenshtein distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a_len = a.chars().count();
    let b_len = b.chars().count();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev_row: Vec<usize> = (0..=b_len).collect();
    let mut curr_row = vec![0; b_len + 1];

    for (i, a_char) in a.chars().enumerate() {
        curr_row[0] = i + 1;
        for (j, b_char) in b.chars().enumerate() {
            let cost = if a_char == b_char { 0 } else { 1 };
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_len]
}

/// Find the most similar keyword, if one is close enough.
pub fn suggest_similar(unknown: &str, valid: &[&'static str]) -> Option<&'static str> {
    let unknown_lower = unknown.to_lowercase();
    valid
        .iter()
        .filter_map(|v| {
            let dist = levenshtein(&unknown_lower, v);
            // At most 2 edits, and fewer than the key is long.
            if dist <= 2 && dist < unknown.len().max(1) {
                Some((*v, dist))
            } else {
                None
            }
        })
        .min_by_key(|(_, d)| *d)
        .map(|(v, _)| v)
}
