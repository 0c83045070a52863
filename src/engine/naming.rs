use std::collections::HashSet;

/// Problems that make a column name awkward in Tableau calculated fields.
pub fn name_problems(name: &str) -> Vec<&'static str> {
    let mut problems = Vec::new();
    if name.chars().any(char::is_whitespace) {
        problems.push("contains whitespace");
    }
    if name
        .chars()
        .any(|c| !c.is_whitespace() && !(c.is_ascii_alphanumeric() || c == '_'))
    {
        problems.push("contains special characters");
    }
    problems
}

pub fn sanitize_column_name(name: &str, title_case: bool) -> String {
    // Replace anything outside [A-Za-z0-9_] with underscore
    let replaced: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    // Collapse multiple underscores
    let mut result = String::with_capacity(replaced.len());
    let mut last_was_underscore = false;
    for c in replaced.chars() {
        if c == '_' {
            if !last_was_underscore {
                result.push(c);
            }
            last_was_underscore = true;
        } else {
            result.push(c);
            last_was_underscore = false;
        }
    }

    // Trim underscores from ends
    let mut result = result.trim_matches('_').to_owned();

    if title_case {
        result = result
            .split('_')
            .map(capitalize)
            .collect::<Vec<_>>()
            .join("_");
    }

    if result.is_empty() {
        "column".to_owned()
    } else {
        result
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Sanitize every name, suffixing `_1`, `_2`, ... on collisions.
pub fn sanitize_column_names(names: &[String], title_case: bool) -> Vec<String> {
    let mut cleaned_names = Vec::with_capacity(names.len());
    let mut seen = HashSet::new();

    for name in names {
        let clean_base = sanitize_column_name(name, title_case);
        let mut clean = clean_base.clone();
        let mut count = 0;

        while seen.contains(&clean) {
            count += 1;
            clean = format!("{clean_base}_{count}");
        }

        seen.insert(clean.clone());
        cleaned_names.push(clean);
    }
    cleaned_names
}
