//! Config text preprocessing.

/// Expand `${VAR}` and `${VAR:-fallback}` references using the process
/// environment.
///
/// An unset or empty variable expands to its fallback, or to nothing when
/// no fallback is given. An unterminated `${` is copied through verbatim.
pub fn expand_env_vars(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

/// Same as [`expand_env_vars`] with an explicit variable lookup.
pub fn expand_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let reference = &after[..end];
        let (name, fallback) = match reference.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (reference, None),
        };
        match lookup(name).filter(|value| !value.is_empty()) {
            Some(value) => out.push_str(&value),
            None => out.push_str(fallback.unwrap_or_default()),
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}
