//! `{{key}}` placeholder substitution.
//!
//! Rendering is one left-to-right pass over the template, so substituted
//! values are never scanned again and map order cannot change the result.
//! Placeholders without a parameter stay in the output verbatim.

use crate::models::params::Parameters;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Join statements with newlines, in the order given.
pub fn join_statements<S: AsRef<str>>(statements: &[S]) -> String {
    statements
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render(template: &str, params: &Parameters) -> String {
    if params.is_empty() {
        return template.to_string();
    }

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some((before, key, after)) = next_placeholder(rest) {
        out.push_str(before);
        match params.get(key) {
            Some(value) => out.push_str(value),
            None => {
                out.push_str(OPEN);
                out.push_str(key);
                out.push_str(CLOSE);
            }
        }
        rest = after;
    }
    out.push_str(rest);
    out
}

/// Keys referenced by the template, in first-appearance order.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    let mut rest = template;
    while let Some((_, key, after)) = next_placeholder(rest) {
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
        rest = after;
    }
    keys
}

/// Keys referenced by the template that have no parameter.
pub fn unresolved(template: &str, params: &Parameters) -> Vec<String> {
    placeholders(template)
        .into_iter()
        .filter(|k| !params.contains_key(k))
        .collect()
}

/// Split at the next `{{key}}`: (text before, key, text after).
///
/// A key never contains a brace. An opening `{{` whose body does contain one
/// is plain text, and scanning resumes one character later, so `{{{a}}}`
/// yields the key `a` between a literal `{` and `}`.
fn next_placeholder(input: &str) -> Option<(&str, &str, &str)> {
    let mut from = 0;
    loop {
        let start = from + input[from..].find(OPEN)?;
        let body = &input[start + OPEN.len()..];
        let end = body.find(CLOSE)?;
        let key = &body[..end];
        if !key.contains(|c: char| c == '{' || c == '}') {
            return Some((&input[..start], key, &body[end + CLOSE.len()..]));
        }
        from = start + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Parameters {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_render_substitutes_all_occurrences() {
        let p = params(&[("username", "svc_1"), ("password", "pw")]);
        assert_eq!(
            render("CREATE USER {{username}} PASSWORD '{{password}}'; GRANT TO {{username}};", &p),
            "CREATE USER svc_1 PASSWORD 'pw'; GRANT TO svc_1;"
        );
    }

    #[test]
    fn test_render_is_deterministic() {
        let p = params(&[("a", "1"), ("b", "2"), ("c", "3")]);
        let tpl = "{{c}}{{a}}{{b}}{{a}}";
        let first = render(tpl, &p);
        for _ in 0..10 {
            assert_eq!(render(tpl, &p), first);
        }
        assert_eq!(first, "3121");
    }

    #[test]
    fn test_render_leaves_unknown_literal() {
        let p = params(&[("username", "svc")]);
        assert_eq!(
            render("DROP {{username}} {{missing}};", &p),
            "DROP svc {{missing}};"
        );
    }

    #[test]
    fn test_render_does_not_expand_substituted_values() {
        let p = params(&[("a", "{{b}}"), ("b", "boom")]);
        assert_eq!(render("{{a}} {{b}}", &p), "{{b}} boom");
        let p = params(&[("b", "boom"), ("a", "{{b}}")]);
        assert_eq!(render("{{a}} {{b}}", &p), "{{b}} boom");
    }

    #[test]
    fn test_render_empty_params_returns_template() {
        assert_eq!(render("x {{y}}", &Parameters::new()), "x {{y}}");
    }

    #[test]
    fn test_render_unterminated_placeholder() {
        let p = params(&[("a", "1")]);
        assert_eq!(render("{{a}} {{a", &p), "1 {{a");
    }

    #[test]
    fn test_render_triple_brace() {
        let p = params(&[("a", "1")]);
        assert_eq!(render("{{{a}}}", &p), "{1}");
        assert_eq!(render("{{{{a}}}}", &p), "{{1}}");
    }

    #[test]
    fn test_render_stray_open_does_not_hide_placeholder() {
        let p = params(&[("password", "pw")]);
        assert_eq!(
            render("echo '{{' ; echo {{password}}", &p),
            "echo '{{' ; echo pw"
        );
        assert_eq!(render("a {{ b }} {{password}}", &p), "a {{ b }} pw");
        assert_eq!(placeholders("x {{ {{password}}"), vec!["password"]);
    }

    #[test]
    fn test_join_statements_preserves_order() {
        let joined = join_statements(&["b", "a", "c"]);
        assert_eq!(joined, "b\na\nc");
        assert_eq!(join_statements::<&str>(&[]), "");
    }

    #[test]
    fn test_placeholders_and_unresolved() {
        let tpl = "{{username}} {{root_password}} {{username}} {{nope}}";
        assert_eq!(placeholders(tpl), vec!["username", "root_password", "nope"]);
        let p = params(&[("username", "u"), ("root_password", "r")]);
        assert_eq!(unresolved(tpl, &p), vec!["nope"]);
    }
}
