//! Identifier casing for generated code and file names.

use convert_case::{Case, Casing};

/// `blog_post` / `blogPost` -> `BlogPost`.
pub fn pascal_case(value: &str) -> String {
    value.to_case(Case::Pascal)
}

/// `BlogPost` -> `blog-post`.
pub fn kebab_case(value: &str) -> String {
    value.to_case(Case::Kebab)
}

/// Turn an arbitrary literal into a valid identifier.
pub fn identifier(value: &str) -> String {
    let mut out: String = value
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|ch: char| ch.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn casing() {
        assert_eq!(pascal_case("blog_post"), "BlogPost");
        assert_eq!(pascal_case("authorId"), "AuthorId");
        assert_eq!(kebab_case("BlogPost"), "blog-post");
        assert_eq!(kebab_case("User"), "user");
        assert_eq!(kebab_case("order-line item"), "order-line-item");
        assert_eq!(identifier("in-progress"), "in_progress");
        assert_eq!(identifier("1st"), "_1st");
    }
}
