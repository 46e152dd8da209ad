//! Field-mask path algebra and JSON name conversion.
//!
//! Paths are dotted field names such as `foo.bar`. A normalized mask is
//! sorted so that `.` orders before every other byte, and holds no path that
//! is covered by another: `["foo", "foo.bar"]` normalizes to `["foo"]`.

use std::cmp::Ordering;

/// Path order in which `.` sorts below every other byte, so that `foo`,
/// `foo.bar` and `foo_bar` sort in that order.
pub fn less_path(x: &str, y: &str) -> bool {
    compare_paths(x, y) == Ordering::Less
}

fn compare_paths(x: &str, y: &str) -> Ordering {
    for (a, b) in x.bytes().zip(y.bytes()) {
        if a != b {
            return a.wrapping_sub(b'.').cmp(&b.wrapping_sub(b'.'));
        }
    }
    x.len().cmp(&y.len())
}

/// Whether `path` is `prefix` or one of its sub-paths.
pub fn has_path_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}

/// Sort `paths` and drop every path covered by a preceding one.
pub fn normalize_in_place(paths: &mut Vec<String>) {
    paths.sort_by(|a, b| compare_paths(a, b));
    let mut kept: usize = 0;
    for i in 0..paths.len() {
        if kept > 0 && has_path_prefix(&paths[i], &paths[kept - 1]) {
            continue;
        }
        paths.swap(kept, i);
        kept += 1;
    }
    paths.truncate(kept);
}

/// Normalized copy of `paths`.
pub fn normalize(paths: &[String]) -> Vec<String> {
    let mut out = paths.to_vec();
    normalize_in_place(&mut out);
    out
}

/// Paths covered by any of `masks`, normalized.
pub fn union(masks: &[&[String]]) -> Vec<String> {
    let mut out: Vec<String> = masks.iter().flat_map(|m| m.iter().cloned()).collect();
    normalize_in_place(&mut out);
    out
}

/// Paths covered by every one of `masks`, normalized.
pub fn intersect(masks: &[&[String]]) -> Vec<String> {
    let mut out = union(masks);
    let mut operand = Vec::new();
    let mut current = Vec::new();
    for mask in masks {
        operand.clear();
        operand.extend_from_slice(mask);
        normalize_in_place(&mut operand);
        current.clear();
        current.append(&mut out);

        let (mut i, mut j) = (0, 0);
        while i < operand.len() && j < current.len() {
            let (a, b): (&String, &String) = (&operand[i], &current[j]);
            if has_path_prefix(a, b) {
                out.push(a.clone());
                i += 1;
            } else if has_path_prefix(b, a) {
                out.push(b.clone());
                j += 1;
            } else if less_path(a, b) {
                i += 1;
            } else {
                j += 1;
            }
        }
    }
    normalize_in_place(&mut out);
    out
}

/// lowerCamelCase JSON form of a snake_case path. Fails if the path would
/// not convert back unchanged.
pub fn to_camel_case(path: &str) -> Result<String, String> {
    let mut camel = String::with_capacity(path.len());
    let mut was_underscore = false;
    for c in path.chars() {
        if c != '_' {
            camel.push(if was_underscore { c.to_ascii_uppercase() } else { c });
        }
        was_underscore = c == '_';
    }
    if snake_case(&camel) != path {
        return Err(format!("path {:?} can not be written in lowerCamelCase", path));
    }
    Ok(camel)
}

/// snake_case form of a lowerCamelCase JSON path.
pub fn to_snake_case(path: &str) -> Result<String, String> {
    if path.contains('_') {
        return Err(format!("path {:?} is not in lowerCamelCase", path));
    }
    Ok(snake_case(path))
}

fn snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for c in s.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(p: &[&str]) -> Vec<String> {
        p.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn dot_sorts_first() {
        assert!(less_path("foo", "foo.bar"));
        assert!(less_path("foo.bar", "foo_bar"));
        assert!(less_path("a.b", "a!b"));
        assert!(!less_path("foo", "foo"));
        assert!(less_path("a", "b"));
    }

    #[test]
    fn prefix() {
        assert!(has_path_prefix("foo", "foo"));
        assert!(has_path_prefix("foo.bar", "foo"));
        assert!(!has_path_prefix("foo_bar", "foo"));
        assert!(!has_path_prefix("fo", "foo"));
    }

    #[test]
    fn normalize_sorts_and_elides_covered_paths() {
        let got = normalize(&paths(&["foo_bar", "foo.bar", "foo", "baz.qux", "baz.qux", "a.b.c", "a.b"]));
        assert_eq!(got, ["a.b", "baz.qux", "foo", "foo_bar"]);
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = [
            paths(&[]),
            paths(&["a"]),
            paths(&["z.y", "z", "a.b.c", "a.bc", "a.b", "a_b"]),
            paths(&["x.y.z", "x.y", "x.yz", "x"]),
        ];
        for input in inputs {
            let once = normalize(&input);
            assert_eq!(normalize(&once), once);
            assert_eq!(union(&[&input[..], &input[..]]), once);
            assert_eq!(intersect(&[&input[..], &input[..]]), once);
        }
    }

    #[test]
    fn union_and_intersect() {
        let a = paths(&["foo.bar", "baz", "qux.a"]);
        let b = paths(&["foo", "baz.x", "quux"]);
        assert_eq!(union(&[&a[..], &b[..]]), ["baz", "foo", "quux", "qux.a"]);
        assert_eq!(intersect(&[&a[..], &b[..]]), ["baz.x", "foo.bar"]);

        let c = paths(&["baz.x.y"]);
        assert_eq!(intersect(&[&a[..], &b[..], &c[..]]), ["baz.x.y"]);
        assert!(intersect(&[&a[..], &paths(&["other"])[..]]).is_empty());
    }

    #[test]
    fn camel_case_conversion() {
        assert_eq!(to_camel_case("foo_bar.baz_qux").unwrap(), "fooBar.bazQux");
        assert_eq!(to_camel_case("foo").unwrap(), "foo");
        assert!(to_camel_case("fooBar").is_err());
        assert!(to_camel_case("foo__bar").is_err());
        assert!(to_camel_case("foo_1").is_err());
        assert_eq!(to_snake_case("fooBar.bazQux").unwrap(), "foo_bar.baz_qux");
        assert!(to_snake_case("foo_bar").is_err());
    }
}
