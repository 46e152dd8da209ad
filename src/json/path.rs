use std::fmt;
use std::rc::Rc;

/// Dotted path of a field, e.g. `foo.bar.baz`.
///
/// Paths are persistent lists linked towards the root: `push` allocates one
/// node and shares the parent, so descending into a sub-message never copies
/// the path so far. The root path is empty.
#[derive(Clone, Default)]
pub struct FieldPath(Option<Rc<Segment>>);

struct Segment {
    parent: FieldPath,
    element: Box<str>,
}

impl FieldPath {
    /// The empty path.
    pub fn root() -> Self {
        Self(None)
    }

    /// Path of the child `field` of this path.
    pub fn push(&self, field: &str) -> FieldPath {
        FieldPath(Some(Rc::new(Segment {
            parent: self.clone(),
            element: field.into(),
        })))
    }

    /// Whether this is the empty path.
    pub fn is_root(&self) -> bool {
        self.0.is_none()
    }

    /// Last element of the path.
    pub fn element(&self) -> Option<&str> {
        self.0.as_ref().map(|s| &*s.element)
    }

    /// Path without its last element.
    pub fn parent(&self) -> Option<&FieldPath> {
        self.0.as_ref().map(|s| &s.parent)
    }

    /// Whether the path is `dotted`, compared segment by segment without
    /// allocating. A segment that itself contains a `.`, such as a `Struct`
    /// key, matches nothing.
    pub fn matches(&self, dotted: &str) -> bool {
        let Some(seg) = &self.0 else {
            return dotted.is_empty();
        };
        if seg.element.contains('.') {
            return false;
        }
        let Some(rest) = dotted.strip_suffix(&*seg.element) else {
            return false;
        };
        if seg.parent.is_root() {
            return rest.is_empty();
        }
        match rest.strip_suffix('.') {
            Some(rest) => seg.parent.matches(rest),
            None => false,
        }
    }
}

impl PartialEq for FieldPath {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (None, None) => true,
            (Some(a), Some(b)) => Rc::ptr_eq(a, b) || (a.element == b.element && a.parent == b.parent),
            _ => false,
        }
    }
}

impl Eq for FieldPath {}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(seg) = &self.0 {
            if !seg.parent.is_root() {
                write!(f, "{}.", seg.parent)?;
            }
            f.write_str(&seg.element)?;
        }
        Ok(())
    }
}

impl fmt::Debug for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldPath({:?})", self.to_string())
    }
}

/// Ordered set of dotted paths: a field mask.
///
/// During unmarshaling it collects the fields that were present; during
/// marshaling it names the fields that must be written even when they hold
/// their default value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathSet {
    paths: Vec<String>,
}

impl PathSet {
    /// An empty mask.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `path` unless it is already present.
    pub fn add(&mut self, path: &FieldPath) {
        if !self.contains(path) {
            self.paths.push(path.to_string());
        }
    }

    /// Whether `path` is in the mask.
    pub fn contains(&self, path: &FieldPath) -> bool {
        self.paths.iter().any(|p| path.matches(p))
    }

    /// The paths in insertion order.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Consume the set, returning its paths.
    pub fn into_paths(self) -> Vec<String> {
        self.paths
    }

    /// Number of paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the mask is empty.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for PathSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self {
            paths: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_display() {
        let root = FieldPath::root();
        let a = root.push("foo");
        let b = a.push("bar").push("baz");
        assert_eq!(root.to_string(), "");
        assert_eq!(a.to_string(), "foo");
        assert_eq!(b.to_string(), "foo.bar.baz");
        assert_eq!(b.element(), Some("baz"));
        assert_eq!(b.parent().map(ToString::to_string), Some("foo.bar".to_string()));
    }

    #[test]
    fn equality_is_segment_wise() {
        assert_eq!(FieldPath::root(), FieldPath::default());
        let a = FieldPath::root().push("a").push("b");
        let b = FieldPath::root().push("a").push("b");
        assert_eq!(a, b);
        assert_ne!(a, FieldPath::root().push("a.b"));
        assert_ne!(a, FieldPath::root().push("a"));
    }

    #[test]
    fn matches_dotted() {
        let p = FieldPath::root().push("foo").push("bar");
        assert!(p.matches("foo.bar"));
        assert!(!p.matches("foo"));
        assert!(!p.matches("xfoo.bar"));
        assert!(!p.matches("foobar"));
        assert!(!p.matches(".foo.bar"));
        assert!(FieldPath::root().matches(""));

        assert!(!FieldPath::root().push("a.b").matches("a.b"));
        assert!(!FieldPath::root().push("a").push("b.c").matches("a.b.c"));
        assert!(!FieldPath::root().push("a.b").push("c").matches("a.b.c"));
    }

    #[test]
    fn path_set() {
        let mut set = PathSet::new();
        let p = FieldPath::root().push("a");
        set.add(&p);
        set.add(&p);
        set.add(&p.push("b"));
        assert_eq!(set.paths(), &["a".to_string(), "a.b".to_string()]);
        assert!(set.contains(&p));
        assert!(!set.contains(&FieldPath::root().push("b")));
    }
}
