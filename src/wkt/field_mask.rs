use crate::fieldmask;
use crate::json::{MarshalProtoJson, MarshalState, PathSet, UnmarshalProtoJson, UnmarshalState};
use crate::Message;

/// `google.protobuf.FieldMask`: a set of dotted snake_case field paths.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Message)]
#[protolite(name = "google.protobuf.FieldMask")]
pub struct FieldMask {
    /// Paths such as `foo.bar_baz`.
    #[protolite(tag = 1, string, repeated)]
    pub paths: Vec<String>,
}

impl FieldMask {
    /// A mask of `paths`.
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Sort the paths and drop those covered by another path.
    pub fn normalize(&mut self) {
        fieldmask::normalize_in_place(&mut self.paths)
    }

    /// Paths covered by `self` or `other`.
    pub fn union(&self, other: &FieldMask) -> FieldMask {
        FieldMask {
            paths: fieldmask::union(&[&self.paths[..], &other.paths[..]]),
        }
    }

    /// Paths covered by both `self` and `other`.
    pub fn intersect(&self, other: &FieldMask) -> FieldMask {
        FieldMask {
            paths: fieldmask::intersect(&[&self.paths[..], &other.paths[..]]),
        }
    }

    /// Whether `path` is one of the paths or lies below one.
    pub fn covers(&self, path: &str) -> bool {
        self.paths.iter().any(|p| fieldmask::has_path_prefix(path, p))
    }
}

impl From<PathSet> for FieldMask {
    fn from(set: PathSet) -> Self {
        Self {
            paths: set.into_paths(),
        }
    }
}

impl MarshalProtoJson for FieldMask {
    fn marshal_protojson(&self, s: &mut MarshalState) {
        s.write_field_mask(&self.paths)
    }
}

impl UnmarshalProtoJson for FieldMask {
    fn unmarshal_protojson(&mut self, s: &mut UnmarshalState<'_>) {
        self.paths = s.read_field_mask();
    }
}
