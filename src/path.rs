//! Association paths.
//!
//! A [`Path`] names a traversal from a root entity through a chain of
//! associations, e.g. `supervisor.supervisor`. Paths are the unit of output of
//! the prefetch walk and the unit of input of [`crate::plan::FetchPlan`].

use std::fmt;
use std::sync::Arc;

/// Immutable, ordered sequence of association names.
///
/// Cloning is cheap; every operation that "changes" a path returns a new one.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    segments: Arc<[String]>,
}

impl Path {
    /// Returns the empty path, which denotes the root entity itself.
    pub fn empty() -> Self {
        Self {
            segments: Arc::from(Vec::new()),
        }
    }

    /// Builds a path from association names, outermost first.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns a new path with `name` added at the end.
    pub fn append(&self, name: impl Into<String>) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(name.into());
        Self {
            segments: segments.into(),
        }
    }

    /// Returns a new path with `name` spliced in front.
    ///
    /// Used when a collection owned by a parent is initialized: paths learned
    /// for the collection's role are re-rooted at the owning entity.
    pub fn prepend_one(&self, name: impl Into<String>) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.push(name.into());
        segments.extend(self.segments.iter().cloned());
        Self {
            segments: segments.into(),
        }
    }

    /// Returns the path without its last association, or `None` for the empty path.
    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.segments.split_last()?;
        Some(Self {
            segments: init.into(),
        })
    }

    /// Returns `true` if the path has no associations.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of associations in the path.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Association names, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last association of the path.
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }
}

impl Default for Path {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut iter = self.segments.iter();
        if let Some(first) = iter.next() {
            f.write_str(first)?;
            for segment in iter {
                write!(f, ".{segment}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({self})")
    }
}

impl<S: Into<String>> FromIterator<S> for Path {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::from_segments(iter)
    }
}

impl From<&str> for Path {
    /// Parses a `.`-separated rendering; the empty string yields the empty path.
    fn from(value: &str) -> Self {
        if value.is_empty() {
            return Self::empty();
        }
        Self::from_segments(value.split('.'))
    }
}
