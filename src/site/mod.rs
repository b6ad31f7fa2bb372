//! Access-site identity.
//!
//! Statistics are aggregated per call site rather than per entity type, since
//! different code paths through the same type touch different sub-graphs. A
//! [`SiteKey`] pairs a logical identifier (entity type name, collection role,
//! query text) with an optional fingerprint of the calling stack.
//!
//! Callers should prefer an explicit, stable identifier ([`SiteKey::new`]).
//! [`SiteKey::here`] and [`SiteKey::from_frames`] derive identity from code
//! locations and change whenever the calling code moves.

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Default number of frames kept in a stack fingerprint.
pub const DEFAULT_MAX_FRAMES: usize = 20;

/// One frame of a call stack, treated as an opaque comparable token.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Frame {
    /// Module (or file) the frame's code belongs to.
    pub module: String,
    /// Function or method name.
    pub symbol: String,
    /// Source line, `0` when unknown.
    pub line: u32,
    /// Whether the frame is native / opaque to the host.
    pub native: bool,
}

impl Frame {
    /// Creates a frame for code in `module`.
    pub fn new(module: impl Into<String>, symbol: impl Into<String>, line: u32) -> Self {
        Self {
            module: module.into(),
            symbol: symbol.into(),
            line,
            native: false,
        }
    }

    /// Creates an opaque frame; filters always drop these.
    pub fn native(module: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            symbol: symbol.into(),
            line: 0,
            native: true,
        }
    }

    /// Creates a frame from a caller location.
    pub fn from_location(location: &Location<'_>) -> Self {
        Self::new(
            location.file(),
            format!("col{}", location.column()),
            location.line(),
        )
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.native {
            write!(f, "{}::{}(native)", self.module, self.symbol)
        } else {
            write!(f, "{}::{}:{}", self.module, self.symbol, self.line)
        }
    }
}

/// Decides which frames belong to the fingerprint.
#[derive(Clone, Debug)]
pub struct FrameFilter {
    /// Frames whose module starts with one of these prefixes are dropped.
    pub excluded_prefixes: Vec<String>,
    /// Exceptions to `excluded_prefixes`, e.g. test modules of an excluded root.
    pub allowed_prefixes: Vec<String>,
    /// Maximum number of frames kept after filtering.
    pub max_frames: usize,
}

impl Default for FrameFilter {
    fn default() -> Self {
        Self {
            excluded_prefixes: vec![own_module_root().to_string()],
            allowed_prefixes: Vec::new(),
            max_frames: DEFAULT_MAX_FRAMES,
        }
    }
}

impl FrameFilter {
    /// Adds a module prefix to drop (host integration layers, ORM internals).
    pub fn exclude(mut self, prefix: impl Into<String>) -> Self {
        self.excluded_prefixes.push(prefix.into());
        self
    }

    /// Keeps frames under `prefix` even if an excluded prefix also matches.
    pub fn allow(mut self, prefix: impl Into<String>) -> Self {
        self.allowed_prefixes.push(prefix.into());
        self
    }

    /// Sets the frame budget.
    pub fn max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Returns `true` if the frame takes part in the fingerprint.
    pub fn keeps(&self, frame: &Frame) -> bool {
        if frame.native {
            return false;
        }
        let excluded = self
            .excluded_prefixes
            .iter()
            .any(|prefix| frame.module.starts_with(prefix.as_str()));
        if !excluded {
            return true;
        }
        self.allowed_prefixes
            .iter()
            .any(|prefix| frame.module.starts_with(prefix.as_str()))
    }

    /// Filters `frames` (innermost first) and truncates to the frame budget.
    pub fn apply<I>(&self, frames: I) -> Vec<Frame>
    where
        I: IntoIterator<Item = Frame>,
    {
        frames
            .into_iter()
            .filter(|frame| self.keeps(frame))
            .take(self.max_frames)
            .collect()
    }
}

fn shared_id(id: impl Into<String>) -> Arc<str> {
    let id: String = id.into();
    Arc::from(id)
}

fn own_module_root() -> &'static str {
    let path = module_path!();
    path.split("::").next().unwrap_or(path)
}

/// Identity of the place in calling code that triggered a load.
///
/// Equality and hashing are structural over the logical identifier and the
/// filtered frame list.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteKey {
    id: Arc<str>,
    frames: Arc<[Frame]>,
}

impl SiteKey {
    /// Creates a key from an explicit, stable identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: shared_id(id),
            frames: Arc::from(Vec::new()),
        }
    }

    /// Creates a key fingerprinted by the caller's source location.
    #[track_caller]
    pub fn here(id: impl Into<String>) -> Self {
        let frame = Frame::from_location(Location::caller());
        Self {
            id: shared_id(id),
            frames: Arc::from(vec![frame]),
        }
    }

    /// Creates a key from a captured stack, innermost frame first.
    pub fn from_frames<I>(id: impl Into<String>, frames: I, filter: &FrameFilter) -> Self
    where
        I: IntoIterator<Item = Frame>,
    {
        Self {
            id: shared_id(id),
            frames: Arc::from(filter.apply(frames)),
        }
    }

    /// Logical identifier supplied by the caller.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Filtered, truncated frames.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}

impl From<&str> for SiteKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SiteKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for SiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} , [", self.id)?;
        for (idx, frame) in self.frames.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{frame}")?;
        }
        f.write_str("])")
    }
}

impl fmt::Debug for SiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SiteKey{self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack() -> Vec<Frame> {
        vec![
            Frame::new("prefetch_advisor::manager", "record_root_access", 10),
            Frame::new("orm::session", "load", 44),
            Frame::native("std::rt", "lang_start"),
            Frame::new("app::payroll", "monthly_report", 120),
            Frame::new("orm::tests::fixtures", "seed", 7),
            Frame::new("app::main", "main", 3),
        ]
    }

    #[test]
    fn filter_drops_engine_host_and_native_frames() {
        let filter = FrameFilter::default().exclude("orm::").allow("orm::tests");
        let kept = filter.apply(stack());
        let symbols: Vec<_> = kept.iter().map(|f| f.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["monthly_report", "seed", "main"]);
    }

    #[test]
    fn truncation_keeps_innermost_frames() {
        let filter = FrameFilter::default().max_frames(1);
        let key = SiteKey::from_frames("Employee", stack(), &filter);
        assert_eq!(key.frames().len(), 1);
        assert_eq!(key.frames()[0].symbol, "load");
    }

    #[test]
    fn keys_compare_by_id_and_frames() {
        let filter = FrameFilter::default();
        let a = SiteKey::from_frames("Employee", stack(), &filter);
        let b = SiteKey::from_frames("Employee", stack(), &filter);
        let c = SiteKey::from_frames("Address", stack(), &filter);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, SiteKey::new("Employee"));
    }

    #[test]
    fn same_call_site_yields_equal_keys() {
        let keys: Vec<SiteKey> = (0..2).map(|_| SiteKey::here("Employee")).collect();
        assert_eq!(keys[0], keys[1]);
        let elsewhere = SiteKey::here("Employee");
        assert_ne!(keys[0], elsewhere);
    }
}
