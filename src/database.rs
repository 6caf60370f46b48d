//! Enrolled template database with a single-slot FBR cache.
//!
//! Entries are insertion-ordered and index-addressable. The packed
//! representation and the stable-bit threshold of every entry are built
//! lazily and memoized against the single most-recently-used FBR: asking for
//! a different FBR destructively rebuilds the stable planes, so callers must
//! not interleave two FBR values without external synchronization.

use crate::packed::Word;
use crate::template::{IrisTemplate, PackedBundle};
use crate::threshold::fragile_bit_threshold;
use crate::trace::{trace_event, trace_span};
use crate::util::{IrisCodeError, IrisCodeResult};

#[cfg(feature = "image-io")]
use crate::grid::io::load_gray_plane;
#[cfg(feature = "image-io")]
use crate::trace::trace_warn;
#[cfg(feature = "image-io")]
use std::path::Path;

/// A class-labelled template, possibly empty after a failed load.
#[derive(Clone, Debug)]
pub struct LabelledTemplate {
    /// Class label (several entries may share one class).
    pub class: String,
    /// Byte planes; `None` marks a present-but-unmatchable sample.
    pub template: Option<IrisTemplate>,
}

/// Cached threshold together with the FBR it was computed for.
#[derive(Clone, Copy, Debug)]
struct StableCache {
    fbr: f64,
    threshold: u8,
}

/// One enrolled sample.
#[derive(Clone, Debug)]
pub struct EnrolledEntry<W: Word> {
    identity: String,
    class: String,
    template: Option<IrisTemplate>,
    packed: Option<PackedBundle<W>>,
    cached: Option<StableCache>,
}

impl<W: Word> EnrolledEntry<W> {
    /// Returns the identity label.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Returns the class label.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Returns the byte-plane template, if the sample is matchable.
    pub fn template(&self) -> Option<&IrisTemplate> {
        self.template.as_ref()
    }

    /// Returns the packed bundle, if built for the current FBR.
    pub fn packed(&self) -> Option<&PackedBundle<W>> {
        self.packed.as_ref()
    }
}

/// Insertion-ordered collection of enrolled templates.
#[derive(Clone, Debug, Default)]
pub struct TemplateDatabase<W: Word = u32> {
    entries: Vec<EnrolledEntry<W>>,
}

impl<W: Word> TemplateDatabase<W> {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Enrolls a sample; `template = None` records a class whose data failed
    /// to load (kept so database cardinality stays stable across probes).
    pub fn enroll(&mut self, identity: &str, class: &str, template: Option<IrisTemplate>) {
        self.entries.push(EnrolledEntry {
            identity: identity.to_string(),
            class: class.to_string(),
            template,
            packed: None,
            cached: None,
        });
    }

    /// Returns the number of enrolled entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no entry is enrolled.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entry at `index`.
    pub fn entry(&self, index: usize) -> IrisCodeResult<&EnrolledEntry<W>> {
        self.entries.get(index).ok_or(IrisCodeError::IndexOutOfBounds {
            index,
            len: self.entries.len(),
            context: "entry",
        })
    }

    /// Iterates over the entries in enrollment order.
    pub fn entries(&self) -> impl Iterator<Item = &EnrolledEntry<W>> {
        self.entries.iter()
    }

    /// Returns the number of distinct class labels.
    pub fn class_count(&self) -> usize {
        let mut classes: Vec<&str> = self.entries.iter().map(|e| e.class.as_str()).collect();
        classes.sort_unstable();
        classes.dedup();
        classes.len()
    }

    /// Returns the stable-bit threshold of one entry for `fbr`, recomputing
    /// and rebuilding the entry's stable plane when the cached FBR differs.
    pub fn threshold(&mut self, index: usize, fbr: f64) -> IrisCodeResult<u8> {
        let len = self.entries.len();
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(IrisCodeError::IndexOutOfBounds {
                index,
                len,
                context: "entry",
            })?;
        let template = entry
            .template
            .as_ref()
            .ok_or(IrisCodeError::InvalidParameter {
                name: "entry",
                reason: "entry has no template",
            })?;

        if let Some(cached) = entry.cached {
            if cached.fbr == fbr && entry.packed.is_some() {
                return Ok(cached.threshold);
            }
        }

        let threshold = fragile_bit_threshold(template.confidence().view(), fbr)?;
        match entry.packed.as_mut() {
            Some(packed) => packed.repack_stable(template, threshold)?,
            None => entry.packed = Some(PackedBundle::pack(template, threshold)?),
        }
        entry.cached = Some(StableCache { fbr, threshold });
        Ok(threshold)
    }

    /// Builds thresholds and packed bundles for every matchable entry at the
    /// given FBR. O(entries) once per distinct FBR value.
    pub fn prepare(&mut self, fbr: f64) -> IrisCodeResult<()> {
        let _span = trace_span!("prepare_database", entries = self.entries.len()).entered();
        let mut rebuilt = 0usize;
        for index in 0..self.entries.len() {
            if self.entries[index].template.is_none() {
                continue;
            }
            let cached = self.entries[index].cached;
            if cached.map_or(true, |c| c.fbr != fbr) || self.entries[index].packed.is_none() {
                rebuilt += 1;
            }
            self.threshold(index, fbr)?;
        }
        trace_event!("database_prepared", rebuilt = rebuilt);
        Ok(())
    }
}

/// Loads one enrolled sample per class directory under `root`.
///
/// Discovery is non-recursive; each class directory must contain the two
/// caller-named rasters. A class whose image pair fails to load is recorded
/// with an empty template rather than aborting the whole load.
#[cfg(feature = "image-io")]
pub fn load_class_directories<P: AsRef<Path>>(
    root: P,
    code_file: &str,
    confidence_file: &str,
) -> IrisCodeResult<Vec<LabelledTemplate>> {
    let read_err = |err: std::io::Error| IrisCodeError::ImageIo {
        reason: err.to_string(),
    };

    let mut class_dirs: Vec<std::path::PathBuf> = std::fs::read_dir(root.as_ref())
        .map_err(read_err)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    class_dirs.sort();

    let mut loaded = Vec::with_capacity(class_dirs.len());
    for dir in class_dirs {
        let class = match dir.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        let template = load_template_pair(&dir, code_file, confidence_file);
        if template.is_none() {
            trace_warn!("class_load_failed", class = class.as_str());
        }
        loaded.push(LabelledTemplate { class, template });
    }
    Ok(loaded)
}

#[cfg(feature = "image-io")]
fn load_template_pair(dir: &Path, code_file: &str, confidence_file: &str) -> Option<IrisTemplate> {
    let code = load_gray_plane(dir.join(code_file)).ok()?;
    let confidence = load_gray_plane(dir.join(confidence_file)).ok()?;
    IrisTemplate::new(code, confidence).ok()
}

#[cfg(feature = "image-io")]
impl<W: Word> TemplateDatabase<W> {
    /// Loads an enrollment directory (one subdirectory per class).
    pub fn load_directory<P: AsRef<Path>>(
        root: P,
        code_file: &str,
        confidence_file: &str,
    ) -> IrisCodeResult<Self> {
        let mut db = Self::new();
        for LabelledTemplate { class, template } in
            load_class_directories(root, code_file, confidence_file)?
        {
            db.enroll(&class, &class, template);
        }
        Ok(db)
    }
}

#[cfg(test)]
mod tests {
    use super::TemplateDatabase;
    use crate::grid::OwnedGrid;
    use crate::template::IrisTemplate;

    fn template(confidence: Vec<u8>) -> IrisTemplate {
        let len = confidence.len();
        IrisTemplate::new(
            OwnedGrid::new(vec![1; len], len, 1).unwrap(),
            OwnedGrid::new(confidence, len, 1).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn class_count_ignores_duplicates() {
        let mut db = TemplateDatabase::<u32>::new();
        db.enroll("s1a", "s1", Some(template(vec![10, 20, 30, 40])));
        db.enroll("s1b", "s1", Some(template(vec![10, 20, 30, 40])));
        db.enroll("s2a", "s2", None);
        assert_eq!(db.len(), 3);
        assert_eq!(db.class_count(), 2);
    }

    #[test]
    fn threshold_is_cached_per_fbr() {
        let mut db = TemplateDatabase::<u8>::new();
        db.enroll("a", "a", Some(template(vec![10, 20, 30, 40])));

        let first = db.threshold(0, 0.5).unwrap();
        assert_eq!(first, 20);
        // Same FBR: cached value, packed bundle untouched.
        assert_eq!(db.threshold(0, 0.5).unwrap(), 20);
        // Different FBR: recomputed, stable plane rebuilt.
        let second = db.threshold(0, 1.0).unwrap();
        assert_eq!(second, 40);
        let packed = db.entry(0).unwrap().packed().unwrap();
        assert!(packed.stable().bit(3, 0));
        assert!(!packed.stable().bit(0, 0));
    }

    #[test]
    fn threshold_on_empty_entry_is_an_error() {
        let mut db = TemplateDatabase::<u32>::new();
        db.enroll("ghost", "ghost", None);
        assert!(db.threshold(0, 0.5).is_err());
    }

    #[test]
    fn prepare_builds_all_matchable_entries() {
        let mut db = TemplateDatabase::<u16>::new();
        db.enroll("a", "a", Some(template(vec![100, 200])));
        db.enroll("b", "b", None);
        db.enroll("c", "c", Some(template(vec![50, 60])));
        db.prepare(0.5).unwrap();
        assert!(db.entry(0).unwrap().packed().is_some());
        assert!(db.entry(1).unwrap().packed().is_none());
        assert!(db.entry(2).unwrap().packed().is_some());
    }
}
