use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::env::TargetEnv;
use crate::error::Error;
use crate::model::{EnvMap, LoadReport};
use crate::reader::{paths_or_default, read_file};

/// Load dotenv files into the process environment without replacing
/// variables that are already set. With no paths, loads `.env`.
///
/// # Safety
///
/// The caller must ensure no other threads concurrently read or write the
/// process environment while this runs.
pub unsafe fn load<I, P>(paths: I) -> Result<LoadReport, Error>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    // SAFETY: forwarded to the caller.
    let target = unsafe { TargetEnv::process() };
    EnvLoader::new()
        .paths(paths)
        .target(target)
        .override_existing(false)
        .load()
}

/// Load dotenv files into the process environment, replacing variables that
/// are already set. With no paths, loads `.env`.
///
/// # Safety
///
/// The caller must ensure no other threads concurrently read or write the
/// process environment while this runs.
pub unsafe fn overload<I, P>(paths: I) -> Result<LoadReport, Error>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    // SAFETY: forwarded to the caller.
    let target = unsafe { TargetEnv::process() };
    EnvLoader::new()
        .paths(paths)
        .target(target)
        .override_existing(true)
        .load()
}

/// Builder-style dotenv loader.
///
/// Files are applied in order. Each file is parsed with the target as the
/// fallback for `$NAME` references, so it sees whatever earlier files put
/// there.
#[derive(Debug, Clone, Default)]
pub struct EnvLoader {
    paths: Vec<PathBuf>,
    override_existing: bool,
    target: TargetEnv,
}

impl EnvLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.paths
            .extend(paths.into_iter().map(|path| path.as_ref().to_path_buf()));
        self
    }

    /// Replace variables already present in the target (`overload`) instead
    /// of keeping them (`load`, the default).
    pub fn override_existing(mut self, override_existing: bool) -> Self {
        self.override_existing = override_existing;
        self
    }

    pub fn target(mut self, target: TargetEnv) -> Self {
        self.target = target;
        self
    }

    pub fn target_env(&self) -> &TargetEnv {
        &self.target
    }

    pub fn into_target(self) -> TargetEnv {
        self.target
    }

    /// Read and merge the files without touching the target. References fall
    /// back to the target's current contents.
    pub fn parse_only(&self) -> Result<EnvMap, Error> {
        let mut merged = EnvMap::new();
        for path in self.effective_paths() {
            merged.extend(read_file(&path, &self.target)?);
        }
        Ok(merged)
    }

    /// Apply the files to the target, stopping at the first file that fails
    /// to read or parse. Files applied before the failure stay applied.
    pub fn load(&mut self) -> Result<LoadReport, Error> {
        let mut report = LoadReport::default();

        for path in self.effective_paths() {
            let entries = read_file(&path, &self.target)?;
            report.files_read += 1;
            self.apply(entries, &mut report);
        }

        Ok(report)
    }

    fn apply(&mut self, entries: EnvMap, report: &mut LoadReport) {
        for (key, value) in entries {
            if !self.override_existing && self.target.contains_key(&key) {
                report.skipped_existing += 1;
                debug!(key = %key, "skipping existing key");
                continue;
            }

            if self.target.set_var(&key, &value) {
                trace!(key = %key, "set variable");
                report.loaded += 1;
            }
        }
    }

    fn effective_paths(&self) -> Vec<PathBuf> {
        paths_or_default(&self.paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn memory_with(pairs: &[(&str, &str)]) -> TargetEnv {
        TargetEnv::from_memory(
            pairs
                .iter()
                .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    #[test]
    fn apply_respects_live_target_state() {
        let mut loader = EnvLoader::new().target(memory_with(&[("A", "existing")]));
        let mut report = LoadReport::default();

        let first: EnvMap = [("A", "1"), ("B", "1")].into_iter().collect();
        loader.apply(first, &mut report);
        let second: EnvMap = [("B", "2"), ("C", "2")].into_iter().collect();
        loader.apply(second, &mut report);

        let map = loader.target_env().as_memory().expect("memory target");
        assert_eq!(map.get("A").map(String::as_str), Some("existing"));
        assert_eq!(map.get("B").map(String::as_str), Some("1"));
        assert_eq!(map.get("C").map(String::as_str), Some("2"));
        assert_eq!(report.loaded, 2);
        assert_eq!(report.skipped_existing, 2);
    }

    #[test]
    fn apply_with_override_replaces_values() {
        let mut loader = EnvLoader::new()
            .target(memory_with(&[("A", "existing")]))
            .override_existing(true);
        let mut report = LoadReport::default();

        loader.apply([("A", "1")].into_iter().collect(), &mut report);

        let map = loader.target_env().as_memory().expect("memory target");
        assert_eq!(map.get("A").map(String::as_str), Some("1"));
        assert_eq!(report.loaded, 1);
        assert_eq!(report.skipped_existing, 0);
    }

    #[test]
    fn no_paths_use_default_filename() {
        let loader = EnvLoader::new();
        assert_eq!(loader.effective_paths(), [PathBuf::from(".env")]);
    }
}
