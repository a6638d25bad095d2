// Cached, read-only dataset handles.
//
// Both backing tables are loaded at most once per process and per path;
// every view recomputes from the shared handle. The only invalidation is an
// explicit reload. This replaces ambient global state with a cache the
// caller owns and passes around.
use crate::errors::DataError;
use crate::loader::{self, LoadReport};
use crate::types::{AccidentRecord, RoadVolumeRecord};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An immutable, fully cleaned accident table.
pub struct Dataset {
    pub records: Vec<AccidentRecord>,
    pub report: LoadReport,
}

impl Dataset {
    /// Borrowed row set in the shape every aggregation consumes.
    pub fn rows(&self) -> Vec<&AccidentRecord> {
        self.records.iter().collect()
    }

    /// Smallest and largest year present, for range prompts.
    pub fn year_span(&self) -> Option<(i32, i32)> {
        let min = self.records.iter().map(|r| r.year).min()?;
        let max = self.records.iter().map(|r| r.year).max()?;
        Some((min, max))
    }
}

#[derive(Default)]
pub struct DatasetCache {
    accidents: HashMap<PathBuf, Arc<Dataset>>,
    volumes: HashMap<PathBuf, Arc<Vec<RoadVolumeRecord>>>,
}

impl DatasetCache {
    /// The memoized accident table for `path`, loading it on first use.
    /// Repeated calls return the same handle.
    pub fn accidents(&mut self, path: &Path) -> Result<Arc<Dataset>, DataError> {
        if let Some(dataset) = self.accidents.get(path) {
            return Ok(Arc::clone(dataset));
        }
        let (records, report) = loader::load_accidents(path)?;
        let dataset = Arc::new(Dataset { records, report });
        self.accidents.insert(path.to_path_buf(), Arc::clone(&dataset));
        Ok(dataset)
    }

    /// The accident table only if it has already been loaded.
    pub fn loaded(&self, path: &Path) -> Option<Arc<Dataset>> {
        self.accidents.get(path).map(Arc::clone)
    }

    /// Drop the cached table and load it again from disk.
    pub fn reload(&mut self, path: &Path) -> Result<Arc<Dataset>, DataError> {
        self.accidents.remove(path);
        self.accidents(path)
    }

    /// The memoized road-volume table for `path`, loading it on first use.
    pub fn volumes(&mut self, path: &Path) -> Result<Arc<Vec<RoadVolumeRecord>>, DataError> {
        if let Some(volumes) = self.volumes.get(path) {
            return Ok(Arc::clone(volumes));
        }
        let volumes = Arc::new(loader::load_road_volumes(path)?);
        self.volumes.insert(path.to_path_buf(), Arc::clone(&volumes));
        Ok(volumes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "ZaporednaStevilkaPN,Leto,DatumPN,UpravnaEnotaStoritve,TekstCesteNaselja,TekstOdsekaUlice,TipNesrece,VzrokNesrece,Povzrocitelj,Spol,Starost,PoskodbaUdelezenca,UporabaVarnostnegaPasu,VrednostAlkotesta,GeoKoordinataX,GeoKoordinataY"
        )
        .unwrap();
        for i in 0..4 {
            writeln!(
                file,
                "{},2018,,CELJE,CESTA A,ODSEK {},NALETNO TRČENJE,HITROST,POVZROČITELJ,MOŠKI,40,BREZ POŠKODBE,DA,0,,",
                i,
                i % 2
            )
            .unwrap();
        }
        file
    }

    #[test]
    fn second_load_is_a_cache_hit() {
        let file = sample_file();
        let mut cache = DatasetCache::default();
        let first = cache.accidents(file.path()).unwrap();
        let second = cache.accidents(file.path()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(cache.loaded(file.path()).is_some());
    }

    #[test]
    fn reload_replaces_the_handle() {
        let file = sample_file();
        let mut cache = DatasetCache::default();
        let first = cache.accidents(file.path()).unwrap();
        let reloaded = cache.reload(file.path()).unwrap();
        assert!(!Arc::ptr_eq(&first, &reloaded));
        assert_eq!(first.records.len(), reloaded.records.len());
    }

    #[test]
    fn identical_parameters_give_identical_outputs_across_loads() {
        let file = sample_file();
        let mut cache = DatasetCache::default();
        let first = cache.accidents(file.path()).unwrap();
        let again = cache.reload(file.path()).unwrap();

        let a = aggregate::top_segments(&first.rows(), 10);
        let b = aggregate::top_segments(&again.rows(), 10);
        assert_eq!(a, b);

        let span = first.year_span().unwrap();
        assert_eq!(span, (2018, 2018));
    }

    #[test]
    fn missing_file_stays_unloaded() {
        let mut cache = DatasetCache::default();
        assert!(cache.accidents(Path::new("missing.csv")).is_err());
        assert!(cache.loaded(Path::new("missing.csv")).is_none());
    }
}
