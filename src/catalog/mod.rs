//! Program catalog: read-only collection of scheme eligibility records.
//!
//! The catalog is loaded once at startup (built-in data or a JSON file) and
//! handed out as a shared immutable slice. A reload swaps the whole slice;
//! readers holding the previous `Arc` keep a consistent view.

pub mod model;

pub use model::{ProgramRecord, Restriction, ANY_SENTINEL};

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::CatalogError;

/// Built-in scheme data, in the catalog JSON format.
const BUILTIN_SCHEMES: &str = include_str!("schemes.json");

/// Read-only source of active programs.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// All currently active programs, in catalog order.
    async fn list_active_programs(&self) -> Result<Arc<[ProgramRecord]>, CatalogError>;

    /// Look up a single program by id.
    async fn find(&self, id: &str) -> Result<Option<ProgramRecord>, CatalogError> {
        let programs = self.list_active_programs().await?;
        Ok(programs.iter().find(|p| p.id == id).cloned())
    }

    /// Replace the catalog from its source and return the new program count.
    ///
    /// Sources that cannot change report the current count.
    async fn reload(&self) -> Result<usize, CatalogError> {
        Ok(self.list_active_programs().await?.len())
    }
}

/// In-process catalog backed by built-in data or a JSON file.
pub struct StaticCatalog {
    programs: RwLock<Arc<[ProgramRecord]>>,
    source: Option<PathBuf>,
}

impl StaticCatalog {
    /// Catalog with the built-in schemes.
    pub fn builtin() -> Result<Self, CatalogError> {
        let programs = parse_catalog(BUILTIN_SCHEMES)?;
        Ok(Self::new(programs))
    }

    /// Catalog from an explicit list of records.
    pub fn new(programs: Vec<ProgramRecord>) -> Self {
        Self {
            programs: RwLock::new(programs.into()),
            source: None,
        }
    }

    /// Load a catalog from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let programs = read_catalog_file(path)?;
        info!(path = %path.display(), count = programs.len(), "Loaded program catalog");
        Ok(Self {
            programs: RwLock::new(programs.into()),
            source: Some(path.to_path_buf()),
        })
    }

    fn snapshot(&self) -> Arc<[ProgramRecord]> {
        self.programs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl CatalogProvider for StaticCatalog {
    async fn list_active_programs(&self) -> Result<Arc<[ProgramRecord]>, CatalogError> {
        Ok(self.snapshot())
    }

    /// Re-read the source file and replace the whole catalog.
    ///
    /// A failed reload leaves the current catalog in place. The built-in
    /// catalog has no source and reloads are a no-op.
    async fn reload(&self) -> Result<usize, CatalogError> {
        let Some(path) = self.source.as_deref() else {
            return Ok(self.snapshot().len());
        };
        let programs = read_catalog_file(path)?;
        let count = programs.len();
        *self.programs.write().unwrap_or_else(|e| e.into_inner()) = programs.into();
        info!(path = %path.display(), count, "Reloaded program catalog");
        Ok(count)
    }
}

/// Reload `catalog` each time a trigger arrives. Ends when every sender is
/// dropped.
pub fn spawn_reload_task(
    catalog: Arc<dyn CatalogProvider>,
    mut triggers: mpsc::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while triggers.recv().await.is_some() {
            if let Err(e) = catalog.reload().await {
                warn!("Catalog reload failed, keeping current catalog: {}", e);
            }
        }
    })
}

/// Forward SIGHUP to a reload trigger channel.
#[cfg(unix)]
pub fn forward_hangups(triggers: mpsc::Sender<()>) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangups = signal(SignalKind::hangup())?;
    Ok(tokio::spawn(async move {
        while hangups.recv().await.is_some() {
            info!("SIGHUP received, reloading catalog");
            if triggers.send(()).await.is_err() {
                break;
            }
        }
    }))
}

fn read_catalog_file(path: &Path) -> Result<Vec<ProgramRecord>, CatalogError> {
    let text = std::fs::read_to_string(path).map_err(|e| CatalogError::Load {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse_catalog(&text)
}

/// Parse and validate catalog JSON.
///
/// Ids must be non-empty and unique, and every age range must be ordered.
pub fn parse_catalog(json: &str) -> Result<Vec<ProgramRecord>, CatalogError> {
    let programs: Vec<ProgramRecord> = serde_json::from_str(json)?;

    let mut seen = HashSet::new();
    for p in &programs {
        if p.id.trim().is_empty() {
            return Err(CatalogError::InvalidRecord {
                id: p.name.clone(),
                reason: "empty id".to_string(),
            });
        }
        if !seen.insert(p.id.as_str()) {
            return Err(CatalogError::DuplicateId { id: p.id.clone() });
        }
        if p.age_min > p.age_max {
            return Err(CatalogError::InvalidRecord {
                id: p.id.clone(),
                reason: format!("age_min {} exceeds age_max {}", p.age_min, p.age_max),
            });
        }
    }

    Ok(programs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_loads_ten_schemes() {
        let programs = parse_catalog(BUILTIN_SCHEMES).unwrap();
        assert_eq!(programs.len(), 10);
        assert_eq!(programs[0].id, "scheme_1");
        assert_eq!(programs[1].target_category, Restriction::Only("OBC".into()));
        assert_eq!(
            programs[3].target_region,
            Restriction::Only("Maharashtra".into())
        );
    }

    #[test]
    fn duplicate_ids_rejected() {
        let json = r#"[
            {"id":"a","name":"A","state":"ALL","category":"ALL","income_max":1,"age_min":1,"age_max":2,"benefits":"","documents":[],"apply_link":""},
            {"id":"a","name":"B","state":"ALL","category":"ALL","income_max":1,"age_min":1,"age_max":2,"benefits":"","documents":[],"apply_link":""}
        ]"#;
        let err = parse_catalog(json).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateId { ref id } if id == "a"));
    }

    #[test]
    fn inverted_age_range_rejected() {
        let json = r#"[
            {"id":"a","name":"A","state":"ALL","category":"ALL","income_max":1,"age_min":30,"age_max":20,"benefits":"","documents":[],"apply_link":""}
        ]"#;
        assert!(matches!(
            parse_catalog(json),
            Err(CatalogError::InvalidRecord { .. })
        ));
    }

    #[test]
    fn empty_catalog_is_valid() {
        assert!(parse_catalog("[]").unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_by_id() {
        let catalog = StaticCatalog::builtin().unwrap();
        let found = catalog.find("scheme_2").await.unwrap().unwrap();
        assert_eq!(found.name, "PM YASASVI Scholarship");
        assert!(catalog.find("scheme_404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reload_replaces_whole_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, BUILTIN_SCHEMES).unwrap();

        let catalog = StaticCatalog::from_file(&path).unwrap();
        let before = catalog.list_active_programs().await.unwrap();
        assert_eq!(before.len(), 10);

        std::fs::write(
            &path,
            r#"[{"id":"only","name":"Only","state":"ALL","category":"ALL","income_max":1,"age_min":1,"age_max":99,"benefits":"","documents":[],"apply_link":""}]"#,
        )
        .unwrap();
        assert_eq!(catalog.reload().await.unwrap(), 1);

        let after = catalog.list_active_programs().await.unwrap();
        assert_eq!(after.len(), 1);
        // Earlier snapshot is untouched.
        assert_eq!(before.len(), 10);
    }

    #[tokio::test]
    async fn failed_reload_keeps_current_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, BUILTIN_SCHEMES).unwrap();
        let catalog = StaticCatalog::from_file(&path).unwrap();

        std::fs::write(&path, "not json").unwrap();
        assert!(catalog.reload().await.is_err());
        assert_eq!(catalog.list_active_programs().await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn reload_task_swaps_catalog_behind_trait_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, BUILTIN_SCHEMES).unwrap();
        let catalog: Arc<dyn CatalogProvider> = Arc::new(StaticCatalog::from_file(&path).unwrap());

        let (tx, rx) = mpsc::channel(1);
        let task = spawn_reload_task(Arc::clone(&catalog), rx);

        std::fs::write(&path, "[]").unwrap();
        tx.send(()).await.unwrap();
        drop(tx);
        task.await.unwrap();
        assert!(catalog.list_active_programs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reload_task_survives_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, BUILTIN_SCHEMES).unwrap();
        let catalog: Arc<dyn CatalogProvider> = Arc::new(StaticCatalog::from_file(&path).unwrap());

        let (tx, rx) = mpsc::channel(2);
        let task = spawn_reload_task(Arc::clone(&catalog), rx);

        std::fs::write(&path, "{").unwrap();
        tx.send(()).await.unwrap();
        drop(tx);
        task.await.unwrap();
        assert_eq!(catalog.list_active_programs().await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn builtin_reload_reports_current_count() {
        let catalog = StaticCatalog::builtin().unwrap();
        assert_eq!(catalog.reload().await.unwrap(), 10);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = StaticCatalog::from_file("/definitely/not/here.json")
            .err()
            .unwrap();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
