use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::info;

use crate::compactor;
use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::limits::*;
use crate::seed::{self, Seed};

/// Keeps `<stem>.wal` under the common 255-byte file name limit.
const MAX_WAL_STEM_LEN: usize = 250;

/// Manages per-tenant engines. Each tenant gets its own Engine + WAL + compactor.
/// Tenant = database name from the pgwire connection.
pub struct TenantManager {
    engines: DashMap<String, Arc<Engine>>,
    /// Held while a tenant is being opened so two connections never open the
    /// same WAL twice.
    creating: Mutex<()>,
    data_dir: PathBuf,
    compact_threshold: u64,
    engine_config: EngineConfig,
    seed: Option<Arc<Seed>>,
}

/// File stem for a tenant's WAL. ASCII letters, digits and `_` pass through;
/// every other byte, `-` included, becomes `-xx` hex, so distinct tenant names
/// never share a file.
fn wal_file_stem(tenant: &str) -> String {
    let mut stem = String::with_capacity(tenant.len());
    for b in tenant.bytes() {
        if b.is_ascii_alphanumeric() || b == b'_' {
            stem.push(char::from(b));
        } else {
            stem.push_str(&format!("-{b:02x}"));
        }
    }
    stem
}

impl TenantManager {
    pub fn new(data_dir: PathBuf, compact_threshold: u64, engine_config: EngineConfig) -> Self {
        Self {
            engines: DashMap::new(),
            creating: Mutex::new(()),
            data_dir,
            compact_threshold,
            engine_config,
            seed: None,
        }
    }

    /// Load `seed` into every tenant that starts out empty.
    pub fn with_seed(mut self, seed: Seed) -> Self {
        self.seed = Some(Arc::new(seed));
        self
    }

    /// Get or lazily create an engine for the given tenant.
    pub async fn get_or_create(&self, tenant: &str) -> io::Result<Arc<Engine>> {
        if let Some(engine) = self.engines.get(tenant) {
            return Ok(engine.value().clone());
        }
        if tenant.len() > MAX_TENANT_NAME_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "tenant name too long",
            ));
        }
        if tenant.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "empty tenant name",
            ));
        }

        let _creating = self.creating.lock().await;
        if let Some(engine) = self.engines.get(tenant) {
            return Ok(engine.value().clone());
        }
        if self.engines.len() >= MAX_TENANTS {
            return Err(io::Error::other("too many tenants"));
        }

        let stem = wal_file_stem(tenant);
        if stem.len() > MAX_WAL_STEM_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "tenant name too long",
            ));
        }
        let wal_path = self.data_dir.join(format!("{stem}.wal"));
        let engine = Arc::new(Engine::new(wal_path.clone(), self.engine_config)?);
        if let Some(seed) = &self.seed {
            seed::apply(&engine, seed).await.map_err(io::Error::other)?;
        }

        let compactor_engine = engine.clone();
        let threshold = self.compact_threshold;
        tokio::spawn(async move {
            compactor::run_compactor(compactor_engine, threshold).await;
        });

        self.engines.insert(tenant.to_string(), engine.clone());
        metrics::gauge!(crate::observability::TENANTS_ACTIVE).set(self.engines.len() as f64);
        info!(tenant, wal = %wal_path.display(), "tenant opened");
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crate::model::*;

    fn test_data_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("rota_test_tenant").join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn manager(dir: PathBuf) -> TenantManager {
        TenantManager::new(dir, 1000, EngineConfig::default())
    }

    fn date(s: &str) -> Date {
        parse_date(s).unwrap()
    }

    #[tokio::test]
    async fn tenant_isolation() {
        let tm = manager(test_data_dir("isolation"));
        let eng_a = tm.get_or_create("tenant_a").await.unwrap();
        let eng_b = tm.get_or_create("tenant_b").await.unwrap();

        eng_a
            .add_shift_member(
                date("2026-02-01"),
                ShiftType::Jpn,
                NewShiftEntry {
                    member_id: 6,
                    member_name: "Febin Bincy".into(),
                    slot: Slot::new(1),
                    assignment: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(eng_a.schedule(date("2026-02-01")).await.entry_count(), 1);
        assert!(!eng_b.schedule_exists(date("2026-02-01")).await);
    }

    #[tokio::test]
    async fn tenant_lazy_creation() {
        let dir = test_data_dir("lazy");
        let tm = manager(dir.clone());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);

        let _eng = tm.get_or_create("my_db").await.unwrap();
        assert!(dir.join("my_db.wal").exists());
    }

    #[tokio::test]
    async fn tenant_same_engine_returned() {
        let tm = manager(test_data_dir("same_eng"));
        let eng1 = tm.get_or_create("foo").await.unwrap();
        let eng2 = tm.get_or_create("foo").await.unwrap();
        assert!(Arc::ptr_eq(&eng1, &eng2));
    }

    #[tokio::test]
    async fn concurrent_opens_share_one_engine() {
        let tm = Arc::new(manager(test_data_dir("concurrent_open")));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tm = tm.clone();
                tokio::spawn(async move { tm.get_or_create("shared").await.unwrap() })
            })
            .collect();
        let mut engines = Vec::new();
        for h in handles {
            engines.push(h.await.unwrap());
        }
        assert!(engines.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn wal_file_stem_escapes_everything_but_plain_names() {
        assert_eq!(wal_file_stem("my_db"), "my_db");
        assert_eq!(wal_file_stem("team.one"), "team-2eone");
        assert_eq!(wal_file_stem("../evil"), "-2e-2e-2fevil");
        assert_eq!(wal_file_stem("a-b"), "a-2db");
        assert_ne!(wal_file_stem("a-2eb"), wal_file_stem("a.b"));
    }

    #[tokio::test]
    async fn tenant_name_cannot_escape_data_dir() {
        let dir = test_data_dir("escape");
        let tm = manager(dir.clone());

        let _eng = tm.get_or_create("../evil").await.unwrap();
        assert!(dir.join("-2e-2e-2fevil.wal").exists());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 1);

        assert!(tm.get_or_create("").await.is_err());
    }

    #[tokio::test]
    async fn similar_tenant_names_keep_separate_wals() {
        let dir = test_data_dir("similar_names");
        {
            let tm = manager(dir.clone());
            let dotted = tm.get_or_create("team.one").await.unwrap();
            let plain = tm.get_or_create("teamone").await.unwrap();

            let alice = dotted.add_member("Alice").await.unwrap();
            dotted
                .add_on_leave(
                    date("2026-02-01"),
                    NewLeaveEntry {
                        member_id: alice.id,
                        member_name: alice.name.clone(),
                        reason: "Training".into(),
                    },
                )
                .await
                .unwrap();
            plain.add_member("Bob").await.unwrap();
        }
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 2);

        let tm = manager(dir);
        let plain = tm.get_or_create("teamone").await.unwrap();
        let names: Vec<String> = plain
            .list_all_members()
            .await
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["Bob"]);
        assert!(!plain.schedule_exists(date("2026-02-01")).await);

        let dotted = tm.get_or_create("team.one").await.unwrap();
        assert_eq!(dotted.member(1).await.map(|m| m.name), Some("Alice".into()));
        assert_eq!(dotted.schedule(date("2026-02-01")).await.on_leave.len(), 1);
    }

    #[tokio::test]
    async fn tenant_name_too_long() {
        let tm = manager(test_data_dir("name_too_long"));
        let long_name = "x".repeat(MAX_TENANT_NAME_LEN + 1);
        let err = tm.get_or_create(&long_name).await.err().unwrap();
        assert!(err.to_string().contains("tenant name too long"));
    }

    #[tokio::test]
    async fn tenant_count_limit() {
        let tm = manager(test_data_dir("count_limit"));
        for i in 0..MAX_TENANTS {
            tm.get_or_create(&format!("t{i}")).await.unwrap();
        }
        let err = tm.get_or_create("one_more").await.err().unwrap();
        assert!(err.to_string().contains("too many tenants"));
    }

    #[tokio::test]
    async fn seeded_tenant_starts_with_sample_data() {
        let dir = test_data_dir("seeded");
        let tm = manager(dir.clone()).with_seed(Seed::sample().unwrap());
        let engine = tm.get_or_create("team").await.unwrap();

        assert_eq!(engine.list_all_members().await.len(), 14);
        assert_eq!(engine.assignment_labels().await.len(), 5);
        let day = engine.schedule(date("2026-01-19")).await;
        assert_eq!(day.shift_entries().count(), 4);
        assert_eq!(day.on_leave.len(), 2);
        engine.remove_member(14).await.unwrap();
        drop(engine);
        drop(tm);

        // Reopening a tenant that already has data does not seed it again.
        let tm = manager(dir).with_seed(Seed::sample().unwrap());
        let engine = tm.get_or_create("team").await.unwrap();
        assert_eq!(engine.list_all_members().await.len(), 13);
        assert!(engine.member(14).await.is_none());
    }
}
