use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::{fs, sync::Mutex};
use tracing::{debug, info, warn};

/// Registro de una pista reproducida completa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub guild_id: u64,
    pub user_id: u64,
    pub title: String,
    pub url: String,
    pub duration_secs: u64,
    pub played_at: DateTime<Utc>,
}

/// Sumidero del historial de reproducción. El reproductor lo usa en modo
/// fire-and-forget: los errores se registran en el log y nunca se propagan.
#[async_trait]
pub trait HistoryRecorder: Send + Sync {
    async fn record(&self, entry: HistoryEntry) -> Result<()>;
}

/// Historial de reproducción basado en archivos JSON, uno por guild.
pub struct JsonStorage {
    data_dir: PathBuf,
    max_entries_per_guild: usize,
    // Serializa lecturas y escrituras de los archivos de historial
    file_lock: Mutex<()>,
}

impl JsonStorage {
    pub async fn new(data_dir: PathBuf, max_entries_per_guild: usize) -> Result<Self> {
        fs::create_dir_all(data_dir.join("history")).await?;

        info!("📁 Storage initialised at: {}", data_dir.display());

        Ok(Self {
            data_dir,
            max_entries_per_guild,
            file_lock: Mutex::new(()),
        })
    }

    /// Últimas `limit` entradas de una guild, la más reciente primero.
    pub async fn recent(&self, guild_id: u64, limit: usize) -> Result<Vec<HistoryEntry>> {
        let entries = {
            let _guard = self.file_lock.lock().await;
            self.load_history(guild_id).await?
        };
        Ok(entries.into_iter().rev().take(limit).collect())
    }

    /// Obtiene estadísticas de almacenamiento
    pub async fn get_storage_stats(&self) -> Result<StorageStats> {
        let history_dir = self.data_dir.join("history");
        let mut files = fs::read_dir(&history_dir).await?;
        let mut file_count = 0;
        let mut total_size = 0;

        while let Some(entry) = files.next_entry().await? {
            if entry.path().extension().map_or(false, |ext| ext == "json") {
                file_count += 1;
                if let Ok(metadata) = entry.metadata().await {
                    total_size += metadata.len();
                }
            }
        }

        Ok(StorageStats {
            history_files: file_count,
            total_size_bytes: total_size,
            data_dir: self.data_dir.clone(),
        })
    }

    async fn load_history(&self, guild_id: u64) -> Result<Vec<HistoryEntry>> {
        let path = self.history_file_path(guild_id);
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn append(&self, entry: HistoryEntry) -> Result<()> {
        let _guard = self.file_lock.lock().await;

        let guild_id = entry.guild_id;
        let mut entries = match self.load_history(guild_id).await {
            Ok(entries) => entries,
            Err(e) if e.is::<serde_json::Error>() => {
                let moved_to = self.quarantine(guild_id).await?;
                warn!(
                    "⚠️ History for guild {} is corrupt ({}), moved to {}",
                    guild_id,
                    e,
                    moved_to.display()
                );
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        entries.push(entry);
        if entries.len() > self.max_entries_per_guild {
            let excess = entries.len() - self.max_entries_per_guild;
            entries.drain(..excess);
        }

        let content = serde_json::to_string_pretty(&entries)?;
        fs::write(self.history_file_path(guild_id), content).await?;
        Ok(())
    }

    /// Aparta un archivo ilegible para no sobrescribirlo.
    async fn quarantine(&self, guild_id: u64) -> Result<PathBuf> {
        let path = self.history_file_path(guild_id);
        let target = path.with_extension(format!("json.corrupt-{}", Utc::now().timestamp()));
        fs::rename(&path, &target).await?;
        Ok(target)
    }

    fn history_file_path(&self, guild_id: u64) -> PathBuf {
        self.data_dir
            .join("history")
            .join(format!("guild_{}.json", guild_id))
    }
}

#[async_trait]
impl HistoryRecorder for JsonStorage {
    async fn record(&self, entry: HistoryEntry) -> Result<()> {
        debug!("📝 Recording history for guild {}: {}", entry.guild_id, entry.title);
        self.append(entry).await
    }
}

/// Estadísticas de almacenamiento
#[derive(Debug)]
pub struct StorageStats {
    pub history_files: usize,
    pub total_size_bytes: u64,
    pub data_dir: PathBuf,
}

impl std::fmt::Display for StorageStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "📊 Storage Stats: {} ({} history files, {:.2} KB)",
            self.data_dir.display(),
            self.history_files,
            self.total_size_bytes as f64 / 1024.0
        )
    }
}
