//! `EventStore` append-only sobre un archivo JSON-lines.
//!
//! - Una línea por `MigrationEvent`; nunca se reescriben líneas.
//! - Al abrir se cargan todas las líneas en memoria; `list` no toca disco.
//! - `append_kind` escribe y hace flush antes de devolver el evento: si la
//!   escritura falla el evento no queda en la cache.
//! - Una última línea sin `\n` que no parsea es una escritura interrumpida
//!   (crash a mitad de `append`): se descarta y se trunca. Una línea
//!   inválida en medio del archivo sigue siendo `CorruptLog`.
//! - El replay usa el mismo `InMemoryRunRepository` que el store en memoria.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use deploy_core::{DeployError, EventStore, MigrationEvent, MigrationEventKind};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::PersistenceError;

#[derive(Debug)]
pub struct FileEventStore {
    path: PathBuf,
    file: File,
    /// Bytes válidos del log; al fallar una escritura se trunca hasta aquí.
    len: u64,
    events: HashMap<Uuid, Vec<MigrationEvent>>,
    /// Runs en orden de inicialización dentro del archivo.
    runs: Vec<Uuid>,
}

impl FileEventStore {
    /// Abre (o crea) el log en `path`, creando directorios intermedios.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(PersistenceError::io(parent))?;
        }

        let raw = if path.exists() {
            fs::read(&path).map_err(PersistenceError::io(&path))?
        } else {
            Vec::new()
        };

        let mut events: HashMap<Uuid, Vec<MigrationEvent>> = HashMap::new();
        let mut runs = Vec::new();
        let mut valid_len = 0usize;
        let mut torn = false;
        let mut needs_newline = false;
        for (idx, line) in raw.split_inclusive(|b| *b == b'\n').enumerate() {
            let terminated = line.ends_with(b"\n");
            if line.iter().all(u8::is_ascii_whitespace) {
                valid_len += line.len();
                continue;
            }
            let ev: MigrationEvent = match serde_json::from_slice(line) {
                Ok(ev) => ev,
                // Última línea sin '\n': escritura interrumpida, se descarta.
                Err(source) if !terminated => {
                    warn!(path = %path.display(), line = idx + 1, error = %source, "discarding torn last line");
                    torn = true;
                    break;
                }
                Err(source) => {
                    return Err(PersistenceError::CorruptLog { path: path.clone(),
                                                              line: idx + 1,
                                                              source })
                }
            };
            valid_len += line.len();
            needs_newline = !terminated;
            if matches!(ev.kind, MigrationEventKind::RunInitialized { .. }) {
                runs.push(ev.run_id);
            }
            events.entry(ev.run_id).or_default().push(ev);
        }

        let mut file = OpenOptions::new().create(true)
                                         .append(true)
                                         .open(&path)
                                         .map_err(PersistenceError::io(&path))?;
        let mut len = valid_len as u64;
        if torn {
            file.set_len(len).map_err(PersistenceError::io(&path))?;
        }
        if needs_newline {
            file.write_all(b"\n").map_err(PersistenceError::io(&path))?;
            len += 1;
        }
        debug!(path = %path.display(), runs = runs.len(), "event log opened");
        Ok(Self { path,
                  file,
                  len,
                  events,
                  runs })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Último run inicializado en el log (el que se reanuda por defecto).
    pub fn latest_run(&self) -> Option<Uuid> {
        self.runs.last().copied()
    }

    pub fn runs(&self) -> &[Uuid] {
        &self.runs
    }

    fn write_line(&mut self, ev: &MigrationEvent) -> Result<(), PersistenceError> {
        let mut line = serde_json::to_string(ev).map_err(|source| PersistenceError::Json { path: self.path.clone(),
                                                                                           source })?;
        line.push('\n');
        let written = self.file
                          .write_all(line.as_bytes())
                          .and_then(|_| self.file.flush());
        if let Err(e) = written {
            // No dejar un fragmento al que se pegue el siguiente append.
            if let Err(trunc) = self.file.set_len(self.len) {
                warn!(path = %self.path.display(), error = %trunc, "could not truncate after failed append");
            }
            return Err(PersistenceError::io(&self.path)(e));
        }
        self.len += line.len() as u64;
        Ok(())
    }
}

impl EventStore for FileEventStore {
    fn append_kind(&mut self, run_id: Uuid, kind: MigrationEventKind) -> Result<MigrationEvent, DeployError> {
        let seq = self.events.get(&run_id).map_or(0, |v| v.len() as u64);
        let ev = MigrationEvent { seq,
                                  run_id,
                                  kind,
                                  ts: Utc::now() };
        if let Err(e) = self.write_line(&ev) {
            error!(%run_id, seq, error = %e, "append failed");
            return Err(e.into());
        }
        if matches!(ev.kind, MigrationEventKind::RunInitialized { .. }) {
            self.runs.push(run_id);
        }
        self.events.entry(run_id).or_default().push(ev.clone());
        Ok(ev)
    }

    fn list(&self, run_id: Uuid) -> Vec<MigrationEvent> {
        self.events.get(&run_id).cloned().unwrap_or_default()
    }
}
