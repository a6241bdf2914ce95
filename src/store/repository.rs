//! Repository Interface and SQLite Implementation
//!
//! The pipeline consumes the `Repository` trait; everything below it is an
//! implementation detail. `SqliteRepository` is the shipped implementation,
//! layered on the pooled [`Database`](super::database::Database).
//!
//! The one multi-table write path, applying an ingest plan, runs inside a
//! single transaction so a failed archive leaves no partial project rows.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info};

use super::database::SharedDatabase;
use crate::config::ScoreWeights;
use crate::ingest::plan::{IngestPlan, IngestReport, ProjectTarget};
use crate::types::{
    ConsentRecord, FileEntry, FileRecord, FolioError, GeneratedItem, Project, ProjectAnalysis,
    Result, Role, Skill, SkillKind, Upload,
};

/// Analysis-outcome columns written back onto a project row.
#[derive(Debug, Clone)]
pub struct ProjectUpdate {
    pub project_id: i64,
    pub language: Option<String>,
    pub framework: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_collaborative: bool,
    pub role: Role,
    pub contribution_pct: f64,
    pub role_justification: Option<String>,
    pub fingerprint: String,
}

/// Persistence contract consumed by the core, grouped into projects,
/// files, skills, analyses, consent, and generated items.
pub trait Repository: Send + Sync {
    // -- projects ---------------------------------------------------------
    fn get_project(&self, id: i64) -> Result<Project>;
    fn list_projects(&self) -> Result<Vec<Project>>;
    fn find_projects_by_name(&self, name: &str) -> Result<Vec<Project>>;
    fn update_project_analysis(&self, update: &ProjectUpdate) -> Result<()>;
    fn set_project_score(&self, project_id: i64, score: f64) -> Result<()>;
    fn delete_project(&self, id: i64) -> Result<()>;
    /// Persist new importance ranks. The rank set must be exactly `{1..n}`;
    /// otherwise nothing is mutated and `InvalidArgument` is returned.
    fn rerank(&self, ranks: &[(i64, i64)]) -> Result<()>;
    fn set_score_config(&self, weights: ScoreWeights) -> Result<()>;
    fn get_score_config(&self) -> Result<Option<ScoreWeights>>;

    // -- files ------------------------------------------------------------
    fn list_file_entries(&self, project_id: i64) -> Result<Vec<FileRecord>>;
    /// Latest-wins write of one file entry. The referenced content object
    /// must already exist.
    fn upsert_file_entry(&self, entry: &FileEntry) -> Result<()>;
    fn delete_file_entry(&self, project_id: i64, rel_path: &str) -> Result<()>;

    // -- skills -----------------------------------------------------------
    fn upsert_skill(&self, skill: &Skill) -> Result<i64>;
    /// Refresh the project's skill edges to exactly `desired` by
    /// set-difference: missing edges are added, stale edges removed, shared
    /// edges untouched.
    fn set_project_skills(&self, project_id: i64, desired: &[Skill]) -> Result<()>;
    fn project_skills(&self, project_id: i64) -> Result<Vec<Skill>>;

    // -- analyses ---------------------------------------------------------
    fn upsert_code_analysis(
        &self,
        project_id: i64,
        language: &str,
        metrics: &serde_json::Value,
        summary: &str,
    ) -> Result<()>;
    fn delete_code_analyses(&self, project_id: i64) -> Result<()>;

    // -- consent ----------------------------------------------------------
    fn upsert_consent(&self, record: &ConsentRecord) -> Result<()>;
    fn latest_consent(&self) -> Result<Option<ConsentRecord>>;

    // -- generated items --------------------------------------------------
    fn upsert_generated_item(&self, item: &GeneratedItem) -> Result<()>;
    fn get_generated_item(&self, kind: &str, project_id: i64) -> Result<Option<GeneratedItem>>;

    // -- analysis cache ---------------------------------------------------
    fn cached_analysis(&self, project_id: i64) -> Result<Option<(String, ProjectAnalysis)>>;
    fn store_cached_analysis(
        &self,
        project_id: i64,
        fingerprint: &str,
        analysis: &ProjectAnalysis,
    ) -> Result<()>;

    // -- ingest -----------------------------------------------------------
    /// Apply an ingest plan atomically: upload row, project rows, content
    /// object metadata, file entries (latest wins), artifact sources.
    fn apply_ingest(&self, plan: &IngestPlan) -> Result<IngestReport>;
    /// Upload lineage for one project: `(upload, artifact_count)`.
    fn project_uploads(&self, project_id: i64) -> Result<Vec<(Upload, u64)>>;
}

// =============================================================================
// SQLite implementation
// =============================================================================

pub struct SqliteRepository {
    db: SharedDatabase,
}

impl SqliteRepository {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    fn row_to_project(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
        let role_str: String = row.get("role")?;
        Ok(Project {
            id: row.get("id")?,
            name: row.get("name")?,
            rel_path: row.get("rel_path")?,
            language: row.get("language")?,
            framework: row.get("framework")?,
            start_date: parse_ts(row.get::<_, Option<String>>("start_date")?),
            end_date: parse_ts(row.get::<_, Option<String>>("end_date")?),
            is_collaborative: row.get::<_, i64>("is_collaborative")? != 0,
            role: role_str.parse().unwrap_or(Role::Unknown),
            contribution_pct: row.get("contribution_pct")?,
            role_justification: row.get("role_justification")?,
            importance_rank: row.get("importance_rank")?,
            importance_score: row.get("importance_score")?,
            showcase: row.get::<_, i64>("showcase")? != 0,
            thumbnail: row.get("thumbnail")?,
            file_count: row.get::<_, i64>("file_count")? as u64,
            has_git: row.get::<_, i64>("has_git")? != 0,
            last_fingerprint: row.get("last_fingerprint")?,
            created_at: parse_ts(row.get::<_, Option<String>>("created_at")?)
                .unwrap_or_else(Utc::now),
            updated_at: parse_ts(row.get::<_, Option<String>>("updated_at")?)
                .unwrap_or_else(Utc::now),
        })
    }

    fn apply_project_plan(
        conn: &Connection,
        plan: &crate::ingest::plan::ProjectPlan,
        upload_id: i64,
        now: &str,
        report: &mut IngestReport,
    ) -> Result<()> {
        let (project_id, created) = match &plan.target {
            ProjectTarget::New { name, rel_path } => {
                conn.execute(
                    "INSERT INTO projects (name, rel_path, has_git, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?4)",
                    params![name, rel_path, plan.has_git as i64, now],
                )?;
                let id = conn.last_insert_rowid();
                report.created.push((id, name.clone()));
                (id, true)
            }
            ProjectTarget::Existing { project_id } => {
                let exists: bool = conn
                    .query_row(
                        "SELECT 1 FROM projects WHERE id = ?1",
                        [project_id],
                        |_| Ok(true),
                    )
                    .optional()?
                    .unwrap_or(false);
                if !exists {
                    return Err(FolioError::NotFound(format!("project {}", project_id)));
                }
                (*project_id, false)
            }
        };

        // Existing entries, for dedup decisions.
        let mut existing: HashMap<String, String> = HashMap::new();
        {
            let mut stmt = conn
                .prepare("SELECT rel_path, content_hash FROM file_entries WHERE project_id = ?1")?;
            let rows = stmt.query_map([project_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (path, hash) = row?;
                existing.insert(path, hash);
            }
        }

        let mut touched: u64 = 0;
        for file in &plan.files {
            conn.execute(
                "INSERT OR IGNORE INTO content_objects (hash, size, mime) VALUES (?1, ?2, ?3)",
                params![file.content_hash, file.size as i64, file.mime.as_str()],
            )?;

            match existing.get(&file.rel_path) {
                Some(hash) if *hash == file.content_hash => {
                    // Byte-identical under the same path: dedup, no-op.
                }
                Some(_) => {
                    conn.execute(
                        "UPDATE file_entries SET content_hash = ?3
                         WHERE project_id = ?1 AND rel_path = ?2",
                        params![project_id, file.rel_path, file.content_hash],
                    )?;
                    touched += 1;
                }
                None => {
                    conn.execute(
                        "INSERT INTO file_entries (project_id, rel_path, content_hash)
                         VALUES (?1, ?2, ?3)",
                        params![project_id, file.rel_path, file.content_hash],
                    )?;
                    touched += 1;
                }
            }
        }

        let artifact_count = if created {
            plan.files.len() as u64
        } else {
            touched
        };
        conn.execute(
            "INSERT INTO artifact_sources (project_id, upload_id, artifact_count)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (project_id, upload_id) DO UPDATE SET artifact_count = ?3",
            params![project_id, upload_id, artifact_count as i64],
        )?;

        // Visible file count excludes version-control metadata.
        let file_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM file_entries
             WHERE project_id = ?1 AND rel_path NOT LIKE '.git/%' AND rel_path != '.git'",
            [project_id],
            |row| row.get(0),
        )?;
        conn.execute(
            "UPDATE projects
             SET file_count = ?2, has_git = has_git OR ?3, updated_at = ?4
             WHERE id = ?1",
            params![project_id, file_count, plan.has_git as i64, now],
        )?;

        // Mtime range from archive entries seeds the project dates; git
        // history overwrites them at analysis time when present.
        let mtimes: Vec<DateTime<Utc>> = plan.files.iter().filter_map(|f| f.modified).collect();
        if let (Some(min), Some(max)) = (mtimes.iter().min(), mtimes.iter().max()) {
            conn.execute(
                "UPDATE projects SET
                    start_date = MIN(COALESCE(start_date, ?2), ?2),
                    end_date = MAX(COALESCE(end_date, ?3), ?3)
                 WHERE id = ?1",
                params![project_id, min.to_rfc3339(), max.to_rfc3339()],
            )?;
        }

        if !created {
            report.appended.push((project_id, touched));
        }
        Ok(())
    }
}

impl Repository for SqliteRepository {
    fn get_project(&self, id: i64) -> Result<Project> {
        let conn = self.db.conn()?;
        conn.query_row("SELECT * FROM projects WHERE id = ?1", [id], |row| {
            Self::row_to_project(row)
        })
        .optional()?
        .ok_or_else(|| FolioError::NotFound(format!("project {}", id)))
    }

    fn list_projects(&self) -> Result<Vec<Project>> {
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM projects
             ORDER BY importance_rank IS NULL, importance_rank, name",
        )?;
        let rows = stmt.query_map([], |row| Self::row_to_project(row))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn find_projects_by_name(&self, name: &str) -> Result<Vec<Project>> {
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare("SELECT * FROM projects WHERE name = ?1")?;
        let rows = stmt.query_map([name], |row| Self::row_to_project(row))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn update_project_analysis(&self, update: &ProjectUpdate) -> Result<()> {
        let conn = self.db.conn()?;
        let changed = conn.execute(
            "UPDATE projects SET
                language = ?2, framework = ?3, start_date = ?4, end_date = ?5,
                is_collaborative = ?6, role = ?7, contribution_pct = ?8,
                role_justification = ?9, last_fingerprint = ?10, updated_at = ?11
             WHERE id = ?1",
            params![
                update.project_id,
                update.language,
                update.framework,
                update.start_date.map(|d| d.to_rfc3339()),
                update.end_date.map(|d| d.to_rfc3339()),
                update.is_collaborative as i64,
                update.role.as_str(),
                update.contribution_pct,
                update.role_justification,
                update.fingerprint,
                Utc::now().to_rfc3339(),
            ],
        )?;
        if changed == 0 {
            return Err(FolioError::NotFound(format!(
                "project {}",
                update.project_id
            )));
        }
        Ok(())
    }

    fn set_project_score(&self, project_id: i64, score: f64) -> Result<()> {
        let conn = self.db.conn()?;
        conn.execute(
            "UPDATE projects SET importance_score = ?2, updated_at = ?3 WHERE id = ?1",
            params![project_id, score, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn delete_project(&self, id: i64) -> Result<()> {
        let conn = self.db.conn()?;
        let changed = conn.execute("DELETE FROM projects WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(FolioError::NotFound(format!("project {}", id)));
        }
        info!("Deleted project {} (cascade)", id);
        Ok(())
    }

    fn rerank(&self, ranks: &[(i64, i64)]) -> Result<()> {
        // Uniqueness pre-check: ranks must be exactly {1..n}.
        let expected: BTreeSet<i64> = (1..=ranks.len() as i64).collect();
        let provided: BTreeSet<i64> = ranks.iter().map(|(_, rank)| *rank).collect();
        if provided != expected {
            return Err(FolioError::InvalidArgument(format!(
                "ranks must be a permutation of 1..={}, got {:?}",
                ranks.len(),
                ranks.iter().map(|(_, r)| *r).collect::<Vec<_>>()
            )));
        }
        let ids: HashSet<i64> = ranks.iter().map(|(id, _)| *id).collect();
        if ids.len() != ranks.len() {
            return Err(FolioError::InvalidArgument(
                "duplicate project id in rerank request".to_string(),
            ));
        }

        self.db.transaction(|conn| {
            for (project_id, rank) in ranks {
                let changed = conn.execute(
                    "UPDATE projects SET importance_rank = ?2, updated_at = ?3 WHERE id = ?1",
                    params![project_id, rank, Utc::now().to_rfc3339()],
                )?;
                if changed == 0 {
                    return Err(FolioError::NotFound(format!("project {}", project_id)));
                }
            }
            Ok(())
        })
    }

    fn set_score_config(&self, weights: ScoreWeights) -> Result<()> {
        weights.validate()?;
        let conn = self.db.conn()?;
        conn.execute(
            "INSERT INTO score_config (id, contribution, diversity, duration, file_count)
             VALUES (1, ?1, ?2, ?3, ?4)
             ON CONFLICT (id) DO UPDATE SET
                contribution = ?1, diversity = ?2, duration = ?3, file_count = ?4",
            params![
                weights.contribution,
                weights.diversity,
                weights.duration,
                weights.file_count
            ],
        )?;
        Ok(())
    }

    fn get_score_config(&self) -> Result<Option<ScoreWeights>> {
        let conn = self.db.conn()?;
        Ok(conn
            .query_row(
                "SELECT contribution, diversity, duration, file_count FROM score_config WHERE id = 1",
                [],
                |row| {
                    Ok(ScoreWeights {
                        contribution: row.get(0)?,
                        diversity: row.get(1)?,
                        duration: row.get(2)?,
                        file_count: row.get(3)?,
                    })
                },
            )
            .optional()?)
    }

    fn list_file_entries(&self, project_id: i64) -> Result<Vec<FileRecord>> {
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(
            "SELECT fe.rel_path, fe.content_hash, co.size
             FROM file_entries fe
             JOIN content_objects co ON co.hash = fe.content_hash
             WHERE fe.project_id = ?1
             ORDER BY fe.rel_path",
        )?;
        let rows = stmt.query_map([project_id], |row| {
            Ok(FileRecord {
                rel_path: row.get(0)?,
                content_hash: row.get(1)?,
                size: row.get::<_, i64>(2)? as u64,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn upsert_file_entry(&self, entry: &FileEntry) -> Result<()> {
        let conn = self.db.conn()?;
        conn.execute(
            "INSERT INTO file_entries (project_id, rel_path, content_hash)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (project_id, rel_path) DO UPDATE SET content_hash = ?3",
            params![entry.project_id, entry.rel_path, entry.content_hash],
        )?;
        Ok(())
    }

    fn delete_file_entry(&self, project_id: i64, rel_path: &str) -> Result<()> {
        let conn = self.db.conn()?;
        conn.execute(
            "DELETE FROM file_entries WHERE project_id = ?1 AND rel_path = ?2",
            params![project_id, rel_path],
        )?;
        Ok(())
    }

    fn upsert_skill(&self, skill: &Skill) -> Result<i64> {
        let conn = self.db.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO skills (name, kind) VALUES (?1, ?2)",
            params![skill.name, skill.kind.as_str()],
        )?;
        let id: i64 = conn.query_row(
            "SELECT id FROM skills WHERE name = ?1 AND kind = ?2",
            params![skill.name, skill.kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn set_project_skills(&self, project_id: i64, desired: &[Skill]) -> Result<()> {
        let mut desired_ids = BTreeSet::new();
        for skill in desired {
            desired_ids.insert(self.upsert_skill(skill)?);
        }

        self.db.transaction(|conn| {
            let mut current = BTreeSet::new();
            {
                let mut stmt =
                    conn.prepare("SELECT skill_id FROM project_skills WHERE project_id = ?1")?;
                let rows = stmt.query_map([project_id], |row| row.get::<_, i64>(0))?;
                for row in rows {
                    current.insert(row?);
                }
            }

            for stale in current.difference(&desired_ids) {
                conn.execute(
                    "DELETE FROM project_skills WHERE project_id = ?1 AND skill_id = ?2",
                    params![project_id, stale],
                )?;
            }
            for missing in desired_ids.difference(&current) {
                conn.execute(
                    "INSERT INTO project_skills (project_id, skill_id) VALUES (?1, ?2)",
                    params![project_id, missing],
                )?;
            }
            Ok(())
        })
    }

    fn project_skills(&self, project_id: i64) -> Result<Vec<Skill>> {
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(
            "SELECT s.name, s.kind FROM skills s
             JOIN project_skills ps ON ps.skill_id = s.id
             WHERE ps.project_id = ?1
             ORDER BY s.kind, s.name",
        )?;
        let rows = stmt.query_map([project_id], |row| {
            let name: String = row.get(0)?;
            let kind: String = row.get(1)?;
            Ok((name, kind))
        })?;
        let mut skills = Vec::new();
        for row in rows {
            let (name, kind) = row?;
            let kind: SkillKind = kind
                .parse()
                .map_err(|e: String| FolioError::Storage(e))?;
            skills.push(Skill { name, kind });
        }
        Ok(skills)
    }

    fn upsert_code_analysis(
        &self,
        project_id: i64,
        language: &str,
        metrics: &serde_json::Value,
        summary: &str,
    ) -> Result<()> {
        let conn = self.db.conn()?;
        conn.execute(
            "INSERT INTO code_analyses (project_id, language, metrics, summary, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (project_id, language) DO UPDATE SET
                metrics = ?3, summary = ?4, updated_at = ?5",
            params![
                project_id,
                language,
                serde_json::to_string(metrics)?,
                summary,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn delete_code_analyses(&self, project_id: i64) -> Result<()> {
        let conn = self.db.conn()?;
        conn.execute(
            "DELETE FROM code_analyses WHERE project_id = ?1",
            [project_id],
        )?;
        Ok(())
    }

    fn upsert_consent(&self, record: &ConsentRecord) -> Result<()> {
        let conn = self.db.conn()?;
        conn.execute(
            "INSERT INTO consent_records (allow_llm, allowed_models, ignore_patterns, recorded_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.allow_llm as i64,
                serde_json::to_string(&record.allowed_models)?,
                serde_json::to_string(&record.ignore_patterns)?,
                record.recorded_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn latest_consent(&self) -> Result<Option<ConsentRecord>> {
        let conn = self.db.conn()?;
        let row = conn
            .query_row(
                "SELECT allow_llm, allowed_models, ignore_patterns, recorded_at
                 FROM consent_records ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)? != 0,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((allow_llm, models, patterns, recorded_at)) => Ok(Some(ConsentRecord {
                allow_llm,
                allowed_models: serde_json::from_str(&models)?,
                ignore_patterns: serde_json::from_str(&patterns)?,
                recorded_at: parse_ts(Some(recorded_at)).unwrap_or_else(Utc::now),
            })),
        }
    }

    fn upsert_generated_item(&self, item: &GeneratedItem) -> Result<()> {
        let conn = self.db.conn()?;
        conn.execute(
            "INSERT INTO generated_items (kind, project_id, payload, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (kind, project_id) DO UPDATE SET payload = ?3, created_at = ?4",
            params![
                item.kind,
                item.project_id,
                serde_json::to_string(&item.payload)?,
                item.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_generated_item(&self, kind: &str, project_id: i64) -> Result<Option<GeneratedItem>> {
        let conn = self.db.conn()?;
        let row = conn
            .query_row(
                "SELECT payload, created_at FROM generated_items
                 WHERE kind = ?1 AND project_id = ?2",
                params![kind, project_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        match row {
            None => Ok(None),
            Some((payload, created_at)) => Ok(Some(GeneratedItem {
                kind: kind.to_string(),
                project_id,
                payload: serde_json::from_str(&payload)?,
                created_at: parse_ts(Some(created_at)).unwrap_or_else(Utc::now),
            })),
        }
    }

    fn cached_analysis(&self, project_id: i64) -> Result<Option<(String, ProjectAnalysis)>> {
        let conn = self.db.conn()?;
        let row = conn
            .query_row(
                "SELECT fingerprint, payload FROM analysis_cache WHERE project_id = ?1",
                [project_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        match row {
            None => Ok(None),
            Some((fingerprint, payload)) => {
                let analysis: ProjectAnalysis = serde_json::from_str(&payload)?;
                Ok(Some((fingerprint, analysis)))
            }
        }
    }

    fn store_cached_analysis(
        &self,
        project_id: i64,
        fingerprint: &str,
        analysis: &ProjectAnalysis,
    ) -> Result<()> {
        let conn = self.db.conn()?;
        conn.execute(
            "INSERT INTO analysis_cache (project_id, fingerprint, payload, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (project_id) DO UPDATE SET
                fingerprint = ?2, payload = ?3, created_at = ?4",
            params![
                project_id,
                fingerprint,
                serde_json::to_string(analysis)?,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn apply_ingest(&self, plan: &IngestPlan) -> Result<IngestReport> {
        self.db.transaction(|conn| {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO uploads (filename, size_bytes, content_root, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![plan.filename, plan.size_bytes as i64, plan.content_root, now],
            )?;
            let upload_id = conn.last_insert_rowid();

            let mut report = IngestReport {
                upload_id,
                ..Default::default()
            };

            for project_plan in &plan.projects {
                Self::apply_project_plan(conn, project_plan, upload_id, &now, &mut report)?;
            }

            debug!(
                "Applied ingest of {}: {} created, {} appended",
                plan.filename,
                report.created.len(),
                report.appended.len()
            );
            Ok(report)
        })
    }

    fn project_uploads(&self, project_id: i64) -> Result<Vec<(Upload, u64)>> {
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(
            "SELECT u.id, u.filename, u.size_bytes, u.content_root, u.created_at,
                    a.artifact_count
             FROM uploads u
             JOIN artifact_sources a ON a.upload_id = u.id
             WHERE a.project_id = ?1
             ORDER BY u.created_at, u.id",
        )?;
        let rows = stmt.query_map([project_id], |row| {
            Ok((
                Upload {
                    id: row.get(0)?,
                    filename: row.get(1)?,
                    size_bytes: row.get::<_, i64>(2)? as u64,
                    content_root: row.get(3)?,
                    created_at: parse_ts(Some(row.get::<_, String>(4)?))
                        .unwrap_or_else(Utc::now),
                },
                row.get::<_, i64>(5)? as u64,
            ))
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn parse_ts(value: Option<String>) -> Option<DateTime<Utc>> {
    value.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::plan::{FilePayload, ProjectPlan};
    use crate::store::database::Database;
    use crate::types::MimeCategory;
    use std::sync::Arc;

    fn repo() -> SqliteRepository {
        SqliteRepository::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    fn payload(path: &str, hash: &str) -> FilePayload {
        FilePayload {
            rel_path: path.to_string(),
            content_hash: hash.to_string(),
            size: 10,
            mime: MimeCategory::from_path(path),
            modified: None,
        }
    }

    fn new_project_plan(name: &str, files: Vec<FilePayload>) -> IngestPlan {
        IngestPlan {
            filename: format!("{}.zip", name),
            size_bytes: 100,
            content_root: String::new(),
            projects: vec![ProjectPlan {
                target: ProjectTarget::New {
                    name: name.to_string(),
                    rel_path: name.to_string(),
                },
                files,
                has_git: false,
            }],
        }
    }

    #[test]
    fn test_apply_ingest_creates_project_and_entries() {
        let repo = repo();
        let report = repo
            .apply_ingest(&new_project_plan(
                "demo",
                vec![payload("main.py", "h1"), payload("README.md", "h2")],
            ))
            .unwrap();

        assert_eq!(report.created.len(), 1);
        let (project_id, _) = report.created[0];
        let project = repo.get_project(project_id).unwrap();
        assert_eq!(project.file_count, 2);
        assert_eq!(repo.list_file_entries(project_id).unwrap().len(), 2);

        let uploads = repo.project_uploads(project_id).unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].1, 2);
    }

    #[test]
    fn test_incremental_merge_dedups_unchanged_files() {
        let repo = repo();
        let report = repo
            .apply_ingest(&new_project_plan(
                "demo",
                vec![payload("main.py", "h1"), payload("util.py", "h2")],
            ))
            .unwrap();
        let (project_id, _) = report.created[0];

        // Second upload: main.py unchanged, api.py new.
        let second = IngestPlan {
            filename: "demo2.zip".to_string(),
            size_bytes: 50,
            content_root: String::new(),
            projects: vec![ProjectPlan {
                target: ProjectTarget::Existing { project_id },
                files: vec![payload("main.py", "h1"), payload("api.py", "h3")],
                has_git: false,
            }],
        };
        let report2 = repo.apply_ingest(&second).unwrap();

        assert_eq!(report2.appended, vec![(project_id, 1)]);
        assert_eq!(repo.list_file_entries(project_id).unwrap().len(), 3);
        let uploads = repo.project_uploads(project_id).unwrap();
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads[1].1, 1);
    }

    #[test]
    fn test_replay_is_a_no_op() {
        let repo = repo();
        let plan = new_project_plan("demo", vec![payload("main.py", "h1")]);
        let report = repo.apply_ingest(&plan).unwrap();
        let (project_id, _) = report.created[0];

        let replay = IngestPlan {
            projects: vec![ProjectPlan {
                target: ProjectTarget::Existing { project_id },
                files: vec![payload("main.py", "h1")],
                has_git: false,
            }],
            ..plan
        };
        let report2 = repo.apply_ingest(&replay).unwrap();
        assert_eq!(report2.appended, vec![(project_id, 0)]);
        assert_eq!(repo.list_file_entries(project_id).unwrap().len(), 1);
    }

    #[test]
    fn test_latest_wins_on_changed_hash() {
        let repo = repo();
        let report = repo
            .apply_ingest(&new_project_plan("demo", vec![payload("main.py", "h1")]))
            .unwrap();
        let (project_id, _) = report.created[0];

        let update = IngestPlan {
            filename: "v2.zip".to_string(),
            size_bytes: 10,
            content_root: String::new(),
            projects: vec![ProjectPlan {
                target: ProjectTarget::Existing { project_id },
                files: vec![payload("main.py", "h9")],
                has_git: false,
            }],
        };
        repo.apply_ingest(&update).unwrap();
        let entries = repo.list_file_entries(project_id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].content_hash, "h9");
    }

    #[test]
    fn test_rerank_rejects_duplicate_ranks() {
        let repo = repo();
        let r1 = repo
            .apply_ingest(&new_project_plan("one", vec![payload("a.py", "h1")]))
            .unwrap();
        let r2 = repo
            .apply_ingest(&new_project_plan("two", vec![payload("b.py", "h2")]))
            .unwrap();
        let id1 = r1.created[0].0;
        let id2 = r2.created[0].0;

        let err = repo.rerank(&[(id1, 1), (id2, 1)]).unwrap_err();
        assert!(matches!(err, FolioError::InvalidArgument(_)));
        // No mutation happened.
        assert_eq!(repo.get_project(id1).unwrap().importance_rank, None);

        repo.rerank(&[(id1, 2), (id2, 1)]).unwrap();
        assert_eq!(repo.get_project(id1).unwrap().importance_rank, Some(2));
        // Idempotent.
        repo.rerank(&[(id1, 2), (id2, 1)]).unwrap();
        assert_eq!(repo.get_project(id2).unwrap().importance_rank, Some(1));
    }

    #[test]
    fn test_file_entry_upsert_and_delete() {
        let repo = repo();
        let report = repo
            .apply_ingest(&new_project_plan("demo", vec![payload("a.py", "h1")]))
            .unwrap();
        let project_id = report.created[0].0;

        repo.upsert_file_entry(&FileEntry {
            project_id,
            rel_path: "a.py".to_string(),
            content_hash: "h1".to_string(),
        })
        .unwrap();
        assert_eq!(repo.list_file_entries(project_id).unwrap().len(), 1);

        repo.delete_file_entry(project_id, "a.py").unwrap();
        assert!(repo.list_file_entries(project_id).unwrap().is_empty());
    }

    #[test]
    fn test_skill_upsert_is_idempotent() {
        let repo = repo();
        let first = repo.upsert_skill(&Skill::tool("Docker")).unwrap();
        let second = repo.upsert_skill(&Skill::tool("Docker")).unwrap();
        assert_eq!(first, second);
        // Same name, different kind is a distinct skill.
        let practice = repo.upsert_skill(&Skill::practice("Docker")).unwrap();
        assert_ne!(first, practice);
    }

    #[test]
    fn test_set_project_skills_by_difference() {
        let repo = repo();
        let report = repo
            .apply_ingest(&new_project_plan("demo", vec![payload("a.py", "h1")]))
            .unwrap();
        let project_id = report.created[0].0;

        repo.set_project_skills(project_id, &[Skill::tool("Docker"), Skill::practice("CI/CD")])
            .unwrap();
        assert_eq!(repo.project_skills(project_id).unwrap().len(), 2);

        repo.set_project_skills(project_id, &[Skill::tool("Docker"), Skill::tool("PyTest")])
            .unwrap();
        let skills = repo.project_skills(project_id).unwrap();
        assert_eq!(skills.len(), 2);
        assert!(skills.contains(&Skill::tool("PyTest")));
        assert!(!skills.contains(&Skill::practice("CI/CD")));
    }

    #[test]
    fn test_consent_latest_wins() {
        let repo = repo();
        assert!(repo.latest_consent().unwrap().is_none());

        let mut record = ConsentRecord::deny();
        repo.upsert_consent(&record).unwrap();
        record.allow_llm = true;
        repo.upsert_consent(&record).unwrap();

        let latest = repo.latest_consent().unwrap().unwrap();
        assert!(latest.allow_llm);
    }

    #[test]
    fn test_score_config_round_trip() {
        let repo = repo();
        assert!(repo.get_score_config().unwrap().is_none());
        let weights = ScoreWeights {
            contribution: 0.5,
            diversity: 0.2,
            duration: 0.2,
            file_count: 0.1,
        };
        repo.set_score_config(weights).unwrap();
        let loaded = repo.get_score_config().unwrap().unwrap();
        assert!((loaded.contribution - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_cached_analysis_round_trip() {
        let repo = repo();
        let report = repo
            .apply_ingest(&new_project_plan("demo", vec![payload("a.py", "h1")]))
            .unwrap();
        let project_id = report.created[0].0;

        assert!(repo.cached_analysis(project_id).unwrap().is_none());
        let analysis = ProjectAnalysis::empty("demo");
        repo.store_cached_analysis(project_id, "fp1", &analysis)
            .unwrap();
        let (fp, cached) = repo.cached_analysis(project_id).unwrap().unwrap();
        assert_eq!(fp, "fp1");
        assert_eq!(cached.project_path, "demo");
    }
}
