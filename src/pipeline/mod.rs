//! Unified Analysis Pipeline
//!
//! Orchestrates one project end to end: fingerprint gate, language
//! detection, skill extraction, code analysis, git metrics and role,
//! then batch scoring and persistence.
//!
//! Concurrency model: each project analysis runs under a per-project
//! advisory lock (contention is `Conflict`, never blocking); batches are
//! sequential unless the caller opts into a bounded worker pool.
//! Cancellation is cooperative, checked between stages.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::DashSet;
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::ai::{ConsentGate, SharedProvider};
use crate::analyzer::{
    AnalyzerRegistry, SkillContext, SourceFile, augment_skills, detect_language_and_framework,
    extract_skills, generic_report, load_sources,
};
use crate::config::Config;
use crate::gitx::{GitLog, classify_role, compute_metrics};
use crate::score::{ScoreInputs, score_batch};
use crate::store::{ContentStore, ProjectUpdate, Repository, fingerprint_entries};
use crate::types::{
    CodeMetrics, FileRecord, FolioError, LanguageReport, Project, ProjectAnalysis, Result, Role,
    SkillSet,
};

/// Cooperative cancellation flag, checked between pipeline stages. An
/// in-flight subprocess or LLM call completes; its output is discarded.
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(FolioError::Cancelled)
        } else {
            Ok(())
        }
    }
}

pub struct Pipeline {
    store: Arc<ContentStore>,
    repository: Arc<dyn Repository>,
    git: Arc<dyn GitLog>,
    provider: Option<SharedProvider>,
    registry: AnalyzerRegistry,
    config: Config,
    /// Per-project advisory locks.
    active: DashSet<i64>,
}

/// RAII guard for the per-project lock.
struct ProjectLock<'a> {
    active: &'a DashSet<i64>,
    project_id: i64,
}

impl<'a> ProjectLock<'a> {
    fn acquire(active: &'a DashSet<i64>, project_id: i64) -> Result<Self> {
        if !active.insert(project_id) {
            return Err(FolioError::Conflict { project_id });
        }
        Ok(Self { active, project_id })
    }
}

impl Drop for ProjectLock<'_> {
    fn drop(&mut self) {
        self.active.remove(&self.project_id);
    }
}

impl Pipeline {
    pub fn new(
        store: Arc<ContentStore>,
        repository: Arc<dyn Repository>,
        git: Arc<dyn GitLog>,
        provider: Option<SharedProvider>,
        config: Config,
    ) -> Self {
        Self {
            store,
            repository,
            git,
            provider,
            registry: AnalyzerRegistry::standard(),
            config,
            active: DashSet::new(),
        }
    }

    /// Analyse a batch of projects, then score and rank them together.
    /// Per-project failures degrade that project and never abort the rest.
    pub async fn analyse_batch(
        &self,
        project_ids: &[i64],
        force: bool,
        token: &CancellationToken,
    ) -> Result<Vec<ProjectAnalysis>> {
        let jobs = self.config.analysis.worker_pool.max(1);

        let mut analyses: Vec<(i64, ProjectAnalysis)> = futures::stream::iter(
            project_ids.iter().map(|id| async move {
                match self.analyse_project(*id, force, token).await {
                    Ok(analysis) => Some((*id, analysis)),
                    Err(FolioError::Cancelled) => None,
                    Err(e) => {
                        warn!("Analysis of project {} failed: {}", id, e);
                        None
                    }
                }
            }),
        )
        .buffer_unordered(jobs)
        .filter_map(|item| async move { item })
        .collect()
        .await;

        token.check()?;

        // Stable batch order for deterministic scoring.
        analyses.sort_by_key(|(id, _)| *id);

        self.score_and_rank(&mut analyses).await?;
        Ok(analyses.into_iter().map(|(_, a)| a).collect())
    }

    /// Analyse one project through the detection, skill, code and git
    /// stages. Scoring happens at batch level; the returned record
    /// carries a zero score until then.
    pub async fn analyse_project(
        &self,
        project_id: i64,
        force: bool,
        token: &CancellationToken,
    ) -> Result<ProjectAnalysis> {
        let _lock = ProjectLock::acquire(&self.active, project_id)?;
        token.check()?;

        let project = self.repository.get_project(project_id)?;
        let entries = self.repository.list_file_entries(project_id)?;

        let pairs: Vec<(String, String)> = entries
            .iter()
            .map(|e| (e.rel_path.clone(), e.content_hash.clone()))
            .collect();
        let fingerprint = fingerprint_entries(&pairs);

        // Fingerprint gate: unchanged file set and not forced -> cached
        // result, no git or LLM I/O.
        if !force
            && project.last_fingerprint.as_deref() == Some(fingerprint.as_str())
            && let Some((cached_fp, cached)) = self.repository.cached_analysis(project_id)?
            && cached_fp == fingerprint
        {
            debug!("Fingerprint unchanged for project {}; using cache", project_id);
            return Ok(cached);
        }

        info!("Analysing project {} ({})", project_id, project.name);
        let mut analysis = ProjectAnalysis::empty(&project.rel_path);
        if analysis.project_path.is_empty() {
            analysis.project_path = project.name.clone();
        }

        let gate = ConsentGate::load(
            self.repository.as_ref(),
            self.provider.is_some() && self.config.llm.is_configured(),
        )?;

        // Inputs shared by several stages.
        let visible: Vec<FileRecord> = entries
            .iter()
            .filter(|e| !is_git_path(&e.rel_path))
            .cloned()
            .collect();
        let hash_by_path: HashMap<String, String> = entries
            .iter()
            .map(|e| (e.rel_path.clone(), e.content_hash.clone()))
            .collect();
        let store = Arc::clone(&self.store);
        let read_string = {
            let hash_by_path = hash_by_path.clone();
            let store = Arc::clone(&store);
            move |path: &str| -> Option<String> {
                let hash = hash_by_path.get(path)?;
                store
                    .get(hash)
                    .ok()
                    .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            }
        };

        // Git history is an input to both skill extraction and role
        // detection; fetch it once, ahead of the staged computation.
        let commits = if project.has_git {
            match self.fetch_history(&project, &entries).await {
                Ok(commits) => Some(commits),
                Err(e) => {
                    // Damaged metadata is treated as "no git".
                    analysis.diagnose(format!("git history unavailable: {}", e));
                    None
                }
            }
        } else {
            None
        };

        token.check()?;

        // ---- language / framework ----------------------------------------
        let (language, framework) = detect_language_and_framework(&visible, &read_string);
        analysis.language = language.clone();
        analysis.framework = framework;

        token.check()?;

        // ---- skills --------------------------------------------------------
        let metrics = commits
            .as_deref()
            .map(|c| compute_metrics(c, &self.config.identity));
        let skill_ctx = SkillContext {
            files: &visible,
            read: &read_string,
            metrics: metrics.as_ref(),
            commits: commits.as_deref(),
        };
        let mut skills = extract_skills(&skill_ctx);
        if gate.can_use_llm()
            && let Some(provider) = &self.provider
        {
            skills = augment_skills(
                skills,
                &skill_ctx,
                provider.as_ref(),
                Duration::from_secs(self.config.llm.timeout_secs),
            )
            .await;
        }
        analysis.tools = skills.tools.iter().cloned().collect();
        analysis.practices = skills.practices.iter().cloned().collect();

        token.check()?;

        // ---- language-specific code analysis ------------------------------
        let read_bytes = |path: &str| -> Option<Vec<u8>> {
            hash_by_path.get(path).and_then(|hash| store.get(hash).ok())
        };
        let (sources, source_diagnostics) = load_sources(
            &visible,
            &read_bytes,
            self.config.analysis.max_file_bytes,
        );
        for diagnostic in source_diagnostics {
            analysis.diagnose(diagnostic);
        }
        let reports = self.run_analysers(&language, &sources, &mut analysis);
        aggregate_reports(&mut analysis, &reports);

        token.check()?;

        // ---- git metrics & role -------------------------------------------
        if let Some(metrics) = &metrics {
            analysis.git = Some(metrics.to_summary());
            analysis.is_collaborative = metrics.is_collaborative();
            let user_matched = metrics.user_commits > 0;
            let outcome = classify_role(metrics, user_matched);
            analysis.role = outcome.role;
            analysis.contribution_pct = outcome.contribution_pct;
            analysis.role_justification = Some(outcome.justification);
        } else {
            analysis.role = Role::Unknown;
        }

        token.check()?;

        // ---- persistence ----------------------------------------------------
        self.persist_analysis(&project, &analysis, &skills, &reports, &fingerprint)?;

        Ok(analysis)
    }

    /// Rebuild the project tree (history included) and read the log.
    async fn fetch_history(
        &self,
        project: &Project,
        entries: &[FileRecord],
    ) -> Result<Vec<crate::gitx::CommitRecord>> {
        let scratch = tempfile::tempdir()?;
        let pairs: Vec<(String, String)> = entries
            .iter()
            .map(|e| (e.rel_path.clone(), e.content_hash.clone()))
            .collect();
        self.store.materialize(&pairs, scratch.path())?;
        debug!(
            "Materialized {} files for git analysis of {}",
            pairs.len(),
            project.name
        );
        self.git.log(scratch.path()).await
    }

    /// Run every registered analyser whose extension filter matches at
    /// least one source file. A failed variant degrades to the generic
    /// report for its files instead of aborting the project.
    fn run_analysers(
        &self,
        primary_language: &Option<String>,
        sources: &[SourceFile],
        analysis: &mut ProjectAnalysis,
    ) -> Vec<LanguageReport> {
        let mut reports = Vec::new();
        for analyser in self.registry.iter() {
            let matching: Vec<SourceFile> = sources
                .iter()
                .filter(|s| analyser.matches(&s.rel_path))
                .cloned()
                .collect();
            if matching.is_empty() {
                continue;
            }
            match analyser.analyse(&matching) {
                Ok(report) => reports.push(report),
                Err(e) => {
                    warn!("Analyser {} failed: {}", analyser.language(), e);
                    analysis.diagnose(format!(
                        "analyser failed for {}: {}; generic metrics used",
                        analyser.language(),
                        e
                    ));
                    reports.push(generic_report(analyser.language(), &matching));
                }
            }
        }

        // No variant matched anything but a language was detected: fall
        // back to a generic report over all sources.
        if reports.is_empty() && !sources.is_empty() {
            let language = primary_language.as_deref().unwrap_or("Unknown");
            reports.push(generic_report(language, sources));
        }
        reports
    }

    async fn score_and_rank(&self, analyses: &mut [(i64, ProjectAnalysis)]) -> Result<()> {
        if analyses.is_empty() {
            return Ok(());
        }

        let weights = self
            .repository
            .get_score_config()?
            .unwrap_or(self.config.scoring);

        let inputs: Vec<ScoreInputs> = analyses
            .iter()
            .map(|(id, analysis)| {
                let solo = analysis
                    .git
                    .as_ref()
                    .map(|g| g.author_count <= 1)
                    .unwrap_or(false);
                ScoreInputs {
                    project_id: *id,
                    name: analysis.project_path.clone(),
                    contribution_pct: if solo { 100.0 } else { analysis.contribution_pct },
                    skill_count: (analysis.tools.len() + analysis.practices.len()) as u64,
                    duration_days: duration_days(analysis),
                    file_count: analysis.code_metrics.file_count,
                    last_commit: analysis.git.as_ref().and_then(|g| g.last_commit),
                }
            })
            .collect();

        let scored = score_batch(&inputs, &weights);
        let ranks: Vec<(i64, i64)> = scored.iter().map(|s| (s.project_id, s.rank)).collect();

        for result in &scored {
            if let Some((_, analysis)) = analyses
                .iter_mut()
                .find(|(id, _)| *id == result.project_id)
            {
                analysis.score = result.score;
                analysis.score_breakdown = result.breakdown;
                self.repository
                    .set_project_score(result.project_id, result.score)?;
                // Refresh the cache with the scored record.
                if let Some((fingerprint, _)) =
                    self.repository.cached_analysis(result.project_id)?
                {
                    self.repository.store_cached_analysis(
                        result.project_id,
                        &fingerprint,
                        analysis,
                    )?;
                }
            }
        }

        self.repository.rerank(&ranks)?;
        info!("Scored and ranked {} projects", scored.len());
        Ok(())
    }

    /// Generate résumé bullets for an analysed project, persist them as a
    /// generated item, and refresh the cached analysis. Analyses the
    /// project first if no cache exists. The consent gate decides whether
    /// the AI path is open.
    pub async fn generate_bullets(
        &self,
        project_id: i64,
        max_bullets: usize,
        use_ai: bool,
        token: &CancellationToken,
    ) -> Result<ProjectAnalysis> {
        let mut analysis = match self.repository.cached_analysis(project_id)? {
            Some((_, analysis)) => analysis,
            None => self.analyse_project(project_id, false, token).await?,
        };

        let gate = ConsentGate::load(
            self.repository.as_ref(),
            self.provider.is_some() && self.config.llm.is_configured(),
        )?;
        let ai_available = gate.can_use_llm() && gate.permits_model(&self.config.llm.model);

        let (bullets, source) = crate::bullets::generate(
            &analysis,
            max_bullets,
            use_ai,
            ai_available,
            self.provider.as_deref(),
            Duration::from_secs(self.config.llm.timeout_secs),
        )
        .await;

        analysis.resume_bullets = bullets;
        analysis.resume_bullet_source = source;

        self.repository
            .upsert_generated_item(&crate::types::GeneratedItem {
                kind: "resume_bullets".to_string(),
                project_id,
                payload: serde_json::json!({
                    "bullets": analysis.resume_bullets,
                    "source": source.as_str(),
                }),
                created_at: chrono::Utc::now(),
            })?;

        if let Some((fingerprint, _)) = self.repository.cached_analysis(project_id)? {
            self.repository
                .store_cached_analysis(project_id, &fingerprint, &analysis)?;
        }

        Ok(analysis)
    }

    fn persist_analysis(
        &self,
        project: &Project,
        analysis: &ProjectAnalysis,
        skills: &SkillSet,
        reports: &[LanguageReport],
        fingerprint: &str,
    ) -> Result<()> {
        // Git dates win; without history the mtime range recorded at
        // ingest stays in place.
        let (start, end) = match &analysis.git {
            Some(git) => (git.first_commit, git.last_commit),
            None => (project.start_date, project.end_date),
        };

        self.repository.update_project_analysis(&ProjectUpdate {
            project_id: project.id,
            language: analysis.language.clone(),
            framework: analysis.framework.clone(),
            start_date: start,
            end_date: end,
            is_collaborative: analysis.is_collaborative,
            role: analysis.role,
            contribution_pct: analysis.contribution_pct,
            role_justification: analysis.role_justification.clone(),
            fingerprint: fingerprint.to_string(),
        })?;

        for report in reports {
            self.repository.upsert_code_analysis(
                project.id,
                &report.language,
                &serde_json::to_value(report)?,
                &report.summary_text,
            )?;
        }

        self.repository
            .set_project_skills(project.id, &skills.to_skills())?;

        self.repository
            .store_cached_analysis(project.id, fingerprint, analysis)?;
        Ok(())
    }
}

fn is_git_path(rel_path: &str) -> bool {
    rel_path == ".git" || rel_path.starts_with(".git/") || rel_path.contains("/.git/")
}

fn duration_days(analysis: &ProjectAnalysis) -> u64 {
    analysis
        .git
        .as_ref()
        .and_then(|g| match (g.first_commit, g.last_commit) {
            (Some(first), Some(last)) => Some((last - first).num_days().max(0) as u64),
            _ => None,
        })
        .unwrap_or(0)
}

/// Fold per-language reports into the cross-language metrics block and the
/// `language_specific` bag.
fn aggregate_reports(analysis: &mut ProjectAnalysis, reports: &[LanguageReport]) {
    let mut metrics = CodeMetrics::default();
    let mut language_specific = serde_json::Map::new();

    for report in reports {
        metrics.file_count += report.file_count;
        metrics.loc += report.total_loc;
        metrics.function_count += report.function_count;
        metrics.class_count += report.class_count;
        metrics.test_count += report.test_count_unit + report.test_count_integration;

        let mut bag = match &report.features {
            serde_json::Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        };
        bag.insert(
            "test_count_unit".to_string(),
            serde_json::json!(report.test_count_unit),
        );
        bag.insert(
            "test_count_integration".to_string(),
            serde_json::json!(report.test_count_integration),
        );
        bag.insert(
            "summary".to_string(),
            serde_json::json!(report.summary_text),
        );
        language_specific.insert(report.language.clone(), serde_json::Value::Object(bag));

        if report.parse_errors > 0 {
            analysis.diagnostics.push(format!(
                "{}: {} files failed to parse",
                report.language, report.parse_errors
            ));
        }
    }

    analysis.code_metrics = metrics;
    analysis.language_specific = serde_json::Value::Object(language_specific);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gitx::CommitRecord;
    use crate::ingest::IngestEngine;
    use crate::store::{Database, SqliteRepository};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::io::Write;
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;
    use zip::write::SimpleFileOptions;

    /// Scripted history source with a call counter for gate assertions.
    struct ScriptedGit {
        commits: Vec<CommitRecord>,
        calls: AtomicUsize,
    }

    impl ScriptedGit {
        fn with_commits(commits: Vec<CommitRecord>) -> Self {
            Self {
                commits,
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GitLog for ScriptedGit {
        async fn log(&self, _root: &Path) -> Result<Vec<CommitRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.commits.is_empty() {
                return Err(FolioError::Git("damaged metadata".to_string()));
            }
            Ok(self.commits.clone())
        }
    }

    fn commit(name: &str, day: u32) -> CommitRecord {
        CommitRecord {
            sha: format!("sha{}", day),
            author_name: name.to_string(),
            author_email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            timestamp: Utc.with_ymd_and_hms(2025, 3, day, 10, 0, 0).unwrap(),
            subject: "feat: work".to_string(),
            is_merge: false,
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<ContentStore>,
        repository: Arc<SqliteRepository>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        Fixture {
            store: Arc::new(ContentStore::new(dir.path().join("objects")).unwrap()),
            repository: Arc::new(SqliteRepository::new(Arc::new(
                Database::open_in_memory().unwrap(),
            ))),
            _dir: dir,
        }
    }

    fn build_zip(entries: &[(&str, &str)]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".zip").tempfile().unwrap();
        {
            let mut writer = zip::ZipWriter::new(file.as_file_mut());
            for (name, content) in entries {
                writer
                    .start_file(*name, SimpleFileOptions::default())
                    .unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        file
    }

    fn identity_config() -> Config {
        let mut config = Config::default();
        config.identity.names = vec!["Jane Doe".to_string()];
        config
    }

    fn ingest_demo(fx: &Fixture, with_git: bool) -> i64 {
        let engine = IngestEngine::new(&fx.store, fx.repository.as_ref(), u64::MAX);
        let mut entries = vec![
            (
                "demo/pyproject.toml",
                "[project]\nname = \"demo\"\ndependencies = [\"fastapi\"]\n",
            ),
            (
                "demo/main.py",
                "from fastapi import FastAPI\n\nasync def handler(x: int) -> int:\n    return x\n",
            ),
            ("demo/tests/test_main.py", "def test_handler(): ...\n"),
            ("demo/README.md", "# demo\n"),
        ];
        if with_git {
            entries.push(("demo/.git/HEAD", "ref: refs/heads/main\n"));
        }
        let zip = build_zip(&entries);
        let report = engine
            .ingest(zip.path(), &HashMap::new(), &[])
            .unwrap();
        report.created[0].0
    }

    #[tokio::test]
    async fn test_single_project_analysis_end_to_end() {
        let fx = fixture();
        let project_id = ingest_demo(&fx, false);

        let pipeline = Pipeline::new(
            Arc::clone(&fx.store),
            fx.repository.clone(),
            Arc::new(ScriptedGit::with_commits(vec![])),
            None,
            identity_config(),
        );

        let token = CancellationToken::new();
        let analyses = pipeline
            .analyse_batch(&[project_id], false, &token)
            .await
            .unwrap();
        assert_eq!(analyses.len(), 1);
        let analysis = &analyses[0];

        assert_eq!(analysis.language.as_deref(), Some("Python"));
        assert_eq!(analysis.framework.as_deref(), Some("FastAPI"));
        assert!(!analysis.is_collaborative);
        assert_eq!(analysis.role, Role::Unknown);
        assert!(analysis.git.is_none());
        // Only the two Python files reach the Python analyser.
        assert_eq!(analysis.code_metrics.file_count, 2);
        assert!(analysis.code_metrics.test_count >= 1);
        assert!(analysis.score > 0.0);

        let project = fx.repository.get_project(project_id).unwrap();
        assert_eq!(project.language.as_deref(), Some("Python"));
        assert_eq!(project.importance_rank, Some(1));
        assert!(project.last_fingerprint.is_some());
        assert!(!fx.repository.project_skills(project_id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fingerprint_gate_skips_git_io() {
        let fx = fixture();
        let project_id = ingest_demo(&fx, true);

        let git = Arc::new(ScriptedGit::with_commits(vec![
            commit("Jane Doe", 1),
            commit("Jane Doe", 5),
        ]));
        let pipeline = Pipeline::new(
            Arc::clone(&fx.store),
            fx.repository.clone(),
            git.clone(),
            None,
            identity_config(),
        );

        let token = CancellationToken::new();
        pipeline
            .analyse_batch(&[project_id], false, &token)
            .await
            .unwrap();
        assert_eq!(git.call_count(), 1);

        // Second run, no file changes: cache hit, no git subprocess.
        let analyses = pipeline
            .analyse_batch(&[project_id], false, &token)
            .await
            .unwrap();
        assert_eq!(git.call_count(), 1);
        assert_eq!(analyses[0].role, Role::SoloDeveloper);

        // Forced run re-fetches.
        pipeline
            .analyse_batch(&[project_id], true, &token)
            .await
            .unwrap();
        assert_eq!(git.call_count(), 2);
    }

    #[tokio::test]
    async fn test_lead_role_detection() {
        let fx = fixture();
        let project_id = ingest_demo(&fx, true);

        let mut commits = Vec::new();
        for day in 1..=20 {
            commits.push(commit("Jane Doe", day));
        }
        for day in 21..=25 {
            commits.push(commit("Sam Roe", day));
        }
        let pipeline = Pipeline::new(
            Arc::clone(&fx.store),
            fx.repository.clone(),
            Arc::new(ScriptedGit::with_commits(commits)),
            None,
            identity_config(),
        );

        let token = CancellationToken::new();
        let analyses = pipeline
            .analyse_batch(&[project_id], false, &token)
            .await
            .unwrap();
        let analysis = &analyses[0];
        assert!(analysis.is_collaborative);
        assert_eq!(analysis.role, Role::LeadDeveloper);
        assert!((analysis.contribution_pct - 80.0).abs() < 1e-9);
        assert!(
            analysis
                .role_justification
                .as_deref()
                .unwrap()
                .contains("20/25")
        );
    }

    #[tokio::test]
    async fn test_damaged_git_degrades_to_no_git() {
        let fx = fixture();
        let project_id = ingest_demo(&fx, true);

        // Empty scripted history = log failure.
        let pipeline = Pipeline::new(
            Arc::clone(&fx.store),
            fx.repository.clone(),
            Arc::new(ScriptedGit::with_commits(vec![])),
            None,
            identity_config(),
        );

        let token = CancellationToken::new();
        let analyses = pipeline
            .analyse_batch(&[project_id], false, &token)
            .await
            .unwrap();
        let analysis = &analyses[0];
        assert_eq!(analysis.role, Role::Unknown);
        assert!(analysis.git.is_none());
        assert!(
            analysis
                .diagnostics
                .iter()
                .any(|d| d.contains("git history unavailable"))
        );
        // Still scored despite the degradation.
        assert!(analysis.score >= 0.0);
    }

    #[tokio::test]
    async fn test_lock_contention_is_conflict() {
        let fx = fixture();
        let project_id = ingest_demo(&fx, false);

        let pipeline = Pipeline::new(
            Arc::clone(&fx.store),
            fx.repository.clone(),
            Arc::new(ScriptedGit::with_commits(vec![])),
            None,
            identity_config(),
        );

        let _lock = ProjectLock::acquire(&pipeline.active, project_id).unwrap();
        let token = CancellationToken::new();
        let err = pipeline
            .analyse_project(project_id, false, &token)
            .await
            .unwrap_err();
        assert!(matches!(err, FolioError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_cancellation_between_stages() {
        let fx = fixture();
        let project_id = ingest_demo(&fx, false);

        let pipeline = Pipeline::new(
            Arc::clone(&fx.store),
            fx.repository.clone(),
            Arc::new(ScriptedGit::with_commits(vec![])),
            None,
            identity_config(),
        );

        let token = CancellationToken::new();
        token.cancel();
        let err = pipeline
            .analyse_project(project_id, false, &token)
            .await
            .unwrap_err();
        assert!(matches!(err, FolioError::Cancelled));
    }

    #[tokio::test]
    async fn test_consent_gate_blocks_llm_bullets() {
        use crate::ai::provider::testing::ScriptedProvider;
        use crate::types::{BulletSource, ConsentRecord};

        let fx = fixture();
        let project_id = ingest_demo(&fx, false);

        let provider = Arc::new(ScriptedProvider::returning(
            r#"["Built the demo service", "Implemented its tests"]"#,
        ));
        let mut config = identity_config();
        config.llm.api_key = Some("test-key".to_string());

        let pipeline = Pipeline::new(
            Arc::clone(&fx.store),
            fx.repository.clone(),
            Arc::new(ScriptedGit::with_commits(vec![])),
            Some(provider.clone()),
            config,
        );
        let token = CancellationToken::new();

        // No consent record: deny. The provider must never be called.
        let analysis = pipeline
            .generate_bullets(project_id, 6, true, &token)
            .await
            .unwrap();
        assert_eq!(analysis.resume_bullet_source, BulletSource::Local);
        assert!(!analysis.resume_bullets.is_empty());
        assert_eq!(provider.call_count(), 0);

        // Consent granted: the AI path opens up.
        let mut record = ConsentRecord::deny();
        record.allow_llm = true;
        fx.repository.upsert_consent(&record).unwrap();

        let analysis = pipeline
            .generate_bullets(project_id, 6, true, &token)
            .await
            .unwrap();
        assert_eq!(analysis.resume_bullet_source, BulletSource::Ai);
        assert_eq!(analysis.resume_bullets.len(), 2);
        assert!(provider.call_count() >= 1);

        // The generated item was persisted.
        let item = fx
            .repository
            .get_generated_item("resume_bullets", project_id)
            .unwrap()
            .unwrap();
        assert_eq!(item.payload["source"], "ai");
    }

    #[tokio::test]
    async fn test_batch_ranking_is_one_to_n() {
        let fx = fixture();
        let engine = IngestEngine::new(&fx.store, fx.repository.as_ref(), u64::MAX);

        let zip = build_zip(&[
            ("api/pyproject.toml", "[project]\nname = \"api\"\n"),
            ("api/main.py", "def main(): ...\n"),
            ("api/util.py", "def util(): ...\n"),
            ("web/package.json", "{\"dependencies\": {\"react\": \"18\"}}"),
            ("web/index.jsx", "export function App() { return null; }\n"),
        ]);
        let report = engine.ingest(zip.path(), &HashMap::new(), &[]).unwrap();
        let ids = report.project_ids();
        assert_eq!(ids.len(), 2);

        let pipeline = Pipeline::new(
            Arc::clone(&fx.store),
            fx.repository.clone(),
            Arc::new(ScriptedGit::with_commits(vec![])),
            None,
            identity_config(),
        );
        let token = CancellationToken::new();
        pipeline.analyse_batch(&ids, false, &token).await.unwrap();

        let mut ranks: Vec<i64> = ids
            .iter()
            .map(|id| {
                fx.repository
                    .get_project(*id)
                    .unwrap()
                    .importance_rank
                    .unwrap()
            })
            .collect();
        ranks.sort_unstable();
        assert_eq!(ranks, vec![1, 2]);
    }
}
