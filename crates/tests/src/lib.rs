//! # Integration Tests
//!
//! Cross-crate end-to-end tests.
//!
//! Covers:
//! - Persisted state layout
//! - Spool directory → local file pipelines through the manager and file store
//! - Restart, resumption and offset reset against real files

#[cfg(test)]
mod contract_tests {
    use contracts::{PipelineState, PipelineStatus};
    use execution::{FilePipelineStore, PipelineStore};

    #[tokio::test]
    async fn test_state_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePipelineStore::new(dir.path());
        let mut state = PipelineState::initial("p1");
        state.last_offset = "opaque".into();
        state.transition(PipelineStatus::RunError, Some("boom".into()));
        store.save_state(&state).await.unwrap();

        let state_file = dir.path().join("runInfo/p1/pipelineState.json");
        let raw = std::fs::read_to_string(state_file).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["status"], "RUN_ERROR");
        assert_eq!(json["lastOffset"], "opaque");
        assert_eq!(json["errorMessage"], "boom");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{
        ConfigEntry, ExecutionConfig, PipelineConfiguration, PipelineStatus, RuntimeParameters,
        StageConfiguration,
    };
    use dispatcher::LocalFileTarget;
    use execution::{FilePipelineStore, PipelineManager, PipelineStore};
    use ingestion::{RandomSource, SpoolDirSource};
    use stage_library::builtin_registry;

    struct Fixture {
        _root: tempfile::TempDir,
        data_dir: PathBuf,
        spool_dir: PathBuf,
        output: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            let data_dir = root.path().join("data");
            let spool_dir = root.path().join("spool");
            std::fs::create_dir_all(&spool_dir).unwrap();
            let output = root.path().join("out").join("records.txt");
            Self {
                _root: root,
                data_dir,
                spool_dir,
                output,
            }
        }

        fn manager(&self) -> PipelineManager<FilePipelineStore> {
            PipelineManager::new(
                Arc::new(FilePipelineStore::new(&self.data_dir)),
                Arc::new(builtin_registry().unwrap()),
                ExecutionConfig::default(),
            )
        }

        fn output_lines(&self) -> Vec<String> {
            std::fs::read_to_string(&self.output)
                .map(|s| s.lines().map(str::to_string).collect())
                .unwrap_or_default()
        }

        async fn wait_for_lines(&self, count: usize) -> Vec<String> {
            for _ in 0..300 {
                let lines = self.output_lines();
                if lines.len() >= count {
                    return lines;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            panic!("expected {count} lines, got {:?}", self.output_lines());
        }
    }

    fn spool_to_file(pipeline_id: &str, output: &Path) -> PipelineConfiguration {
        PipelineConfiguration {
            pipeline_id: pipeline_id.to_string(),
            title: "spool to file".into(),
            description: String::new(),
            batch_size: Some(3),
            parameters: vec![ConfigEntry::new("SPOOL_DIR", "/does/not/exist")],
            stages: vec![
                StageConfiguration {
                    instance_name: "spooler_01".into(),
                    library: SpoolDirSource::LIBRARY.into(),
                    stage_name: SpoolDirSource::STAGE_NAME.into(),
                    configuration: vec![
                        ConfigEntry::new("conf.spoolDir", "${SPOOL_DIR}"),
                        ConfigEntry::new("conf.filePattern", "*.txt"),
                        ConfigEntry::new("conf.useLastModified", "LEXICOGRAPHICAL"),
                        ConfigEntry::new("conf.poolingTimeoutSecs", 0.2),
                    ],
                },
                StageConfiguration {
                    instance_name: "file_01".into(),
                    library: LocalFileTarget::LIBRARY.into(),
                    stage_name: LocalFileTarget::STAGE_NAME.into(),
                    configuration: vec![ConfigEntry::new(
                        "conf.filePath",
                        output.display().to_string(),
                    )],
                },
            ],
        }
    }

    fn spool_params(fixture: &Fixture) -> RuntimeParameters {
        let mut params = RuntimeParameters::new();
        params.insert(
            "SPOOL_DIR".into(),
            fixture.spool_dir.display().to_string().into(),
        );
        params
    }

    /// Spool files → local file, restart from the persisted offset, then reset
    #[tokio::test]
    async fn test_e2e_spool_to_file_resumes_after_restart() {
        let fixture = Fixture::new();
        std::fs::write(fixture.spool_dir.join("a.txt"), "123\n456").unwrap();
        std::fs::write(fixture.spool_dir.join("b.txt"), "111213\n141516\n").unwrap();
        std::fs::write(fixture.spool_dir.join("skip.log"), "ignored\n").unwrap();

        let store = FilePipelineStore::new(&fixture.data_dir);
        store
            .save_definition(&spool_to_file("tail", &fixture.output))
            .await
            .unwrap();

        let manager = fixture.manager();
        let state = manager
            .start_pipeline("tail", &spool_params(&fixture))
            .await
            .unwrap();
        assert_eq!(state.status, PipelineStatus::Running);

        let lines = fixture.wait_for_lines(4).await;
        assert_eq!(lines, ["123", "456", "111213", "141516"]);
        let stopped = manager.stop_pipeline("tail").await.unwrap();
        assert_eq!(stopped.status, PipelineStatus::Stopped);
        assert!(stopped.last_offset.contains("b.txt"));

        // a fresh manager (new process) resumes from the persisted offset
        std::fs::write(fixture.spool_dir.join("c.txt"), "789\n").unwrap();
        let restarted = fixture.manager();
        let persisted = restarted.get_status("tail").await.unwrap();
        assert_eq!(persisted, stopped);

        restarted
            .start_pipeline("tail", &spool_params(&fixture))
            .await
            .unwrap();
        let lines = fixture.wait_for_lines(5).await;
        restarted.stop_pipeline("tail").await.unwrap();
        assert_eq!(lines, ["123", "456", "111213", "141516", "789"]);

        // reset replays everything: at-least-once, never lost
        restarted.reset_offset("tail").await.unwrap();
        assert_eq!(
            store.load_state("tail").await.unwrap().unwrap().last_offset,
            ""
        );
        restarted
            .start_pipeline("tail", &spool_params(&fixture))
            .await
            .unwrap();
        let lines = fixture.wait_for_lines(10).await;
        restarted.stop_all().await;
        assert_eq!(&lines[5..], ["123", "456", "111213", "141516", "789"]);
    }

    #[tokio::test]
    async fn test_e2e_bad_spool_dir_is_start_error() {
        let fixture = Fixture::new();
        let store = FilePipelineStore::new(&fixture.data_dir);
        store
            .save_definition(&spool_to_file("tail", &fixture.output))
            .await
            .unwrap();

        let manager = fixture.manager();
        // default parameter points at a missing directory
        let err = manager
            .start_pipeline("tail", &RuntimeParameters::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("spooler_01"));

        let state = store.load_state("tail").await.unwrap().unwrap();
        assert_eq!(state.status, PipelineStatus::StartError);
        assert!(state.error_message.unwrap().contains("conf.spoolDir"));
        assert!(!fixture.output.exists());
    }

    #[tokio::test]
    async fn test_e2e_random_to_file_with_seed() {
        let fixture = Fixture::new();
        let definition = PipelineConfiguration {
            pipeline_id: "random".into(),
            title: String::new(),
            description: String::new(),
            batch_size: Some(4),
            parameters: Vec::new(),
            stages: vec![
                StageConfiguration {
                    instance_name: "random_01".into(),
                    library: RandomSource::LIBRARY.into(),
                    stage_name: RandomSource::STAGE_NAME.into(),
                    configuration: vec![
                        ConfigEntry::new("fields", "a,b"),
                        ConfigEntry::new("delay", 10i64),
                        ConfigEntry::new("seed", 7i64),
                    ],
                },
                StageConfiguration {
                    instance_name: "file_01".into(),
                    library: LocalFileTarget::LIBRARY.into(),
                    stage_name: LocalFileTarget::STAGE_NAME.into(),
                    configuration: vec![ConfigEntry::new(
                        "conf.filePath",
                        fixture.output.display().to_string(),
                    )],
                },
            ],
        };
        FilePipelineStore::new(&fixture.data_dir)
            .save_definition(&definition)
            .await
            .unwrap();

        let manager = fixture.manager();
        manager
            .start_pipeline("random", &RuntimeParameters::new())
            .await
            .unwrap();
        let lines = fixture.wait_for_lines(8).await;
        let state = manager.stop_pipeline("random").await.unwrap();

        assert_eq!(state.last_offset, RandomSource::OFFSET);
        let first: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert!(first["a"].is_i64() && first["b"].is_i64());
        // seeded once: batches keep drawing new values
        assert_ne!(lines[0], lines[4]);
    }
}
