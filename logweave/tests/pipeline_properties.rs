//! End-to-end properties of the publish path: gating, vetoes and rotation,
//! observed through the files the writer leaves on disk.

#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use logweave::plugin::{
        PluginConfig, PluginDescriptor, PluginKind, PluginModule, PluginRegistry, PluginResult,
        PluginSettings,
    };
    use logweave::writer::{rotate, CaptureBuffer};
    use logweave::{LogEntry, LogWriter, Logger, Severity};
    use serde_json::json;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    /// Vetoes entries whose message contains a configured keyword.
    struct KeywordFilter {
        keywords: Vec<String>,
        case_sensitive: bool,
    }

    impl KeywordFilter {
        fn new() -> Self {
            Self {
                keywords: Vec::new(),
                case_sensitive: false,
            }
        }
    }

    impl PluginModule for KeywordFilter {
        fn descriptor(&self) -> Option<PluginDescriptor> {
            Some(PluginDescriptor::new("keyword_filter", PluginKind::Filter))
        }

        fn init(&mut self, config: &PluginConfig) -> i32 {
            self.keywords = config.get_string_array("keywords");
            if self.keywords.is_empty() {
                self.keywords.push("ERROR".to_string());
            }
            self.case_sensitive = config.get_bool("case_sensitive", false);
            0
        }

        fn process(&mut self, entry: &LogEntry) -> PluginResult {
            let hit = if self.case_sensitive {
                self.keywords.iter().any(|k| entry.message.contains(k.as_str()))
            } else {
                let message = entry.message.to_lowercase();
                self.keywords
                    .iter()
                    .any(|k| message.contains(&k.to_lowercase()))
            };
            if hit {
                PluginResult::Skip
            } else {
                PluginResult::Ok
            }
        }

        fn shutdown(&mut self) {}
    }

    fn file_logger(dir: &Path, level: Severity, settings: PluginSettings) -> (Logger, PathBuf) {
        let path = dir.join("app.log");
        let writer = LogWriter::with_console(level, Box::new(CaptureBuffer::new()));
        writer.set_console_enabled(false);
        writer.set_file(Some(&path)).expect("open log file");
        (Logger::new(writer, PluginRegistry::new(settings)), path)
    }

    #[test]
    fn test_level_gating_in_file() {
        let dir = tempdir().unwrap();
        let (logger, path) = file_logger(dir.path(), Severity::Warn, PluginSettings::new());

        logger.debug("gate", "debug line");
        logger.info("gate", "info line");
        logger.warn("gate", "warn line");
        logger.error("gate", "error line");
        logger.fatal("gate", "fatal line");
        logger.shutdown();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3, "{content}");
        assert!(lines[0].ends_with("[WARN][gate] warn line"));
        assert!(lines[1].ends_with("[ERROR][gate] error line"));
        assert!(lines[2].ends_with("[FATAL][gate] fatal line"));
    }

    #[test]
    fn test_filter_veto_is_a_hard_gate() {
        let dir = tempdir().unwrap();
        let (logger, path) = file_logger(dir.path(), Severity::Debug, PluginSettings::new());
        logger
            .plugins()
            .register("keyword_filter", Box::new(KeywordFilter::new()))
            .unwrap();

        logger.info("db", "connection error detected");
        logger.publish(Severity::Error, Some("db"), "ERROR: disk gone");
        logger.shutdown();

        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn test_filter_config_comes_from_settings() {
        let dir = tempdir().unwrap();
        let settings = PluginSettings::new().with_config(
            "keyword_filter",
            json!({ "keywords": ["secret"], "case_sensitive": true }),
        );
        let (logger, path) = file_logger(dir.path(), Severity::Info, settings);
        logger
            .plugins()
            .register("keyword_filter", Box::new(KeywordFilter::new()))
            .unwrap();

        logger.info("auth", "token=secret");
        logger.info("auth", "token=SECRET");
        logger.error("auth", "ERROR is allowed now");
        logger.shutdown();

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("token=secret"));
        assert!(content.contains("token=SECRET"));
        assert!(content.contains("ERROR is allowed now"));
    }

    #[test]
    fn test_rotation_bound() {
        let dir = tempdir().unwrap();
        let (logger, path) = file_logger(dir.path(), Severity::Info, PluginSettings::new());
        logger.writer().set_max_size(1024);
        logger.writer().set_max_backups(3);

        let message = "x".repeat(60);
        let mut longest = 0;
        for i in 0..200 {
            let line = format!("{i:04} {message}");
            longest = longest.max(line.len() + 64);
            logger.info("rot", &line);
        }
        logger.shutdown();

        let active = fs::metadata(&path).unwrap().len();
        assert!(active <= 1024 + longest as u64, "active file is {active} bytes");

        let indices = rotate::backup_indices(&path);
        assert_eq!(indices.len(), 3, "{indices:?}");
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
        assert!(indices[0] > 1, "oldest backups should have been deleted");

        for n in &indices {
            let backup = rotate::backup_path(&path, n);
            let size = fs::metadata(&backup).unwrap().len();
            assert!(size >= 1024, "backup {n} is only {size} bytes");
            assert!(size <= 1024 + longest as u64);
        }
    }

    #[test]
    fn test_rotation_keeps_every_line_in_order() {
        let dir = tempdir().unwrap();
        let (logger, path) = file_logger(dir.path(), Severity::Info, PluginSettings::new());
        logger.writer().set_max_size(512);
        logger.writer().set_max_backups(0);

        for i in 0..100 {
            logger.info("seq", &format!("seq {i}"));
        }
        logger.shutdown();

        let mut files: Vec<PathBuf> = rotate::backup_indices(&path)
            .into_iter()
            .map(|n| rotate::backup_path(&path, n))
            .collect();
        assert!(files.len() > 1);
        files.push(path.clone());

        let seen: Vec<u32> = files
            .iter()
            .flat_map(|f| {
                fs::read_to_string(f)
                    .unwrap()
                    .lines()
                    .filter_map(|l| l.split("] seq ").nth(1).map(str::to_string))
                    .collect::<Vec<_>>()
            })
            .map(|n| n.parse().unwrap())
            .collect();

        assert_eq!(seen, (0..100).collect::<Vec<u32>>());
    }

    #[test]
    fn test_unwritable_file_degrades_to_console() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, "").unwrap();

        let console = CaptureBuffer::new();
        let writer = LogWriter::with_console(Severity::Info, Box::new(console.clone()));
        assert!(writer.set_file(Some(&blocker.join("app.log"))).is_err());
        assert_eq!(writer.file_path(), None);

        let logger = Logger::new(writer, PluginRegistry::default());
        logger.info("io", "still visible");
        assert!(console.contents().contains("[INFO][io] still visible"));
        assert!(!logger.writer().rotate_now());
    }
}
