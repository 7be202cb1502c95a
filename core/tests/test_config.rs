#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::time::Duration;

    use parzip_core::compression::CompressionCodec;
    use parzip_core::constants::{DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
    use parzip_core::stream::parallelism::{ParallelismProfile, default_inflight};
    use parzip_core::stream::{PipelineConfig, default_decompressed_path, default_output_path};
    use parzip_core::types::StreamError;

    #[test]
    fn defaults_follow_host() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(cfg.parallelism, num_cpus::get().max(1));
        assert_eq!(cfg.inflight_segments, (4 * cfg.parallelism).max(16));
        assert_eq!(cfg.codec, CompressionCodec::Gzip);
        assert_eq!(cfg.level, None);
        assert_eq!(cfg.stall_timeout(), None);
        assert!(!cfg.keep_partial_output);
        cfg.validate().unwrap();
    }

    #[test]
    fn chunk_size_bounds() {
        let ok = |size| PipelineConfig::default().with_chunk_size(size).validate().is_ok();
        assert!(ok(MIN_CHUNK_SIZE));
        assert!(ok(MAX_CHUNK_SIZE));
        assert!(!ok(MIN_CHUNK_SIZE - 1));
        assert!(ok(7));
        assert!(!ok(MAX_CHUNK_SIZE + 1));
    }

    #[test]
    fn rejects_zero_workers_window_and_timeout() {
        let mut cfg = PipelineConfig::default();
        cfg.parallelism = 0;
        assert!(matches!(cfg.validate(), Err(StreamError::Config(_))));

        let mut cfg = PipelineConfig::default();
        cfg.inflight_segments = 0;
        assert!(matches!(cfg.validate(), Err(StreamError::Config(_))));

        let mut cfg = PipelineConfig::default();
        cfg.stall_timeout_ms = Some(0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_level_outside_codec_range() {
        let cfg = PipelineConfig::default().with_codec(CompressionCodec::Gzip, Some(15));
        assert!(matches!(cfg.validate(), Err(StreamError::Compression(_))));
        let cfg = PipelineConfig::default().with_codec(CompressionCodec::Zstd, Some(15));
        cfg.validate().unwrap();
    }

    #[test]
    fn builder_helpers() {
        let cfg = PipelineConfig::default()
            .with_parallelism(8)
            .with_stall_timeout(Duration::from_millis(1500));
        assert_eq!(cfg.parallelism, 8);
        assert_eq!(cfg.inflight_segments, 32);
        assert_eq!(cfg.stall_timeout(), Some(Duration::from_millis(1500)));

        let cfg = PipelineConfig::with_profile(ParallelismProfile::single_threaded());
        assert_eq!((cfg.parallelism, cfg.inflight_segments), (1, 1));
    }

    #[test]
    fn json_file_overrides_only_named_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parzip.json");
        fs::write(&path, r#"{ "chunk_size": 65536, "codec": "zstd", "level": 9 }"#).unwrap();

        let cfg = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(cfg.chunk_size, 65536);
        assert_eq!(cfg.codec, CompressionCodec::Zstd);
        assert_eq!(cfg.level, Some(9));
        assert_eq!(cfg.parallelism, PipelineConfig::default().parallelism);
    }

    #[test]
    fn json_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{ chunk_size: ").unwrap();
        assert!(matches!(PipelineConfig::from_json_file(&bad), Err(StreamError::Config(_))));

        let invalid = dir.path().join("invalid.json");
        fs::write(&invalid, r#"{ "chunk_size": 0 }"#).unwrap();
        assert!(matches!(PipelineConfig::from_json_file(&invalid), Err(StreamError::Config(_))));

        assert!(matches!(
            PipelineConfig::from_json_file(&dir.path().join("missing.json")),
            Err(StreamError::Io(_))
        ));
    }

    #[test]
    fn config_roundtrips_through_json() {
        let cfg = PipelineConfig::default().with_codec(CompressionCodec::Zstd, Some(4));
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains(r#""codec":"zstd""#));
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn parallelism_profiles() {
        assert_eq!(default_inflight(1), 16);
        assert_eq!(default_inflight(8), 32);

        let host = ParallelismProfile::from_host();
        assert!(host.workers >= 1);
        assert_eq!(host.inflight_segments, default_inflight(host.workers));

        let dynamic = ParallelismProfile::dynamic(1024 * 1024, 0.5, 64);
        assert_eq!(dynamic.workers, host.workers);
        assert!(dynamic.inflight_segments >= 1 && dynamic.inflight_segments <= 64);

        assert_eq!(ParallelismProfile::new(0, 0), ParallelismProfile::new(1, 1));
    }

    #[test]
    fn default_paths() {
        assert_eq!(
            default_output_path(Path::new("/tmp/data.bin"), CompressionCodec::Gzip),
            Path::new("/tmp/data.bin.gz")
        );
        assert_eq!(
            default_output_path(Path::new("data"), CompressionCodec::Zstd),
            Path::new("data.zst")
        );
        assert_eq!(
            default_decompressed_path(Path::new("/tmp/data.bin.gz")),
            Some(Path::new("/tmp/data.bin").to_path_buf())
        );
        assert_eq!(default_decompressed_path(Path::new("data.bin")), None);
    }
}
