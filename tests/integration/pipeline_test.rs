use super::http_server::{Route, TestServer};
use std::fs;
use std::path::{Path, PathBuf};
use strmsync::core::config::Config;
use strmsync::core::pipeline::{CatalogSync, SyncOptions};
use strmsync::core::EntryKind;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    base: PathBuf,
    server: TestServer,
}

impl Fixture {
    fn new() -> Self {
        let server = TestServer::start(vec![
            ("/movie/u/p/1.mp4", Route::file()),
            ("/movie/u/p/gone.mp4", Route::html()),
            ("/series/u/p/11.mkv", Route::file()),
            ("/series/u/p/12.mkv", Route::file().no_head().ranged()),
            ("/series/u/p/21.mkv", Route::file()),
            ("/movie/u/p/3.mp4", Route::file()),
            ("/movie/u/p/4.mp4", Route::file()),
        ]);
        let dir = TempDir::new().unwrap();
        let base = dir.path().to_path_buf();
        Self {
            _dir: dir,
            base,
            server,
        }
    }

    fn movies(&self) -> PathBuf {
        self.base.join("Filme")
    }

    fn series(&self) -> PathBuf {
        self.base.join("Serien")
    }

    fn manifest(&self) -> String {
        let lines = [
            ("Foo: Bar (DE)", "/movie/u/p/1.mp4"),
            ("Foo: Bar (DE) Extended", "/movie/u/p/1.mp4"),
            ("Gone Movie (DE)", "/movie/u/p/gone.mp4"),
            ("Show (DE) S01 E01", "/series/u/p/11.mkv"),
            ("Show (DE) S01 E02", "/series/u/p/12.mkv"),
            ("Blocked Show (DE) S01 E01", "/series/u/p/21.mkv"),
            ("Foreign Film (EN)", "/movie/u/p/3.mp4"),
            ("Cam Film (DE) (CAM)", "/movie/u/p/4.mp4"),
            ("Sender HD (DE)", "/live/u/p/7"),
        ];
        let mut content = String::from("#EXTM3U\n");
        for (title, path) in lines {
            content.push_str(&format!("#EXTINF:-1,{}\n{}\n", title, self.server.url(path)));
        }
        content
    }

    fn config(&self) -> Config {
        fs::write(self.base.join("playlist.m3u"), self.manifest()).unwrap();
        fs::write(self.base.join("blacklist.txt"), "Blocked Show (DE)\n").unwrap();

        let toml = format!(
            r#"
main_path = '{}'
manifest = "playlist.m3u"
movies_root = "Filme"
series_root = "Serien"
exclusion_list = "blacklist.txt"
offline_report = "reports/offline.json"
summary_report = "reports/summary.json"
streams_playlist = "playlists/streams.m3u"

[probe]
concurrency = 4
retries = 0
backoff_ms = 10
"#,
            self.base.display()
        );
        Config::from_toml(&toml).unwrap()
    }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn test_full_sync_materializes_live_entries() {
    let fx = Fixture::new();
    let stale = fx.movies().join("Old Title");
    fs::create_dir_all(&stale).unwrap();
    fs::write(stale.join("Old Title.strm"), "http://old/movie/1.mp4").unwrap();

    let config = fx.config();
    let sync = CatalogSync::new(&config, SyncOptions::default());
    let summary = sync.run().unwrap();

    let movie = fx.movies().join("Foo_ Bar (DE)").join("Foo_ Bar (DE).strm");
    assert_eq!(read(&movie), fx.server.url("/movie/u/p/1.mp4"));
    assert!(fx
        .movies()
        .join("Foo_ Bar (DE) Extended")
        .join("Foo_ Bar (DE) Extended.strm")
        .exists());

    let season = fx.series().join("Show (DE)").join("Season 01");
    assert!(season.join("Show (DE) S01 E01.strm").exists());
    assert!(season.join("Show (DE) S01 E02.strm").exists());

    // Excluded by series title, screened CAM, foreign language
    assert!(!fx.series().join("Blocked Show (DE)").exists());
    assert!(!fx.movies().join("Cam Film (DE) (CAM)").exists());
    assert!(!fx.movies().join("Foreign Film (EN)").exists());

    // Stale artifact and its directory are gone
    assert!(!stale.exists());
    assert_eq!(summary.movies.deleted, vec!["Old Title".to_string()]);

    assert_eq!(summary.created(), 4);
    assert_eq!(summary.excluded, 1);
    assert_eq!(summary.parse.cam, 1);
    assert_eq!(summary.parse.foreign_language, 1);
    assert_eq!(summary.failures(), 0);

    // Two entries share one URL, probed once
    assert_eq!(summary.distinct_urls, 4);
    assert_eq!(summary.network_probes, 4);
    assert_eq!(fx.server.hits("/movie/u/p/1.mp4"), 2);
    assert_eq!(fx.server.hits("/series/u/p/21.mkv"), 0);
}

#[test]
fn test_unreachable_entry_recorded_offline() {
    let fx = Fixture::new();
    let config = fx.config();
    let sync = CatalogSync::new(&config, SyncOptions::default());
    let summary = sync.run().unwrap();

    assert!(!fx.movies().join("Gone Movie (DE)").exists());
    assert_eq!(summary.offline_entries, 1);

    let records = sync.recorder().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "Gone Movie (DE)");
    assert_eq!(records[0].kind, EntryKind::Movie);
    assert_eq!(records[0].reason, "GET html-or-empty");

    let report: serde_json::Value =
        serde_json::from_str(&read(&fx.base.join("reports").join("offline.json"))).unwrap();
    assert_eq!(report.as_array().unwrap().len(), 1);
    assert_eq!(report[0]["url"], fx.server.url("/movie/u/p/gone.mp4"));

    let summary_json: serde_json::Value =
        serde_json::from_str(&read(&fx.base.join("reports").join("summary.json"))).unwrap();
    assert_eq!(summary_json["offline_entries"], 1);
}

#[test]
fn test_second_run_changes_nothing() {
    let fx = Fixture::new();
    let config = fx.config();

    let first = CatalogSync::new(&config, SyncOptions::default()).run().unwrap();
    assert_eq!(first.created(), 4);

    let second = CatalogSync::new(&config, SyncOptions::default()).run().unwrap();
    assert_eq!(second.movies.mutations(), 0);
    assert_eq!(second.series.mutations(), 0);
    assert_eq!(second.movies.unchanged + second.series.unchanged, 4);
}

#[test]
fn test_removed_episode_keeps_season_directory() {
    let fx = Fixture::new();
    let config = fx.config();
    CatalogSync::new(&config, SyncOptions::default()).run().unwrap();

    // Drop the second episode from the playlist
    let content = read(&config.manifest);
    let lines: Vec<&str> = content.lines().collect();
    let mut trimmed = format!("{}\n", lines[0]);
    for pair in lines[1..].chunks(2) {
        if !pair[0].contains("S01 E02") {
            trimmed.push_str(&format!("{}\n{}\n", pair[0], pair[1]));
        }
    }
    fs::write(&config.manifest, trimmed).unwrap();

    let summary = CatalogSync::new(&config, SyncOptions::default()).run().unwrap();

    let season = fx.series().join("Show (DE)").join("Season 01");
    assert_eq!(summary.series.deleted, vec!["Show (DE) S01 E02".to_string()]);
    assert!(season.join("Show (DE) S01 E01.strm").exists());
    assert!(season.is_dir());
}

#[test]
fn test_dry_run_plans_without_writing() {
    let fx = Fixture::new();
    let config = fx.config();
    let options = SyncOptions {
        dry_run: true,
        show_progress: false,
    };

    let summary = CatalogSync::new(&config, options).run().unwrap();

    assert!(summary.dry_run);
    assert_eq!(summary.created(), 4);
    assert!(!fx.movies().exists());
    assert!(!fx.series().exists());
    assert!(!fx.base.join("reports").join("offline.json").exists());
    assert!(summary.streams_playlist_updated);
    assert!(!fx.base.join("playlists").exists());
}

#[test]
fn test_missing_manifest_is_fatal() {
    let fx = Fixture::new();
    let mut config = fx.config();
    config.manifest = fx.base.join("nope.m3u");

    let err = CatalogSync::new(&config, SyncOptions::default())
        .run()
        .unwrap_err();

    assert!(err.is_fatal());
    assert!(err.to_string().contains("nope.m3u"));
    assert_eq!(fx.server.total_hits(), 0);
}

#[test]
fn test_inaccessible_root_is_fatal() {
    let fx = Fixture::new();
    let config = fx.config();
    fs::write(fx.movies(), "not a directory").unwrap();

    let err = CatalogSync::new(&config, SyncOptions::default())
        .run()
        .unwrap_err();

    assert!(err.is_fatal());
    assert_eq!(fx.server.total_hits(), 0);
}

#[test]
fn test_live_streams_exported_to_own_playlist() {
    let fx = Fixture::new();
    let config = fx.config();
    let playlist = fx.base.join("playlists").join("streams.m3u");

    let first = CatalogSync::new(&config, SyncOptions::default()).run().unwrap();

    assert_eq!(first.parse.streams, 1);
    assert!(first.streams_playlist_updated);
    assert_eq!(
        read(&playlist),
        format!(
            "#EXTM3U\n#EXTINF:-1,Sender HD (DE)\n{}\n",
            fx.server.url("/live/u/p/7")
        )
    );
    // Streams are never catalog entries and never probed
    assert!(!fx.movies().join("Sender HD (DE)").exists());
    assert_eq!(fx.server.hits("/live/u/p/7"), 0);

    let second = CatalogSync::new(&config, SyncOptions::default()).run().unwrap();
    assert!(!second.streams_playlist_updated);
}

#[test]
fn test_repeated_runs_do_not_accumulate_offline_records() {
    let fx = Fixture::new();
    let config = fx.config();
    let sync = CatalogSync::new(&config, SyncOptions::default());

    let first = sync.run().unwrap();
    let second = sync.run().unwrap();

    assert_eq!(first.offline_entries, 1);
    assert_eq!(second.offline_entries, 1);
    assert_eq!(sync.recorder().records().len(), 1);

    let report: serde_json::Value =
        serde_json::from_str(&read(&fx.base.join("reports").join("offline.json"))).unwrap();
    assert_eq!(report.as_array().unwrap().len(), 1);
}
