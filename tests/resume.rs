//! Crash-resume semantics across a Nap + Frontier pair: an `InUse` record
//! left over from a killed process is repaired back to `NotDownloaded` and
//! picked back up by a freshly resumed frontier.

use napcrawl::config::TraversalPolicy;
use napcrawl::frontier::Frontier;
use napcrawl::nap::Nap;
use napcrawl::nurl::{Nurl, Status};
use std::time::Duration;

fn temp_nap_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("napcrawl-itest-{name}-{}.nap", std::process::id()))
}

#[tokio::test]
async fn in_use_record_is_repaired_and_resumed() {
    let path = temp_nap_path("in-use-repair");
    let _ = std::fs::remove_file(&path);

    {
        let nap = Nap::open(&path, Duration::from_secs(3600), 1_000_000).unwrap();
        let frontier = Frontier::new(nap.clone(), TraversalPolicy::Bfs);
        frontier.add_nurl(Nurl::new("https://a.edu/x".to_string())).unwrap();
        frontier.add_nurl(Nurl::new("https://a.edu/y".to_string())).unwrap();

        // Simulate a worker claiming a/x then the process dying mid-fetch.
        let claimed = frontier.get_tbd_nurl().unwrap().unwrap();
        assert_eq!(claimed.status, Status::InUse);

        nap.save().unwrap();
        nap.close(0).await;
    }

    {
        let nap = Nap::open(&path, Duration::from_secs(3600), 1_000_000).unwrap();
        nap.repair_in_use("https://a.edu/x").unwrap();

        let frontier = Frontier::resume(nap.clone(), TraversalPolicy::Bfs, false).unwrap();
        assert_eq!(frontier.len(), 2);

        let first = frontier.get_tbd_nurl().unwrap().unwrap();
        assert_eq!(first.status, Status::InUse);

        nap.close(0).await;
    }

    let _ = std::fs::remove_file(&path);
    let _ = std::fs::remove_file(format!("{}.tmp", path.display()));
}

#[tokio::test]
async fn resume_skips_already_downloaded_urls_by_default() {
    let path = temp_nap_path("resume-downloaded");
    let _ = std::fs::remove_file(&path);

    {
        let nap = Nap::open(&path, Duration::from_secs(3600), 1_000_000).unwrap();
        let mut done = Nurl::new("https://a.edu/done".to_string());
        done.status = Status::Downloaded;
        nap.set("https://a.edu/done", done).unwrap();

        let pending = Nurl::new("https://a.edu/pending".to_string());
        nap.set("https://a.edu/pending", pending).unwrap();

        nap.save().unwrap();
        nap.close(0).await;
    }

    {
        let nap = Nap::open(&path, Duration::from_secs(3600), 1_000_000).unwrap();
        let frontier = Frontier::resume(nap.clone(), TraversalPolicy::Bfs, false).unwrap();
        assert_eq!(frontier.len(), 1);

        let only = frontier.get_tbd_nurl().unwrap().unwrap();
        assert_eq!(only.url, "https://a.edu/pending");

        nap.close(0).await;
    }

    let _ = std::fs::remove_file(&path);
    let _ = std::fs::remove_file(format!("{}.tmp", path.display()));
}

#[tokio::test]
async fn resume_with_use_cache_disabled_refetches_downloaded_urls() {
    let path = temp_nap_path("resume-refetch");
    let _ = std::fs::remove_file(&path);

    {
        let nap = Nap::open(&path, Duration::from_secs(3600), 1_000_000).unwrap();
        let mut done = Nurl::new("https://a.edu/done".to_string());
        done.status = Status::Downloaded;
        nap.set("https://a.edu/done", done).unwrap();
        nap.save().unwrap();
        nap.close(0).await;
    }

    {
        let nap = Nap::open(&path, Duration::from_secs(3600), 1_000_000).unwrap();
        let frontier = Frontier::resume(nap.clone(), TraversalPolicy::Bfs, true).unwrap();
        assert_eq!(frontier.len(), 1);
        nap.close(0).await;
    }

    let _ = std::fs::remove_file(&path);
    let _ = std::fs::remove_file(format!("{}.tmp", path.display()));
}
