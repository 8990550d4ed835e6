//! `ArchiveFetcher` pipeline tests against a scripted remote.

use std::io::{Cursor, Read, Write};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use futures::StreamExt;
use repotar_fetch::{
    ArchiveFetcher, ByteStream, FetchError, RemoteError, RemoteRepository, RemoteResult, RepoRef,
};
use url::Url;

enum IgnoreFile {
    Missing,
    Content(&'static str),
    Unreachable,
}

enum Link {
    To(&'static str),
    Empty,
    Status(u16),
}

enum Body {
    Archive(Vec<u8>),
    Status(u16),
}

struct ScriptedRemote {
    ignore: IgnoreFile,
    link: Link,
    body: Body,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRemote {
    fn new(ignore: IgnoreFile, link: Link, body: Body) -> Self {
        Self {
            ignore,
            link,
            body,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn happy(ignore: IgnoreFile) -> Self {
        Self::new(
            ignore,
            Link::To("https://codeload.example.com/o/r/legacy.tar.gz/HEAD"),
            Body::Archive(sample_archive()),
        )
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn maybe_stall(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl RemoteRepository for ScriptedRemote {
    async fn resolve_commit(&self, repo: &RepoRef) -> RemoteResult<String> {
        self.record(format!("resolve {repo}"));
        self.maybe_stall().await;
        Ok("4f2a1c9be07d3a56c1e2f8d90b7a6e5c4d3b2a19".to_owned())
    }

    async fn file_content(&self, repo: &RepoRef, path: &str) -> RemoteResult<String> {
        self.record(format!("content {path}@{}", repo.git_ref()));
        self.maybe_stall().await;
        match self.ignore {
            IgnoreFile::Missing => Err(RemoteError::NotFound {
                resource: path.to_owned(),
            }),
            IgnoreFile::Content(text) => Ok(text.to_owned()),
            IgnoreFile::Unreachable => Err(RemoteError::Transport {
                context: "read ignore file".to_owned(),
                message: "connection reset".to_owned(),
            }),
        }
    }

    async fn archive_link(&self, repo: &RepoRef) -> RemoteResult<Option<Url>> {
        self.record(format!("link {}", repo.git_ref()));
        match self.link {
            Link::To(url) => Ok(Some(Url::parse(url).unwrap())),
            Link::Empty => Ok(None),
            Link::Status(status) => Err(RemoteError::Status {
                status,
                context: "archive link".to_owned(),
            }),
        }
    }

    async fn download(&self, url: &Url) -> RemoteResult<ByteStream> {
        self.record(format!("download {url}"));
        match &self.body {
            Body::Archive(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
            Body::Status(status) => Err(RemoteError::Status {
                status: *status,
                context: "download".to_owned(),
            }),
        }
    }
}

fn sample_archive() -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, data) in [
        ("o-r-4f2a1c9/", &b""[..]),
        ("o-r-4f2a1c9/Dockerfile", b"FROM scratch"),
        ("o-r-4f2a1c9/notes.log", b"noise"),
        ("o-r-4f2a1c9/src/app.py", b"print('hi')"),
    ] {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        if path.ends_with('/') {
            header.set_entry_type(tar::EntryType::Directory);
        }
        builder.append_data(&mut header, path, data).unwrap();
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(&builder.into_inner().unwrap()).unwrap();
    encoder.finish().unwrap()
}

async fn output_names(archive: repotar_archive::StrippedArchive) -> Vec<String> {
    let chunks: Vec<_> = archive.collect().await;
    let mut bytes = Vec::new();
    for chunk in chunks {
        bytes.extend_from_slice(&chunk.unwrap());
    }
    let mut tar = tar::Archive::new(GzDecoder::new(bytes.as_slice()));
    tar.entries()
        .unwrap()
        .map(|e| {
            let mut e = e.unwrap();
            let mut sink = Vec::new();
            e.read_to_end(&mut sink).unwrap();
            String::from_utf8(e.path_bytes().into_owned()).unwrap()
        })
        .collect()
}

fn repo() -> RepoRef {
    RepoRef::parse("o/r").unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_applies_repository_ignore_file() {
    let fetcher = ArchiveFetcher::new(ScriptedRemote::happy(IgnoreFile::Content("*.log\n")));

    let archive = fetcher.fetch(&repo()).await.unwrap();
    assert!(!archive.is_started());

    assert_eq!(output_names(archive).await, ["Dockerfile", "src/app.py"]);
    assert_eq!(
        fetcher.client().calls(),
        [
            "content .dockerignore@HEAD",
            "link HEAD",
            "download https://codeload.example.com/o/r/legacy.tar.gz/HEAD",
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_ignore_file_excludes_nothing() {
    let fetcher = ArchiveFetcher::new(ScriptedRemote::happy(IgnoreFile::Missing));

    let archive = fetcher.fetch(&repo()).await.unwrap();

    assert_eq!(
        output_names(archive).await,
        ["Dockerfile", "notes.log", "src/app.py"]
    );
}

#[tokio::test]
async fn custom_ignore_file_and_ref_are_requested() {
    let fetcher = ArchiveFetcher::new(ScriptedRemote::happy(IgnoreFile::Missing))
        .with_ignore_file(".repotarignore");
    let repo = RepoRef::parse("o/r@v1.2.0").unwrap();

    fetcher.exclusion_patterns(&repo).await.unwrap();

    assert_eq!(fetcher.client().calls(), ["content .repotarignore@v1.2.0"]);
}

#[tokio::test]
async fn unreachable_ignore_file_aborts() {
    let fetcher = ArchiveFetcher::new(ScriptedRemote::happy(IgnoreFile::Unreachable));

    let err = fetcher.fetch(&repo()).await.unwrap_err();

    assert!(matches!(err, FetchError::IgnoreFile { ref path, .. } if path == ".dockerignore"));
    assert_eq!(fetcher.client().calls().len(), 1, "no further calls after failure");
}

#[tokio::test]
async fn invalid_ignore_pattern_aborts() {
    let fetcher = ArchiveFetcher::new(ScriptedRemote::happy(IgnoreFile::Content("ok\nsrc/[a-\n")));

    let err = fetcher.fetch(&repo()).await.unwrap_err();

    assert!(matches!(err, FetchError::IgnorePatterns { .. }), "got {err:?}");
}

#[tokio::test]
async fn archive_link_status_is_reported() {
    let remote = ScriptedRemote::new(
        IgnoreFile::Missing,
        Link::Status(404),
        Body::Archive(Vec::new()),
    );
    let err = ArchiveFetcher::new(remote).fetch(&repo()).await.unwrap_err();

    assert!(matches!(err, FetchError::ArchiveLinkStatus { status: 404, .. }));
}

#[tokio::test]
async fn missing_archive_url_is_reported() {
    let remote = ScriptedRemote::new(IgnoreFile::Missing, Link::Empty, Body::Archive(Vec::new()));
    let err = ArchiveFetcher::new(remote).fetch(&repo()).await.unwrap_err();

    assert!(matches!(err, FetchError::MissingArchiveUrl { .. }));
}

#[tokio::test]
async fn download_status_is_reported() {
    let remote = ScriptedRemote::new(
        IgnoreFile::Missing,
        Link::To("https://codeload.example.com/x"),
        Body::Status(403),
    );
    let err = ArchiveFetcher::new(remote).fetch(&repo()).await.unwrap_err();

    assert!(matches!(err, FetchError::DownloadStatus { status: 403, .. }));
}

#[tokio::test]
async fn resolve_commit_returns_sha() {
    let fetcher = ArchiveFetcher::new(ScriptedRemote::happy(IgnoreFile::Missing));

    let sha = fetcher.resolve_commit(&repo()).await.unwrap();

    assert_eq!(sha, "4f2a1c9be07d3a56c1e2f8d90b7a6e5c4d3b2a19");
}

#[tokio::test(start_paused = true)]
async fn slow_remote_call_times_out() {
    let mut remote = ScriptedRemote::happy(IgnoreFile::Missing);
    remote.delay = Some(Duration::from_secs(301));
    let fetcher = ArchiveFetcher::new(remote);

    let err = fetcher.resolve_commit(&repo()).await.unwrap_err();

    match err {
        FetchError::Timeout { operation, timeout } => {
            assert_eq!(operation, "commit resolution");
            assert_eq!(timeout, Duration::from_secs(300));
        },
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn configured_timeout_bounds_ignore_fetch() {
    let mut remote = ScriptedRemote::happy(IgnoreFile::Content("*.log"));
    remote.delay = Some(Duration::from_secs(10));
    let fetcher = ArchiveFetcher::new(remote).with_timeout(Duration::from_secs(5));

    let err = fetcher.fetch(&repo()).await.unwrap_err();

    assert!(matches!(err, FetchError::Timeout { operation: "ignore file fetch", .. }));
}
