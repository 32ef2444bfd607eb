//! Per-user conversation state machine.
//!
//! A user is idle until a flow command (`/createzip`, `/quickcreate`,
//! `/createpdf`) stores a session. The next text or document consumes that
//! session: it is parsed, optionally held back for confirmation, then turned
//! into an archive or PDF and delivered. Sessions are taken before any work
//! starts, so every failure leaves the user idle again.

use std::{
    path::PathBuf,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use {
    fsbot_config::FsbotConfig,
    fsbot_structure::{
        ArchiveFormat, ArchiveJob, InputKind, Progress, StructureEntry, entry, pdf, template,
    },
    serde::Serialize,
    tokio::sync::mpsc,
    tracing::{debug, info, warn},
};

use crate::{
    commands::{self, ApiCommand, Command},
    error::{Error, Result},
    outbound::ChatTransport,
    session::{Action, Session, SessionStore},
};

const IDLE_TEXT: &str = "Please use a command like /createzip, /quickcreate, or /createpdf.";
const IDLE_DOCUMENT_TEXT: &str = "Please use /createzip or /createpdf first.";
const CANCELED_TEXT: &str = "Operation canceled.";
const PDF_SENT_TEXT: &str = "PDF created and sent!";
/// Paths listed in a confirmation prompt.
const PREVIEW_ENTRIES: usize = 5;

/// Limits and locations the dispatcher works with.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub confirm_threshold: usize,
    pub progress_every: usize,
    pub max_entries: usize,
    pub max_upload_bytes: u32,
    pub work_dir: PathBuf,
    pub creator: String,
}

impl DispatchSettings {
    #[must_use]
    pub fn from_config(config: &FsbotConfig) -> Self {
        Self {
            confirm_threshold: config.structure.confirm_threshold,
            progress_every: config.structure.progress_every,
            max_entries: config.structure.max_entries,
            max_upload_bytes: config.telegram.max_upload_bytes,
            work_dir: config.structure.resolved_work_dir(),
            creator: config.api.creator.clone(),
        }
    }
}

/// A message reduced to what the state machine cares about.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub user: u64,
    pub chat_id: i64,
    pub kind: InboundKind,
}

#[derive(Debug, Clone)]
pub enum InboundKind {
    Command(Command),
    Text(String),
    Document {
        file_id: String,
        file_name: Option<String>,
        size: u32,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ApiTestResponse<'a> {
    creator: &'a str,
    status: bool,
    version: &'static str,
    timestamp: u64,
    message: &'static str,
}

pub struct Dispatcher {
    transport: Arc<dyn ChatTransport>,
    sessions: SessionStore,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        sessions: SessionStore,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            transport,
            sessions,
            settings,
        }
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handle one inbound message.
    ///
    /// Flow errors are answered in chat; an `Err` means a reply itself could
    /// not be delivered.
    pub async fn dispatch(&self, inbound: Inbound) -> Result<()> {
        let Inbound {
            user,
            chat_id,
            kind,
        } = inbound;
        match kind {
            InboundKind::Command(command) => self.on_command(user, chat_id, command).await,
            InboundKind::Text(text) => self.on_text(user, chat_id, &text).await,
            InboundKind::Document {
                file_id,
                file_name,
                size,
            } => {
                self.on_document(user, chat_id, &file_id, file_name.as_deref(), size)
                    .await
            },
        }
    }

    async fn on_command(&self, user: u64, chat_id: i64, command: Command) -> Result<()> {
        debug!(user, chat_id, ?command, "command");
        match command {
            Command::Start => self.reply(chat_id, commands::START_TEXT).await,
            Command::Help => self.reply(chat_id, commands::HELP_TEXT).await,
            Command::CreateZip(format) => {
                self.sessions.set(user, Session::awaiting(Action::Archive, format));
                self.reply(chat_id, &commands::createzip_text(format)).await
            },
            Command::QuickCreate(format) => {
                self.sessions.set(user, Session::awaiting(Action::QuickArchive, format));
                self.reply(chat_id, &commands::quickcreate_text(format)).await
            },
            Command::CreatePdf => {
                self.sessions.set(user, Session::awaiting(Action::Pdf, ArchiveFormat::Zip));
                self.reply(chat_id, commands::CREATEPDF_TEXT).await
            },
            Command::Template { name, format } => {
                let (name, entries) = match preset(name.as_deref()) {
                    Ok(preset) => preset,
                    Err(e) => return self.reject(user, chat_id, &e).await,
                };
                let base_name = format!("{name}_structure");
                if let Err(e) = self
                    .build_archive(user, chat_id, &entries, format, &base_name)
                    .await
                {
                    return self.report_archive_failure(user, chat_id, &e).await;
                }
                Ok(())
            },
            Command::Api(api) => self.on_api(user, chat_id, api).await,
            Command::Unknown(name) => {
                self.reply(
                    chat_id,
                    &format!("Unknown command /{name}. Use /help to see what I can do."),
                )
                .await
            },
        }
    }

    async fn on_api(&self, user: u64, chat_id: i64, api: ApiCommand) -> Result<()> {
        match api {
            ApiCommand::Test => {
                let timestamp = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis() as u64)
                    .unwrap_or_default();
                let response = ApiTestResponse {
                    creator: &self.settings.creator,
                    status: true,
                    version: env!("CARGO_PKG_VERSION"),
                    timestamp,
                    message: "API test successful!",
                };
                let body = serde_json::to_string_pretty(&response)
                    .map_err(|e| Error::external("serialize api test response", e))?;
                self.reply(chat_id, &body).await
            },
            ApiCommand::CreateStructure(raw) => {
                let spec = match entry::parse_json(&raw).and_then(|spec| {
                    entry::ensure_within_limit(&spec.entries, self.settings.max_entries)?;
                    Ok(spec)
                }) {
                    Ok(spec) => spec,
                    Err(e) => {
                        info!(user, error = %e, "rejected api structure");
                        return self.reply(chat_id, &format!("API error: {e}")).await;
                    },
                };
                let format = spec.format.unwrap_or_default();
                if let Err(e) = self
                    .build_archive(user, chat_id, &spec.entries, format, "api_structure")
                    .await
                {
                    warn!(user, error = %e, "api structure failed");
                    return self.reply(chat_id, &format!("API error: {e}")).await;
                }
                Ok(())
            },
            ApiCommand::Usage => {
                let e = Error::invalid_argument(commands::API_USAGE_TEXT);
                self.reject(user, chat_id, &e).await
            },
        }
    }

    async fn on_text(&self, user: u64, chat_id: i64, text: &str) -> Result<()> {
        let Some(session) = self.sessions.take(user) else {
            return self.reply(chat_id, IDLE_TEXT).await;
        };

        if let Some(pending) = session.pending {
            if text.trim().eq_ignore_ascii_case("yes") {
                return self
                    .archive_or_report(user, chat_id, &pending, session.format)
                    .await;
            }
            info!(user, entries = pending.len(), "structure canceled");
            return self.reply(chat_id, CANCELED_TEXT).await;
        }

        match session.action {
            Action::Archive | Action::QuickArchive => {
                self.on_structure_input(user, chat_id, entry::parse_lines(text), session.format)
                    .await
            },
            Action::Pdf => self.deliver_pdf(user, chat_id, text).await,
        }
    }

    async fn on_document(
        &self,
        user: u64,
        chat_id: i64,
        file_id: &str,
        file_name: Option<&str>,
        size: u32,
    ) -> Result<()> {
        let Some(session) = self.sessions.take(user) else {
            return self.reply(chat_id, IDLE_DOCUMENT_TEXT).await;
        };
        if session.pending.is_some() {
            return self.reply(chat_id, CANCELED_TEXT).await;
        }

        let text = match self.fetch_text(file_id, size).await {
            Ok(text) => text,
            Err(e) => {
                warn!(user, file_id, error = %e, "document download failed");
                return self.reply(chat_id, &format!("Error: {e}")).await;
            },
        };

        match session.action {
            Action::Archive | Action::QuickArchive => {
                let kind = InputKind::from_file_name(file_name);
                self.on_structure_input(user, chat_id, entry::parse(&text, kind), session.format)
                    .await
            },
            Action::Pdf => self.deliver_pdf(user, chat_id, &text).await,
        }
    }

    async fn fetch_text(&self, file_id: &str, size: u32) -> Result<String> {
        if size > self.settings.max_upload_bytes {
            return Err(Error::download(format!(
                "file is too large ({size} bytes, limit {})",
                self.settings.max_upload_bytes
            )));
        }
        let bytes = self.transport.download(file_id).await?;
        String::from_utf8(bytes).map_err(|_| Error::download("file is not valid UTF-8 text"))
    }

    /// Parsed entries either go straight to the packager or wait for a "yes".
    async fn on_structure_input(
        &self,
        user: u64,
        chat_id: i64,
        parsed: fsbot_structure::Result<Vec<StructureEntry>>,
        format: ArchiveFormat,
    ) -> Result<()> {
        let entries = match parsed.and_then(|entries| {
            entry::ensure_within_limit(&entries, self.settings.max_entries)?;
            Ok(entries)
        }) {
            Ok(entries) => entries,
            Err(e) => {
                info!(user, error = %e, "rejected structure input");
                return self.reply(chat_id, &format!("Error: {e}")).await;
            },
        };

        if entries.len() > self.settings.confirm_threshold {
            let prompt = confirmation_prompt(&entries);
            info!(user, entries = entries.len(), "structure awaiting confirmation");
            self.sessions.set(user, Session::confirming(format, entries));
            return self.reply(chat_id, &prompt).await;
        }

        self.archive_or_report(user, chat_id, &entries, format).await
    }

    async fn archive_or_report(
        &self,
        user: u64,
        chat_id: i64,
        entries: &[StructureEntry],
        format: ArchiveFormat,
    ) -> Result<()> {
        match self
            .build_archive(user, chat_id, entries, format, "structure")
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => self.report_archive_failure(user, chat_id, &e).await,
        }
    }

    async fn report_archive_failure(&self, user: u64, chat_id: i64, error: &Error) -> Result<()> {
        warn!(user, chat_id, error = %error, "structure failed");
        self.reply(chat_id, &format!("Error creating structure: {error}")).await
    }

    /// Materialize, package and send an archive; scratch state is always removed.
    async fn build_archive(
        &self,
        user: u64,
        chat_id: i64,
        entries: &[StructureEntry],
        format: ArchiveFormat,
        base_name: &str,
    ) -> Result<()> {
        let job = ArchiveJob::new(&self.settings.work_dir, user)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let forwarder = tokio::spawn(forward_progress(Arc::clone(&self.transport), chat_id, rx));
        let built = job
            .build(
                entries,
                format,
                base_name,
                self.settings.progress_every,
                Some(&tx),
            )
            .await;
        // Progress messages must all be out before the document.
        drop(tx);
        if let Err(e) = forwarder.await {
            warn!(chat_id, error = %e, "progress forwarder panicked");
        }

        let outcome = match built {
            Ok(built) => {
                match self
                    .transport
                    .send_document(chat_id, &built.path, &built.file_name)
                    .await
                {
                    Ok(()) => {
                        self.reply(
                            chat_id,
                            &format!("Here's your {} file with the structure!", built.format),
                        )
                        .await
                    },
                    Err(e) => Err(e),
                }
            },
            Err(e) => Err(e.into()),
        };
        job.cleanup();
        outcome
    }

    async fn deliver_pdf(&self, user: u64, chat_id: i64, text: &str) -> Result<()> {
        let file_name = format!("output_{user}.pdf");
        let outcome = match ArchiveJob::new(&self.settings.work_dir, user) {
            Ok(job) => {
                let path = job.scratch_dir().join(&file_name);
                let sent = match pdf::write(text, &path).await {
                    Ok(size) => {
                        debug!(user, size, "pdf written");
                        self.transport
                            .send_document(chat_id, &path, &file_name)
                            .await
                    },
                    Err(e) => Err(e.into()),
                };
                job.cleanup();
                sent
            },
            Err(e) => Err(e.into()),
        };

        match outcome {
            Ok(()) => {
                info!(user, chat_id, "pdf delivered");
                self.reply(chat_id, PDF_SENT_TEXT).await
            },
            Err(e) => {
                warn!(user, chat_id, error = %e, "pdf failed");
                self.reply(chat_id, &format!("Error: {e}")).await
            },
        }
    }

    /// Answer a bad command argument with the error text itself.
    async fn reject(&self, user: u64, chat_id: i64, error: &Error) -> Result<()> {
        debug!(user, chat_id, error = %error, "invalid command argument");
        self.reply(chat_id, &error.to_string()).await
    }

    async fn reply(&self, chat_id: i64, text: &str) -> Result<()> {
        self.transport.send_text(chat_id, text).await
    }
}

async fn forward_progress(
    transport: Arc<dyn ChatTransport>,
    chat_id: i64,
    mut rx: mpsc::UnboundedReceiver<Progress>,
) {
    while let Some(progress) = rx.recv().await {
        if let Err(e) = transport.send_text(chat_id, &progress.to_string()).await {
            warn!(chat_id, error = %e, "failed to send progress update");
        }
    }
}

fn preset(name: Option<&str>) -> Result<(&str, Vec<StructureEntry>)> {
    name.and_then(|n| template::lookup(n).map(|entries| (n, entries)))
        .ok_or_else(|| {
            let names: Vec<&str> = template::names().collect();
            Error::invalid_argument(format!(
                "Invalid template. Available templates: {}",
                names.join(", ")
            ))
        })
}

fn confirmation_prompt(entries: &[StructureEntry]) -> String {
    let mut summary = entries
        .iter()
        .take(PREVIEW_ENTRIES)
        .map(|e| e.path.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    if entries.len() > PREVIEW_ENTRIES {
        summary.push_str(&format!("\n...and {} more", entries.len() - PREVIEW_ENTRIES));
    }
    format!(
        "About to create {} items:\n{summary}\nReply 'yes' to proceed or anything else to cancel.",
        entries.len()
    )
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        async_trait::async_trait,
        fsbot_structure::archive::read_archive,
        std::{collections::HashMap, path::Path, sync::Mutex, time::Duration},
        tempfile::TempDir,
    };

    const USER: u64 = 7;
    const CHAT: i64 = 42;

    #[derive(Debug, Clone, PartialEq)]
    enum Sent {
        Text(String),
        Document { name: String, bytes: Vec<u8> },
    }

    #[derive(Default)]
    struct MockTransport {
        sent: Mutex<Vec<Sent>>,
        files: HashMap<String, Vec<u8>>,
        downloads: Mutex<usize>,
    }

    #[async_trait]
    impl ChatTransport for MockTransport {
        async fn send_text(&self, _chat_id: i64, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push(Sent::Text(text.to_string()));
            Ok(())
        }

        async fn send_document(&self, _chat_id: i64, path: &Path, file_name: &str) -> Result<()> {
            // Scratch files are gone after delivery, so capture bytes now.
            let bytes = std::fs::read(path).unwrap();
            self.sent.lock().unwrap().push(Sent::Document {
                name: file_name.to_string(),
                bytes,
            });
            Ok(())
        }

        async fn download(&self, file_id: &str) -> Result<Vec<u8>> {
            *self.downloads.lock().unwrap() += 1;
            self.files
                .get(file_id)
                .cloned()
                .ok_or_else(|| Error::download("file not found"))
        }
    }

    struct Harness {
        transport: Arc<MockTransport>,
        dispatcher: Dispatcher,
        work: TempDir,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_files(HashMap::new())
        }

        fn with_files(files: HashMap<String, Vec<u8>>) -> Self {
            let work = TempDir::new().unwrap();
            let transport = Arc::new(MockTransport {
                files,
                ..Default::default()
            });
            let settings = DispatchSettings {
                confirm_threshold: 10,
                progress_every: 5,
                max_entries: 20,
                max_upload_bytes: 1024,
                work_dir: work.path().to_path_buf(),
                creator: "AI OF LAUTECH".into(),
            };
            let dispatcher = Dispatcher::new(
                Arc::clone(&transport) as Arc<dyn ChatTransport>,
                SessionStore::new(Duration::from_secs(60), 100),
                settings,
            );
            Self {
                transport,
                dispatcher,
                work,
            }
        }

        async fn command(&self, text: &str) {
            let command = commands::parse_command(text, None).unwrap();
            self.send(InboundKind::Command(command)).await;
        }

        async fn text(&self, text: &str) {
            self.send(InboundKind::Text(text.into())).await;
        }

        async fn document(&self, file_id: &str, file_name: &str, size: u32) {
            self.send(InboundKind::Document {
                file_id: file_id.into(),
                file_name: Some(file_name.into()),
                size,
            })
            .await;
        }

        async fn send(&self, kind: InboundKind) {
            self.dispatcher
                .dispatch(Inbound {
                    user: USER,
                    chat_id: CHAT,
                    kind,
                })
                .await
                .unwrap();
        }

        fn take_sent(&self) -> Vec<Sent> {
            std::mem::take(&mut *self.transport.sent.lock().unwrap())
        }

        fn texts(sent: &[Sent]) -> Vec<&str> {
            sent.iter()
                .filter_map(|s| match s {
                    Sent::Text(t) => Some(t.as_str()),
                    Sent::Document { .. } => None,
                })
                .collect()
        }

        fn documents(sent: &[Sent]) -> Vec<(&str, &[u8])> {
            sent.iter()
                .filter_map(|s| match s {
                    Sent::Document { name, bytes } => Some((name.as_str(), bytes.as_slice())),
                    Sent::Text(_) => None,
                })
                .collect()
        }

        fn scratch_is_empty(&self) -> bool {
            std::fs::read_dir(self.work.path()).unwrap().count() == 0
        }
    }

    fn archive_paths(bytes: &[u8], format: ArchiveFormat) -> Vec<String> {
        let mut names: Vec<String> = read_archive(bytes, format)
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn quickcreate_small_structure_is_archived_immediately() {
        let h = Harness::new();
        h.command("/quickcreate").await;
        assert!(Harness::texts(&h.take_sent())[0].contains("one path per line"));

        h.text("folder1/\nfolder1/file1.txt\n\nnotes.md").await;
        let sent = h.take_sent();

        let docs = Harness::documents(&sent);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].0, "structure_7.zip");
        assert_eq!(archive_paths(docs[0].1, ArchiveFormat::Zip), vec![
            "folder1/",
            "folder1/file1.txt",
            "notes.md"
        ]);
        assert_eq!(sent.last().unwrap(), &Sent::Text(
            "Here's your zip file with the structure!".into()
        ));
        assert_eq!(Harness::texts(&sent), vec![
            "Creating item 3/3...",
            "Here's your zip file with the structure!"
        ]);
        assert!(h.dispatcher.sessions().get(USER).is_none());
        assert!(h.scratch_is_empty());
    }

    #[tokio::test]
    async fn large_structure_waits_for_yes() {
        let h = Harness::new();
        h.command("/quickcreate tar.gz").await;
        h.take_sent();

        let lines: Vec<String> = (1..=12).map(|i| format!("dir/file{i}.txt")).collect();
        h.text(&lines.join("\n")).await;
        let sent = h.take_sent();
        assert!(Harness::documents(&sent).is_empty());
        let prompt = Harness::texts(&sent)[0];
        assert!(prompt.starts_with("About to create 12 items:\ndir/file1.txt\n"));
        assert!(prompt.contains("dir/file5.txt\n...and 7 more"));
        assert!(!prompt.contains("dir/file6.txt"));

        h.text("  YES ").await;
        let sent = h.take_sent();
        let docs = Harness::documents(&sent);
        assert_eq!(docs[0].0, "structure_7.tar.gz");
        let paths = archive_paths(docs[0].1, ArchiveFormat::TarGz);
        assert_eq!(paths.iter().filter(|p| p.ends_with(".txt")).count(), 12);

        // progress after every 5th entry and after the last one, before the file
        assert_eq!(&sent[..3], &[
            Sent::Text("Creating item 5/12...".into()),
            Sent::Text("Creating item 10/12...".into()),
            Sent::Text("Creating item 12/12...".into()),
        ]);
        assert!(matches!(sent[3], Sent::Document { .. }));
        assert!(h.scratch_is_empty());
    }

    #[tokio::test]
    async fn anything_but_yes_cancels() {
        let h = Harness::new();
        h.command("/createzip").await;
        let lines: Vec<String> = (0..11).map(|i| format!("f{i}")).collect();
        h.text(&lines.join("\n")).await;
        h.take_sent();

        h.text("yes please").await;
        assert_eq!(h.take_sent(), vec![Sent::Text(CANCELED_TEXT.into())]);

        // back to idle
        h.text("yes").await;
        assert_eq!(h.take_sent(), vec![Sent::Text(IDLE_TEXT.into())]);
    }

    #[tokio::test]
    async fn document_while_confirming_cancels_without_download() {
        let h = Harness::new();
        h.command("/createzip").await;
        let lines: Vec<String> = (0..11).map(|i| format!("f{i}")).collect();
        h.text(&lines.join("\n")).await;
        h.take_sent();

        h.document("doc", "more.txt", 10).await;
        assert_eq!(h.take_sent(), vec![Sent::Text(CANCELED_TEXT.into())]);
        assert_eq!(*h.transport.downloads.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn idle_user_gets_pointers() {
        let h = Harness::new();
        h.text("hello").await;
        h.document("doc", "a.txt", 3).await;
        assert_eq!(h.take_sent(), vec![
            Sent::Text(IDLE_TEXT.into()),
            Sent::Text(IDLE_DOCUMENT_TEXT.into()),
        ]);
    }

    #[tokio::test]
    async fn createzip_json_document() {
        let json = br#"{"structure": [{"path": "src/"}, {"path": "src/main.rs", "content": "fn main() {}"}]}"#;
        let h = Harness::with_files(HashMap::from([("doc".to_string(), json.to_vec())]));
        h.command("/createzip tar.gz").await;
        h.take_sent();

        h.document("doc", "Structure.JSON", json.len() as u32).await;
        let sent = h.take_sent();
        let docs = Harness::documents(&sent);
        assert_eq!(docs[0].0, "structure_7.tar.gz");
        let contents = read_archive(docs[0].1, ArchiveFormat::TarGz).unwrap();
        assert!(contents.contains(&("src/main.rs".to_string(), b"fn main() {}".to_vec())));
        assert!(h.scratch_is_empty());
    }

    #[tokio::test]
    async fn malformed_document_reports_error_and_clears_session() {
        let h = Harness::with_files(HashMap::from([("doc".to_string(), b"[{\"path\"".to_vec())]));
        h.command("/createzip").await;
        h.take_sent();

        h.document("doc", "bad.json", 8).await;
        let sent = h.take_sent();
        assert!(Harness::documents(&sent).is_empty());
        assert!(Harness::texts(&sent)[0].starts_with("Error: "));
        assert!(h.dispatcher.sessions().get(USER).is_none());
        assert!(h.scratch_is_empty());
    }

    #[tokio::test]
    async fn packaging_failure_reports_error_and_cleans_up() {
        let h = Harness::new();
        h.command("/quickcreate").await;
        h.take_sent();

        // `a` is created as a file, so `a/b.txt` has no directory to land in.
        h.text("a\na/b.txt").await;
        let sent = h.take_sent();
        assert!(Harness::documents(&sent).is_empty());
        let texts = Harness::texts(&sent);
        assert_eq!(texts.len(), 1);
        assert!(texts[0].starts_with("Error creating structure:"));
        assert!(h.dispatcher.sessions().get(USER).is_none());
        assert!(h.scratch_is_empty());

        h.text("a.txt").await;
        assert_eq!(Harness::texts(&h.take_sent()), vec![IDLE_TEXT]);
    }

    #[tokio::test]
    async fn oversized_document_is_refused_before_download() {
        let h = Harness::new();
        h.command("/createzip").await;
        h.take_sent();

        h.document("doc", "big.txt", 4096).await;
        assert_eq!(h.take_sent(), vec![Sent::Text(
            "Error: file is too large (4096 bytes, limit 1024)".into()
        )]);
        assert_eq!(*h.transport.downloads.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn entry_cap_applies_before_confirmation() {
        let h = Harness::new();
        h.command("/quickcreate").await;
        h.take_sent();

        let lines: Vec<String> = (0..21).map(|i| format!("f{i}")).collect();
        h.text(&lines.join("\n")).await;
        assert_eq!(h.take_sent(), vec![Sent::Text(
            "Error: structure has 21 entries, the limit is 20".into()
        )]);
        assert!(h.dispatcher.sessions().get(USER).is_none());
    }

    #[tokio::test]
    async fn template_python_defaults_to_zip() {
        let h = Harness::new();
        h.command("/template python").await;
        let sent = h.take_sent();
        let docs = Harness::documents(&sent);
        assert_eq!(docs[0].0, "python_structure_7.zip");
        assert_eq!(archive_paths(docs[0].1, ArchiveFormat::Zip), vec![
            "project/",
            "project/index.py",
            "project/requirements.txt",
            "project/utils/",
            "project/utils/__init__.py",
        ]);
    }

    #[tokio::test]
    async fn template_does_not_touch_session() {
        let h = Harness::new();
        h.command("/createpdf").await;
        h.command("/template web tar.gz").await;
        assert_eq!(
            h.dispatcher.sessions().get(USER).unwrap().action,
            Action::Pdf
        );
    }

    #[tokio::test]
    async fn unknown_template_lists_presets() {
        let h = Harness::new();
        h.command("/template rust").await;
        h.command("/template").await;
        let expected = Sent::Text("Invalid template. Available templates: web, python".into());
        assert_eq!(h.take_sent(), vec![expected.clone(), expected]);
    }

    #[tokio::test]
    async fn api_create_structure() {
        let h = Harness::new();
        h.command(r#"/api create_structure [{"path":"a.txt","content":"hi"}]"#)
            .await;
        let sent = h.take_sent();
        let docs = Harness::documents(&sent);
        assert_eq!(docs[0].0, "api_structure_7.zip");
        assert_eq!(read_archive(docs[0].1, ArchiveFormat::Zip).unwrap(), vec![(
            "a.txt".to_string(),
            b"hi".to_vec()
        )]);
        assert!(h.scratch_is_empty());
    }

    #[tokio::test]
    async fn api_create_structure_honors_format_and_skips_gate() {
        let h = Harness::new();
        let items: Vec<String> = (0..15).map(|i| format!(r#"{{"path": "f{i}"}}"#)).collect();
        h.command(&format!(
            r#"/api create_structure {{"format": "tar.gz", "structure": [{}]}}"#,
            items.join(", ")
        ))
        .await;
        let sent = h.take_sent();
        assert_eq!(Harness::documents(&sent)[0].0, "api_structure_7.tar.gz");
    }

    #[tokio::test]
    async fn api_malformed_json() {
        let h = Harness::new();
        h.command("/api create_structure [{\"path\": ").await;
        let sent = h.take_sent();
        assert_eq!(sent.len(), 1);
        assert!(Harness::texts(&sent)[0].starts_with("API error:"));
        assert!(h.scratch_is_empty());
    }

    #[tokio::test]
    async fn api_unknown_format_falls_back_to_zip() {
        let h = Harness::new();
        h.command(r#"/api create_structure {"format": "rar", "structure": [{"path": "a.txt"}]}"#)
            .await;
        let sent = h.take_sent();
        assert_eq!(Harness::documents(&sent)[0].0, "api_structure_7.zip");
    }

    #[tokio::test]
    async fn api_without_subcommand_shows_usage() {
        let h = Harness::new();
        h.command("/api create_pdf hello").await;
        assert_eq!(h.take_sent(), vec![Sent::Text(
            commands::API_USAGE_TEXT.to_string()
        )]);
    }

    #[tokio::test]
    async fn api_test_reports_status() {
        let h = Harness::new();
        h.command("/api test").await;
        let sent = h.take_sent();
        let body: serde_json::Value = serde_json::from_str(Harness::texts(&sent)[0]).unwrap();
        assert_eq!(body["Creator"], "AI OF LAUTECH");
        assert_eq!(body["Status"], true);
        assert_eq!(body["Version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(body["Message"], "API test successful!");
        assert!(body["Timestamp"].as_u64().unwrap() > 0);
    }

    #[tokio::test]
    async fn createpdf_from_text() {
        let h = Harness::new();
        h.command("/createpdf").await;
        h.take_sent();

        h.text("Hello, this is my PDF content!").await;
        let sent = h.take_sent();
        let docs = Harness::documents(&sent);
        assert_eq!(docs[0].0, "output_7.pdf");
        assert!(docs[0].1.starts_with(b"%PDF"));
        assert_eq!(sent.last().unwrap(), &Sent::Text(PDF_SENT_TEXT.into()));
        assert!(h.scratch_is_empty());
    }

    #[tokio::test]
    async fn createpdf_from_document() {
        let h = Harness::with_files(HashMap::from([(
            "doc".to_string(),
            b"line one\nline two".to_vec(),
        )]));
        h.command("/createpdf").await;
        h.take_sent();

        h.document("doc", "notes.txt", 17).await;
        let sent = h.take_sent();
        assert_eq!(Harness::documents(&sent)[0].0, "output_7.pdf");
    }

    #[tokio::test]
    async fn new_command_replaces_session() {
        let h = Harness::new();
        h.command("/createpdf").await;
        h.command("/createzip tar.gz").await;
        let session = h.dispatcher.sessions().get(USER).unwrap();
        assert_eq!(session.action, Action::Archive);
        assert_eq!(session.format, ArchiveFormat::TarGz);
    }

    #[tokio::test]
    async fn unknown_command_points_to_help() {
        let h = Harness::new();
        h.command("/frobnicate").await;
        assert!(Harness::texts(&h.take_sent())[0].contains("/help"));
    }

    #[test]
    fn prompt_lists_at_most_five() {
        let entries: Vec<StructureEntry> = (0..5)
            .map(|i| StructureEntry::path(format!("p{i}")))
            .collect();
        let prompt = confirmation_prompt(&entries);
        assert!(prompt.contains("p4"));
        assert!(!prompt.contains("more"));
    }
}
