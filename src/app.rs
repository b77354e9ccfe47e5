//! Terminal front end
//!
//! A line-oriented shell over [`GalleryController`]. Toasts are printed
//! after every command; session changes that arrive between commands (a
//! background token refresh, an expired session) are picked up through
//! the session gate's watch channel.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use media_gallery::backend::config::DEFAULT_BUCKET;
use media_gallery::backend::{
    AuthProvider, GoTrueClient, MemoryAuth, MemoryStorage, ProviderConfig, S3Storage, Session, StorageProvider,
};
use media_gallery::gallery::{
    AuthMode, DroppedFile, GalleryController, PreviewContent, PreviewOverlay, Providers, UploadOutcome, View,
};
use media_gallery::notify::{drain, ChannelNotifier, Toast, ToastLevel};
use media_gallery::settings::Settings;
use media_gallery::viewers::image::ImageViewer;
use media_gallery::viewers::waveform::TextWaveforms;

const HELP_SIGNED_OUT: &str = "\
Commands:
  signin <email> <password>   Sign in
  signup <email> <password>   Create an account
  mode                        Toggle between sign-in and sign-up
  help                        Show this help
  quit                        Exit";

const HELP_SIGNED_IN: &str = "\
Commands:
  ls                          List media
  upload <path>...            Upload a file (only the first is used)
  rm <name>                   Delete a file
  open <name>                 Preview a file
  close                       Close the preview
  refresh                     Reload the listing
  signout                     Sign out
  help                        Show this help
  quit                        Exit";

/// Main application state
pub struct App {
    controller: GalleryController,
    toasts: UnboundedReceiver<Toast>,
    settings: Settings,
    /// Set when talking to the hosted backend; sessions are only persisted then
    gotrue: Option<Arc<GoTrueClient>>,
    refresher: Option<JoinHandle<()>>,
    image_viewer: ImageViewer,
}

impl App {
    /// Create a new application instance
    pub async fn new() -> Result<Self> {
        let settings = Settings::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load settings, using defaults: {}", e);
            Settings::default()
        });

        let (notifier, toasts) = ChannelNotifier::new();

        let (auth, storage, gotrue): (Arc<dyn AuthProvider>, Arc<dyn StorageProvider>, _) =
            match ProviderConfig::from_env()? {
                Some(config) => {
                    tracing::info!("Connecting to {}", config.project_url);
                    let gotrue = Arc::new(GoTrueClient::new(&config.project_url, config.anon_key.clone())?);
                    gotrue.restore(settings.session.clone()).await;
                    let storage =
                        S3Storage::with_config(config.s3.clone(), config.bucket.clone(), config.project_url.clone())
                            .await?;
                    (gotrue.clone(), Arc::new(storage), Some(gotrue))
                }
                None => {
                    tracing::warn!("MEDIA_GALLERY_URL not set, running offline with in-memory providers");
                    (
                        Arc::new(MemoryAuth::new()),
                        Arc::new(MemoryStorage::new(DEFAULT_BUCKET)),
                        None,
                    )
                }
            };

        let providers = Providers {
            auth,
            storage,
            notifier: Arc::new(notifier),
            waveforms: Arc::new(TextWaveforms::new()),
        };

        let controller = GalleryController::start(providers).await;
        let refresher = gotrue.clone().map(GoTrueClient::spawn_auto_refresh);

        let mut app = Self {
            controller,
            toasts,
            settings,
            gotrue,
            refresher,
            image_viewer: ImageViewer::default(),
        };
        // A restored session may have been refreshed or dropped while mounting
        let current = app.controller.session().session();
        app.persist_session(current);
        Ok(app)
    }

    /// Run the shell until `quit` or end of input
    pub async fn run(mut self) -> Result<()> {
        println!("Media Gallery v{}", env!("CARGO_PKG_VERSION"));
        self.print_view();
        self.print_help();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut session = self.controller.session().watch();
        let mut session_open = true;

        loop {
            self.flush_toasts();
            self.prompt().await?;

            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    if !self.handle(line.trim()).await {
                        break;
                    }
                }
                changed = session.changed(), if session_open => {
                    if changed.is_err() {
                        session_open = false;
                        continue;
                    }
                    let current = session.borrow_and_update().clone();
                    self.persist_session(current);
                    let before = self.controller.view();
                    self.controller.sync_session().await;
                    if self.controller.view() != before {
                        println!();
                        self.print_view();
                    }
                }
            }
        }

        self.flush_toasts();
        self.shutdown();
        Ok(())
    }

    /// Execute one command. Returns `false` to exit.
    async fn handle(&mut self, line: &str) -> bool {
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            return true;
        };
        let args: Vec<&str> = parts.collect();

        match (command, self.controller.view()) {
            ("quit" | "exit", _) => return false,
            ("help", _) => self.print_help(),

            ("signin", View::Unauthenticated) => self.authenticate(AuthMode::SignIn, &args).await,
            ("signup", View::Unauthenticated) => self.authenticate(AuthMode::SignUp, &args).await,
            ("mode", View::Unauthenticated) => {
                self.controller.form().toggle_mode();
                println!("{}", self.controller.form().mode().title());
            }

            ("ls", View::Browsing | View::Previewing { .. }) => self.list().await,
            ("upload", View::Browsing | View::Previewing { .. }) => self.upload(&args).await,
            ("rm", View::Browsing | View::Previewing { .. }) => match args.first() {
                Some(name) => {
                    let _ = self.controller.delete(name).await;
                }
                None => println!("usage: rm <name>"),
            },
            ("open", View::Browsing | View::Previewing { .. }) => match args.first() {
                Some(name) => self.open(name).await,
                None => println!("usage: open <name>"),
            },
            ("close", View::Previewing { .. }) => {
                self.controller.close_preview();
                self.print_view();
            }
            ("refresh", View::Browsing | View::Previewing { .. }) => {
                if let Ok(count) = self.controller.refresh().await {
                    println!("{} items", count);
                }
            }
            ("signout", View::Browsing | View::Previewing { .. }) => {
                if self.controller.sign_out().await.is_ok() {
                    self.persist_session(None);
                    self.print_view();
                }
            }

            (command, _) => println!("Unknown command '{}'. Type 'help'.", command),
        }
        true
    }

    async fn authenticate(&mut self, mode: AuthMode, args: &[&str]) {
        let [email, password] = args else {
            println!("usage: {} <email> <password>", if mode == AuthMode::SignIn { "signin" } else { "signup" });
            return;
        };

        let form = self.controller.form();
        if form.mode() != mode {
            form.toggle_mode();
        }
        form.set_email(email);
        form.set_password(password);

        // Failures are toasted by the form
        if self.controller.submit_auth().await.is_ok() {
            self.settings.set_email(Some(*email));
            self.save_settings();
            if self.controller.view() != View::Unauthenticated {
                self.print_view();
            }
        }
    }

    async fn list(&self) {
        let items = self.controller.items().await;
        if items.is_empty() {
            println!("(no media)");
            return;
        }
        for item in items {
            let created = item
                .created_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("{:<6} {:<17} {}", item.media_type, created, item.name);
        }
    }

    async fn upload(&mut self, args: &[&str]) {
        if args.is_empty() {
            println!("usage: upload <path>...");
            return;
        }

        let paths: Vec<PathBuf> = args
            .iter()
            .map(|arg| self.settings.resolve_upload_path(Path::new(arg)))
            .collect();

        let mut files = Vec::with_capacity(paths.len());
        for path in &paths {
            match DroppedFile::read(path).await {
                Ok(file) => files.push(file),
                Err(e) => println!("{:#}", e),
            }
        }
        if files.is_empty() {
            return;
        }

        self.settings.set_upload_source(&paths[0]);
        self.save_settings();

        match self.controller.upload(files).await {
            Ok(UploadOutcome::Uploaded { key }) => println!("Stored as {}", key),
            Ok(UploadOutcome::Rejected { name }) => {
                println!("{} is not an accepted file (PNG, JPG, GIF, MP4, WebM, MP3, WAV)", name)
            }
            Ok(UploadOutcome::Empty) | Err(_) => {}
        }
    }

    async fn open(&mut self, name: &str) {
        if self.controller.open(name).await.is_none() {
            println!("No such item: {}", name);
            return;
        }
        if let Some(overlay) = self.controller.preview() {
            let storage = self.controller.providers().storage.clone();
            render_preview(overlay, storage.as_ref(), &self.image_viewer).await;
        }
    }

    fn persist_session(&mut self, session: Option<Session>) {
        if self.gotrue.is_some() && self.settings.set_session(session) {
            self.save_settings();
        }
    }

    fn save_settings(&self) {
        if let Err(e) = self.settings.save() {
            tracing::warn!("Failed to save settings: {:#}", e);
        }
    }

    fn flush_toasts(&mut self) {
        for toast in drain(&mut self.toasts) {
            match toast.level {
                ToastLevel::Success => println!("✔ {}", toast.message),
                ToastLevel::Error => println!("✖ {}", toast.message),
            }
        }
    }

    async fn prompt(&self) -> Result<()> {
        let prompt = match self.controller.view() {
            View::Unauthenticated => match self.controller.form().mode() {
                AuthMode::SignIn => "sign-in> ".to_string(),
                AuthMode::SignUp => "sign-up> ".to_string(),
            },
            View::Browsing => "gallery> ".to_string(),
            View::Previewing { name } => format!("gallery [{}]> ", name),
        };
        let mut stdout = tokio::io::stdout();
        stdout.write_all(prompt.as_bytes()).await?;
        stdout.flush().await?;
        Ok(())
    }

    fn print_view(&self) {
        match self.controller.view() {
            View::Unauthenticated => {
                let form = self.controller.form();
                println!("== {} ==", form.mode().title());
                if let Some(email) = &self.settings.last_email {
                    println!("(last signed in as {})", email);
                }
            }
            View::Browsing => {
                let who = self
                    .controller
                    .session()
                    .session()
                    .and_then(|s| s.user.email)
                    .unwrap_or_else(|| "unknown user".to_string());
                println!("== Media Gallery ({}) ==", who);
            }
            View::Previewing { name } => println!("== Preview: {} ==", name),
        }
    }

    fn print_help(&self) {
        match self.controller.view() {
            View::Unauthenticated => println!("{}", HELP_SIGNED_OUT),
            _ => println!("{}", HELP_SIGNED_IN),
        }
    }

    fn shutdown(self) {
        if let Some(refresher) = self.refresher {
            refresher.abort();
        }
        self.controller.shutdown();
        tracing::info!("Media Gallery exiting");
    }
}

async fn render_preview(overlay: &PreviewOverlay, storage: &dyn StorageProvider, viewer: &ImageViewer) {
    let item = overlay.item();
    match overlay.content() {
        PreviewContent::Image { url } => {
            let decoded = match storage.download(&item.name).await {
                Ok(data) => viewer.load_bytes(&data, &item.name),
                Err(e) => Err(anyhow::anyhow!("Failed to download {}: {}", item.name, e)),
            };
            match decoded {
                Ok(preview) => {
                    for row in &preview.thumbnail {
                        println!("{}", row);
                    }
                    println!("{}", preview.summary());
                }
                Err(e) => {
                    tracing::warn!("Image preview unavailable: {:#}", e);
                    println!("[image] {}", url);
                }
            }
        }
        PreviewContent::Video { url, controls } => {
            println!("▶ {}{}", url, if *controls { "  [play/pause/seek]" } else { "" });
        }
        PreviewContent::Audio { waveform } => println!("{}", waveform.render()),
    }
    println!("(type 'close' to close the preview)");
}
