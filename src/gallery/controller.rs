//! Gallery controller
//!
//! Composes the session gate, auth form, uploader, gallery and preview
//! overlay, and owns the view state machine:
//!
//! ```text
//! Unauthenticated --sign-in--> Browsing --open--> Previewing
//!        ^                       |  ^                 |
//!        +-------sign-out--------+  +-----close-------+
//! ```
//!
//! Sign-out from any authenticated state returns to `Unauthenticated`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{AuthProvider, StorageProvider};
use crate::error::GalleryError;
use crate::gallery::auth_form::{AuthForm, SubmitOutcome};
use crate::gallery::lister::Gallery;
use crate::gallery::media::MediaItem;
use crate::gallery::preview::{PreviewOverlay, WaveformFactory};
use crate::gallery::session::SessionGate;
use crate::gallery::uploader::{DroppedFile, UploadOutcome, Uploader};
use crate::notify::Notifier;

/// How long to wait for the change stream to confirm a sign-in or sign-out
const SESSION_SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Which screen is showing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Unauthenticated,
    Browsing,
    Previewing { name: String },
}

/// Everything the controller talks to
#[derive(Clone)]
pub struct Providers {
    pub auth: Arc<dyn AuthProvider>,
    pub storage: Arc<dyn StorageProvider>,
    pub notifier: Arc<dyn Notifier>,
    pub waveforms: Arc<dyn WaveformFactory>,
}

pub struct GalleryController {
    providers: Providers,
    session: SessionGate,
    form: AuthForm,
    uploader: Uploader,
    refresh_requested: Arc<AtomicBool>,
    gallery: Option<Gallery>,
    preview: Option<PreviewOverlay>,
}

impl GalleryController {
    /// Mount the session gate and, if already signed in, the gallery
    pub async fn start(providers: Providers) -> Self {
        let session = SessionGate::mount(providers.auth.clone()).await;
        let form = AuthForm::new(providers.auth.clone(), providers.notifier.clone());

        let refresh_requested = Arc::new(AtomicBool::new(false));
        let flag = refresh_requested.clone();
        let uploader = Uploader::new(
            providers.storage.clone(),
            providers.notifier.clone(),
            move |key| {
                tracing::debug!("Upload of {} complete, refresh requested", key);
                flag.store(true, Ordering::SeqCst);
            },
        );

        let mut controller = Self {
            providers,
            session,
            form,
            uploader,
            refresh_requested,
            gallery: None,
            preview: None,
        };
        controller.sync_session().await;
        controller
    }

    pub fn view(&self) -> View {
        if self.gallery.is_none() {
            return View::Unauthenticated;
        }
        match &self.preview {
            Some(overlay) => View::Previewing {
                name: overlay.item().name.clone(),
            },
            None => View::Browsing,
        }
    }

    pub fn session(&self) -> &SessionGate {
        &self.session
    }

    pub fn form(&self) -> &AuthForm {
        &self.form
    }

    pub fn preview(&self) -> Option<&PreviewOverlay> {
        self.preview.as_ref()
    }

    pub fn providers(&self) -> &Providers {
        &self.providers
    }

    /// Bring the mounted components in line with the session gate
    pub async fn sync_session(&mut self) {
        let authenticated = self.session.is_authenticated();
        match (authenticated, self.gallery.is_some()) {
            (true, false) => {
                tracing::info!("Session present, mounting gallery");
                self.gallery = Some(
                    Gallery::mount(self.providers.storage.clone(), self.providers.notifier.clone()).await,
                );
            }
            (false, true) => {
                tracing::info!("Session ended, unmounting gallery");
                self.close_preview();
                if let Some(gallery) = self.gallery.take() {
                    gallery.unmount();
                }
            }
            _ => {}
        }
    }

    /// Submit the auth form and follow the resulting session change
    pub async fn submit_auth(&mut self) -> Result<SubmitOutcome, GalleryError> {
        let outcome = self.form.submit().await?;
        if outcome == SubmitOutcome::SignedIn
            && !self.session.wait_for_presence(true, SESSION_SETTLE_TIMEOUT).await
        {
            tracing::warn!("Signed in but no session change arrived");
        }
        self.sync_session().await;
        Ok(outcome)
    }

    pub async fn sign_out(&mut self) -> Result<(), GalleryError> {
        if let Err(e) = self.providers.auth.sign_out().await {
            tracing::error!("Error signing out: {}", e);
            let err = GalleryError::Auth(e.message);
            self.providers.notifier.error(&err.to_string());
            return Err(err);
        }
        if !self.session.wait_for_presence(false, SESSION_SETTLE_TIMEOUT).await {
            tracing::warn!("Signed out but no session change arrived");
        }
        self.sync_session().await;
        Ok(())
    }

    /// Upload a drop; a successful upload re-fetches the listing
    pub async fn upload(&self, files: Vec<DroppedFile>) -> Result<UploadOutcome, GalleryError> {
        if self.gallery.is_none() {
            tracing::debug!("Upload ignored: not signed in");
            return Ok(UploadOutcome::Empty);
        }
        let outcome = self.uploader.drop_files(files).await?;
        if self.refresh_requested.swap(false, Ordering::SeqCst) {
            // A failed refresh is already toasted; the upload itself succeeded
            let _ = self.refresh().await;
        }
        Ok(outcome)
    }

    /// Re-fetch the full listing
    pub async fn refresh(&self) -> Result<usize, GalleryError> {
        match &self.gallery {
            Some(gallery) => gallery.load().await,
            None => Ok(0),
        }
    }

    /// Delete an item. An open preview of that item stays open.
    pub async fn delete(&self, name: &str) -> Result<(), GalleryError> {
        let Some(gallery) = &self.gallery else {
            return Ok(());
        };
        gallery.delete(name).await?;
        if self.preview.as_ref().is_some_and(|p| p.item().name == name) {
            tracing::debug!("Deleted {} while it is being previewed", name);
        }
        Ok(())
    }

    pub async fn items(&self) -> Vec<MediaItem> {
        match &self.gallery {
            Some(gallery) => gallery.items().await,
            None => Vec::new(),
        }
    }

    /// Open the preview for a listed item, replacing any open one
    pub async fn open(&mut self, name: &str) -> Option<&PreviewOverlay> {
        let item = self.gallery.as_ref()?.find(name).await?;
        self.close_preview();
        self.preview = Some(PreviewOverlay::open(item, self.providers.waveforms.as_ref()));
        self.preview.as_ref()
    }

    pub fn close_preview(&mut self) {
        if let Some(overlay) = self.preview.take() {
            overlay.close();
        }
    }

    /// Tear everything down
    pub fn shutdown(mut self) {
        self.close_preview();
        if let Some(gallery) = self.gallery.take() {
            gallery.unmount();
        }
        self.session.unmount();
        tracing::debug!("Controller shut down");
    }
}
