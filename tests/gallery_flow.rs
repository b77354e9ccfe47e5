//! End-to-end gallery flow over the in-memory providers

use std::sync::Arc;

use media_gallery::backend::{MemoryAuth, MemoryStorage};
use media_gallery::gallery::{
    AuthMode, DroppedFile, GalleryController, MediaType, PreviewContent, Providers, SubmitOutcome, UploadOutcome, View,
};
use media_gallery::notify::{drain, ChannelNotifier, ToastLevel};
use media_gallery::viewers::TextWaveforms;

#[tokio::test]
async fn test_sign_up_sign_in_upload_preview_delete_sign_out() {
    let storage = Arc::new(MemoryStorage::new("media").with_object("old.wav", b"RIFF"));
    let waveforms = Arc::new(TextWaveforms::new());
    let (notifier, mut toasts) = ChannelNotifier::new();

    let mut controller = GalleryController::start(Providers {
        auth: Arc::new(MemoryAuth::new()),
        storage: storage.clone(),
        notifier: Arc::new(notifier),
        waveforms: waveforms.clone(),
    })
    .await;
    assert_eq!(controller.view(), View::Unauthenticated);

    // Register, which flips the form back to sign-in
    controller.form().toggle_mode();
    controller.form().set_email("me@example.com");
    controller.form().set_password("secret1");
    assert_eq!(controller.submit_auth().await.unwrap(), SubmitOutcome::Registered);
    assert_eq!(controller.form().mode(), AuthMode::SignIn);
    assert_eq!(controller.view(), View::Unauthenticated);

    controller.form().set_password("secret1");
    assert_eq!(controller.submit_auth().await.unwrap(), SubmitOutcome::SignedIn);
    assert_eq!(controller.view(), View::Browsing);
    assert_eq!(controller.items().await.len(), 1);

    let outcome = controller
        .upload(vec![DroppedFile::new("photo.PNG", &b"\x89PNG"[..])])
        .await
        .unwrap();
    let UploadOutcome::Uploaded { key } = outcome else {
        panic!("expected an upload, got {:?}", outcome);
    };
    assert!(key.ends_with(".PNG"));

    let items = controller.items().await;
    assert_eq!(items.len(), 2);
    let uploaded = items.iter().find(|i| i.name == key).unwrap();
    assert_eq!(uploaded.media_type, MediaType::Image);

    // Audio preview owns a waveform until closed
    let overlay = controller.open("old.wav").await.unwrap();
    assert!(matches!(overlay.content(), PreviewContent::Audio { .. }));
    assert_eq!(waveforms.live(), 1);
    controller.close_preview();
    assert_eq!(waveforms.live(), 0);
    assert_eq!(controller.view(), View::Browsing);

    controller.delete(&key).await.unwrap();
    assert_eq!(storage.names(), vec!["old.wav".to_string()]);

    controller.sign_out().await.unwrap();
    assert_eq!(controller.view(), View::Unauthenticated);

    let messages: Vec<(ToastLevel, String)> =
        drain(&mut toasts).into_iter().map(|t| (t.level, t.message)).collect();
    assert_eq!(
        messages,
        vec![
            (ToastLevel::Success, "Account created successfully! You can now sign in.".to_string()),
            (ToastLevel::Success, "Welcome back!".to_string()),
            (ToastLevel::Success, "File uploaded successfully!".to_string()),
            (ToastLevel::Success, "File deleted successfully".to_string()),
        ]
    );

    controller.shutdown();
}

#[tokio::test]
async fn test_wrong_password_stays_signed_out() {
    let (notifier, mut toasts) = ChannelNotifier::new();
    let mut controller = GalleryController::start(Providers {
        auth: Arc::new(MemoryAuth::new().with_user("me@example.com", "secret1")),
        storage: Arc::new(MemoryStorage::new("media")),
        notifier: Arc::new(notifier),
        waveforms: Arc::new(TextWaveforms::new()),
    })
    .await;

    controller.form().set_email("me@example.com");
    controller.form().set_password("wrong-password");
    assert!(controller.submit_auth().await.is_err());
    assert_eq!(controller.view(), View::Unauthenticated);

    let toasts = drain(&mut toasts);
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].level, ToastLevel::Error);
    assert_eq!(toasts[0].message, "Incorrect email or password. Please try again.");
}
