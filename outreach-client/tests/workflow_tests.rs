use outreach_client::notifications::{NotificationAction, NotificationLevel};
use outreach_client::stages::{Gate, Settled, StageError};
use outreach_client::{Stage, WorkflowSession};
use outreach_core::{CampaignDraftMetadata, CampaignId, EmailStatus, EntityIdType, ErrorKind, StepId};
use outreach_test_utils::fixtures::{contact_rows, csv_upload, reopen_session, stub_session};
use outreach_test_utils::{StubCampaignService, StubOp};
use std::sync::Arc;
use tempfile::TempDir;

fn service_kind(err: &StageError) -> Option<ErrorKind> {
    err.service_error().map(|e| e.kind)
}

/// Upload and confirm `emails`, leaving the session at the Generate stage.
async fn confirmed_session(
    stub: Arc<StubCampaignService>,
    emails: &[&str],
) -> (TempDir, WorkflowSession) {
    let (dir, session) = stub_session(stub);
    let mut ingest = session.ingest();
    ingest.enter();
    ingest.select_file(csv_upload(emails));
    ingest.upload().await.unwrap();

    let mut preview = session.preview();
    preview.enter();
    preview.confirm().await.unwrap();
    (dir, session)
}

#[tokio::test]
async fn upload_confirm_generate_send_status() {
    let stub = Arc::new(
        StubCampaignService::new()
            .with_next_campaign_id(42)
            .with_step_count(1),
    );
    let (_dir, session) = stub_session(stub.clone());

    let mut ingest = session.ingest();
    assert_eq!(ingest.enter(), Gate::Ready);
    ingest.select_file(csv_upload(&["a@x.com", "b@x.com", "c@x.com"]));
    assert_eq!(ingest.upload().await.unwrap(), Settled::Applied);
    assert_eq!(ingest.next_stage(), Some(Stage::Preview));
    let rows = session.store().preview_rows().unwrap();
    assert_eq!(
        rows.iter().map(|r| r.email.as_str()).collect::<Vec<_>>(),
        vec!["a@x.com", "b@x.com", "c@x.com"]
    );
    assert_eq!(session.store().draft_metadata(), Some(CampaignDraftMetadata::default()));

    let mut preview = session.preview();
    assert_eq!(preview.enter(), Gate::Ready);
    assert_eq!(preview.rows().len(), 3);
    assert_eq!(preview.confirm().await.unwrap(), Settled::Applied);
    assert_eq!(preview.next_stage(), Some(Stage::Generate));
    assert_eq!(session.store().campaign_id(), Some(CampaignId::new(42)));
    assert!(session.store().preview_rows().is_none());
    assert!(session.store().draft_metadata().is_none());

    let mut generate = session.generate();
    assert_eq!(generate.enter(), Gate::Ready);
    generate.generate().await.unwrap();
    let drafts = generate.board().drafts();
    assert_eq!(drafts.len(), 3);
    assert!(drafts
        .iter()
        .all(|d| d.sequence_step_id == Some(StepId::new(1)) && !d.is_reply));

    let mut send = session.send();
    assert_eq!(send.enter(), Gate::Ready);
    assert_eq!(send.step_number(), 1);
    send.send().await.unwrap();
    let receipt = send.last_receipt().unwrap();
    assert_eq!((receipt.step_number, receipt.sent), (1, 3));

    let mut status = session.status();
    assert_eq!(status.enter(), Gate::Ready);
    status.refresh().await.unwrap();
    let summary = status.summary().unwrap();
    assert_eq!(summary.sent, 3);
    assert_eq!(summary.sent_emails.len(), 3);
}

#[tokio::test]
async fn campaign_stages_reject_actions_without_campaign() {
    let stub = Arc::new(StubCampaignService::new());
    let (_dir, session) = stub_session(stub.clone());

    let mut generate = session.generate();
    assert!(matches!(generate.enter(), Gate::GoBack { to: Stage::Preview, .. }));
    assert!(matches!(generate.load().await, Err(StageError::MissingCampaign)));
    assert!(matches!(generate.generate().await, Err(StageError::MissingCampaign)));

    let mut send = session.send();
    assert!(!send.enter().is_ready());
    assert!(matches!(send.send().await, Err(StageError::MissingCampaign)));

    let mut status = session.status();
    assert!(!status.enter().is_ready());
    assert!(matches!(status.refresh().await, Err(StageError::MissingCampaign)));

    let mut replies = session.replies();
    assert!(!replies.enter().is_ready());
    assert!(matches!(replies.load().await, Err(StageError::MissingCampaign)));

    assert_eq!(stub.call_count(), 0);
    assert!(!generate.is_busy() && !send.is_busy() && !status.is_busy() && !replies.is_busy());

    let notifications = session.notifications().drain();
    assert_eq!(notifications.len(), 5);
    assert!(notifications.iter().all(|n| n.level == NotificationLevel::Warning
        && n.action == Some(NotificationAction::GoBack(Stage::Preview))));
}

#[tokio::test]
async fn preview_without_upload_points_back_to_ingest() {
    let stub = Arc::new(StubCampaignService::new());
    let (_dir, session) = stub_session(stub.clone());

    let mut preview = session.preview();
    assert!(matches!(preview.enter(), Gate::GoBack { to: Stage::Ingest, .. }));
    assert!(matches!(preview.confirm().await, Err(StageError::MissingPreview)));

    session.store().set_preview_rows(&contact_rows(&["a@x.com"])).unwrap();
    preview.enter();
    assert!(matches!(preview.confirm().await, Err(StageError::MissingMetadata)));
    assert_eq!(stub.call_count(), 0);
}

#[tokio::test]
async fn upload_without_file_is_rejected() {
    let stub = Arc::new(StubCampaignService::new());
    let (_dir, session) = stub_session(stub.clone());
    let mut ingest = session.ingest();
    ingest.enter();
    assert!(matches!(ingest.upload().await, Err(StageError::NoFile)));
    assert_eq!(stub.call_count(), 0);
}

#[tokio::test]
async fn form_values_travel_with_the_upload() {
    let stub = Arc::new(StubCampaignService::new());
    let (_dir, session) = stub_session(stub);
    let mut ingest = session.ingest();
    ingest.enter();
    ingest.set_campaign_name("Spring launch");
    ingest.set_product_name("   ");
    ingest.set_product_description("Faster widgets");
    ingest.select_file(csv_upload(&["a@x.com"]));
    ingest.upload().await.unwrap();

    let meta = session.store().draft_metadata().unwrap();
    assert_eq!(meta.campaign_name, "Spring launch");
    assert_eq!(meta.product_name, "My Product");
    assert_eq!(meta.product_description, "Faster widgets");
}

#[tokio::test]
async fn confirming_empty_contacts_yields_no_campaign() {
    let stub = Arc::new(StubCampaignService::new());
    let (_dir, session) = stub_session(stub);
    session.store().set_preview_rows(&[]).unwrap();
    session
        .store()
        .set_draft_metadata(&CampaignDraftMetadata::default())
        .unwrap();

    let mut preview = session.preview();
    preview.enter();
    let err = preview.confirm().await.unwrap_err();
    assert_eq!(service_kind(&err), Some(ErrorKind::Confirm));
    assert!(session.store().campaign_id().is_none());
    assert!(preview.campaign().is_none());
    assert_eq!(session.store().preview_rows(), Some(Vec::new()));

    let latest = session.notifications().latest().unwrap();
    assert!(latest.is_blocking());
    assert_eq!(latest.action, Some(NotificationAction::Retry));
}

#[tokio::test]
async fn confirm_with_failed_store_write_keeps_upload() {
    let stub = Arc::new(StubCampaignService::new());
    let (_dir, session) = stub_session(stub.clone());
    let mut ingest = session.ingest();
    ingest.enter();
    ingest.select_file(csv_upload(&["a@x.com"]));
    ingest.upload().await.unwrap();

    let mut preview = session.preview();
    preview.enter();
    let path = session.store().path().to_path_buf();
    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir(&path).unwrap();

    let err = preview.confirm().await.unwrap_err();
    assert!(matches!(err, StageError::Store(_)));
    assert!(session.store().campaign_id().is_none());
    assert!(!session.gate(Stage::Generate).is_ready());
    assert_eq!(session.store().preview_rows().map(|r| r.len()), Some(1));
    assert!(session.store().draft_metadata().is_some());
    assert!(preview.campaign().is_none());
    assert_eq!(preview.rows().len(), 1);
    assert_eq!(
        session.notifications().latest().unwrap().action,
        Some(NotificationAction::Retry)
    );
}

#[tokio::test]
async fn generating_twice_does_not_duplicate_drafts() {
    let stub = Arc::new(StubCampaignService::new());
    let (_dir, session) = confirmed_session(stub.clone(), &["a@x.com", "b@x.com", "c@x.com"]).await;

    let mut generate = session.generate();
    generate.enter();
    generate.generate().await.unwrap();
    assert_eq!(generate.board().drafts().len(), 9);

    generate.generate().await.unwrap();
    assert_eq!(generate.board().drafts().len(), 9);
    assert_eq!(stub.emails().len(), 9);
}

#[tokio::test]
async fn generation_can_target_selected_contacts() {
    let stub = Arc::new(StubCampaignService::new());
    let (_dir, session) = confirmed_session(stub.clone(), &["a@x.com", "b@x.com"]).await;

    let mut generate = session.generate();
    generate.enter();
    generate.load().await.unwrap();
    assert_eq!(generate.contacts().len(), 2);

    let target = generate.contacts()[1].id.unwrap();
    assert!(generate.toggle_contact(target));
    generate.generate().await.unwrap();

    let drafts = generate.board().drafts();
    assert_eq!(drafts.len(), 3);
    assert!(drafts.iter().all(|d| d.contact_id == target));
}

#[tokio::test]
async fn saved_edit_round_trips_exactly() {
    let stub = Arc::new(StubCampaignService::new().with_step_count(1));
    let (_dir, session) = confirmed_session(stub.clone(), &["a@x.com", "b@x.com"]).await;

    let mut generate = session.generate();
    generate.enter();
    generate.generate().await.unwrap();
    let before = stub.emails();
    let target = generate.board().drafts()[1].id;

    let board = generate.board_mut();
    board.select(target).unwrap();
    board.edit_subject("Quick question").unwrap();
    board.edit_body("Do you have five minutes?").unwrap();
    assert!(board.is_dirty());
    assert_eq!(generate.save().await.unwrap(), Settled::Applied);

    assert_eq!(generate.board().selected_id(), Some(target));
    let saved = generate.board().selected().unwrap();
    assert_eq!(saved.subject, "Quick question");
    assert_eq!(saved.body_text, "Do you have five minutes?");
    assert_eq!(saved.status, EmailStatus::Draft);
    assert!(!generate.board().is_dirty());

    for (old, new) in before.iter().zip(stub.emails()) {
        if old.id != target {
            assert_eq!(*old, new);
        }
    }
}

#[tokio::test]
async fn failed_update_leaves_state_and_selection() {
    let stub = Arc::new(StubCampaignService::new().with_step_count(1));
    let (_dir, session) = confirmed_session(stub.clone(), &["a@x.com", "b@x.com"]).await;

    let mut generate = session.generate();
    generate.enter();
    generate.generate().await.unwrap();
    let target = generate.board().drafts()[0].id;
    generate.board_mut().select(target).unwrap();
    generate.board_mut().edit_subject("Unsaved").unwrap();
    assert!(stub.remove_email(target));

    let campaign_before = session.store().campaign_id();
    let err = generate.save().await.unwrap_err();
    assert_eq!(service_kind(&err), Some(ErrorKind::Update));
    assert_eq!(session.store().campaign_id(), campaign_before);
    assert_eq!(generate.board().selected_id(), Some(target));
    assert_eq!(generate.board().editing().map(|d| d.subject.as_str()), Some("Unsaved"));
    assert!(!generate.is_busy());
}

#[tokio::test]
async fn refresh_falls_back_when_selected_draft_disappears() {
    let stub = Arc::new(StubCampaignService::new().with_step_count(1));
    let (_dir, session) = confirmed_session(stub.clone(), &["a@x.com", "b@x.com", "c@x.com"]).await;

    let mut generate = session.generate();
    generate.enter();
    generate.generate().await.unwrap();
    let kept = generate.board().drafts()[2].id;
    generate.board_mut().select(kept).unwrap();

    generate.load().await.unwrap();
    assert_eq!(generate.board().selected_id(), Some(kept));

    stub.remove_email(kept);
    generate.load().await.unwrap();
    let first = generate.board().drafts()[0].id;
    assert_eq!(generate.board().selected_id(), Some(first));
}

#[tokio::test]
async fn replies_are_listed_apart_and_marked_sent() {
    let stub = Arc::new(StubCampaignService::new().with_step_count(1));
    let (_dir, session) = confirmed_session(stub.clone(), &["a@x.com"]).await;
    let campaign_id = session.store().campaign_id().unwrap();

    let mut generate = session.generate();
    generate.enter();
    generate.generate().await.unwrap();
    let contact_id = generate.board().drafts()[0].contact_id;
    let reply_id = stub.inject_reply(campaign_id, contact_id, "Re: hello", "Thanks for reaching out");

    generate.load().await.unwrap();
    assert_eq!(generate.board().drafts().len(), 1);
    assert!(generate.board().drafts().iter().all(|d| d.id != reply_id));

    let mut replies = session.replies();
    assert_eq!(replies.enter(), Gate::Ready);
    replies.load().await.unwrap();
    assert_eq!(replies.board().drafts().len(), 1);
    assert_eq!(replies.board().selected_id(), Some(reply_id));

    replies.board_mut().edit_body("Happy to chat on Friday").unwrap();
    replies.mark_sent().await.unwrap();

    let sent = replies.board().selected().unwrap();
    assert_eq!(sent.id, reply_id);
    assert_eq!(sent.status, EmailStatus::Sent);
    assert_eq!(sent.subject, "Re: hello");
    assert_eq!(sent.body_text, "Happy to chat on Friday");
    assert!(sent.sent_at.is_some());
}

#[tokio::test]
async fn result_settling_after_leave_is_discarded() {
    let stub = Arc::new(StubCampaignService::new());
    let (_dir, session) = confirmed_session(stub.clone(), &["a@x.com"]).await;

    let mut status = session.status();
    status.enter();
    let pending = status.begin_refresh().unwrap();
    status.leave();
    let done = pending.settle().await;
    assert!(done.result.is_ok());
    assert_eq!(status.complete_refresh(done).unwrap(), Settled::Discarded);
    assert!(status.summary().is_none());

    // A discarded upload must not touch the store either.
    let campaign_id = session.store().campaign_id();
    let mut ingest = session.ingest();
    ingest.enter();
    ingest.select_file(csv_upload(&["z@x.com"]));
    let pending = ingest.begin_upload().unwrap();
    ingest.leave();
    ingest.enter();
    let done = pending.settle().await;
    assert_eq!(ingest.complete_upload(done).unwrap(), Settled::Discarded);
    assert!(session.store().preview_rows().is_none());
    assert_eq!(session.store().campaign_id(), campaign_id);
    assert!(ingest.next_stage().is_none());
}

#[tokio::test]
async fn one_request_in_flight_per_controller() {
    let stub = Arc::new(StubCampaignService::new());
    let (_dir, session) = confirmed_session(stub.clone(), &["a@x.com"]).await;

    let mut send = session.send();
    send.enter();
    let pending = send.begin_send().unwrap();
    assert!(send.is_busy());
    assert!(matches!(send.begin_send(), Err(StageError::InFlight(Stage::Send))));

    let done = pending.settle().await;
    assert_eq!(send.complete_send(done).unwrap(), Settled::Applied);
    assert!(!send.is_busy());
    assert_eq!(send.last_receipt().map(|r| r.sent), Some(0));
}

#[tokio::test]
async fn send_step_is_captured_when_started() {
    let stub = Arc::new(StubCampaignService::new());
    let (_dir, session) = confirmed_session(stub.clone(), &["a@x.com"]).await;
    let mut generate = session.generate();
    generate.enter();
    generate.generate().await.unwrap();

    let mut send = session.send();
    send.enter();
    send.select_step(2).unwrap();
    let pending = send.begin_send().unwrap();
    send.select_step(3).unwrap();
    let done = pending.settle().await;
    send.complete_send(done).unwrap();
    assert_eq!(send.last_receipt().map(|r| (r.step_number, r.sent)), Some((2, 1)));

    assert!(matches!(send.select_step(0), Err(StageError::Service(_))));
    assert_eq!(send.step_number(), 3);
}

#[tokio::test]
async fn service_failure_is_notified_and_state_kept() {
    let stub = Arc::new(StubCampaignService::new());
    let (_dir, session) = confirmed_session(stub.clone(), &["a@x.com"]).await;

    let mut send = session.send();
    send.enter();
    stub.fail_next(StubOp::Send, outreach_core::ServiceError::send("Provider unavailable"));
    let err = send.send().await.unwrap_err();
    assert_eq!(service_kind(&err), Some(ErrorKind::Send));
    assert!(send.last_receipt().is_none());
    assert!(session.store().campaign_id().is_some());

    let latest = session.notifications().latest().unwrap();
    assert_eq!(latest.level, NotificationLevel::Error);
    assert!(latest.message.contains("Provider unavailable"));

    send.send().await.unwrap();
    assert!(send.last_receipt().is_some());
}

#[tokio::test]
async fn contact_list_failure_does_not_block_drafts() {
    let stub = Arc::new(StubCampaignService::new().with_step_count(1));
    let (_dir, session) = confirmed_session(stub.clone(), &["a@x.com"]).await;
    let mut generate = session.generate();
    generate.enter();
    generate.generate().await.unwrap();

    stub.fail_next(StubOp::ListContacts, outreach_core::ServiceError::fetch("timeout"));
    assert_eq!(generate.load().await.unwrap(), Settled::Applied);
    assert_eq!(generate.board().drafts().len(), 1);
    assert_eq!(
        session.notifications().latest().map(|n| n.level),
        Some(NotificationLevel::Warning)
    );
}

#[tokio::test]
async fn session_state_survives_reopen_but_not_other_sessions() {
    let stub = Arc::new(StubCampaignService::new().with_next_campaign_id(7));
    let (dir, session) = confirmed_session(stub.clone(), &["a@x.com"]).await;
    let session_id = session.session_id().to_string();
    drop(session);

    let reopened = reopen_session(&dir, &session_id, stub.clone());
    assert_eq!(reopened.store().campaign_id(), Some(CampaignId::new(7)));
    assert!(reopened.gate(Stage::Status).is_ready());

    let other = reopen_session(&dir, "another-tab", stub);
    assert!(other.store().campaign_id().is_none());
    assert!(!other.gate(Stage::Status).is_ready());
}

#[tokio::test]
async fn teardown_ends_the_session() {
    let stub = Arc::new(StubCampaignService::new());
    let (dir, session) = confirmed_session(stub.clone(), &["a@x.com"]).await;
    let session_id = session.session_id().to_string();
    let path = session.store().path().to_path_buf();
    assert!(path.exists());

    session.teardown().unwrap();
    assert!(!path.exists());
    let reopened = reopen_session(&dir, &session_id, stub);
    assert!(reopened.store().campaign_id().is_none());
}
