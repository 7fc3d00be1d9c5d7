mod common;

use common::{DeployBehavior, FakeDeployer, HarnessBuilder};

use std::time::Duration;
use warpdeploy::InboundEvent;
use warpdeploy::command::{DeployCommand, QueryCommand};
use warpdeploy::orchestrator::Stage;
use warpdeploy::pipeline::EventOutcome;

const DEPLOY_PEPE: &str = "@bot deploy token name PEPE symbol PEPE";

fn mention(id: &str, text: &str) -> InboundEvent {
    InboundEvent::new(id, "alice", text).with_source("webhook")
}

#[tokio::test]
async fn deploys_without_image() {
    let harness = HarnessBuilder::new().build();

    let outcome = harness.pipeline.handle_event(mention("0xcast1", DEPLOY_PEPE));
    assert!(matches!(outcome, EventOutcome::Deploying { .. }));
    let request = outcome.finish().await.expect("deployment request");

    assert_eq!(request.stage, Stage::Succeeded);
    assert_eq!(
        request.trail,
        [Stage::Parsed, Stage::Deploying, Stage::Confirming, Stage::Succeeded]
    );

    let calls = harness.deployer.calls.lock().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "PEPE");
    assert_eq!(calls[0].symbol, "PEPE");
    assert_eq!(calls[0].token_admin, common::WALLET);
    let params = serde_json::to_value(&calls[0]).expect("params serialize");
    assert!(params.get("image").is_none());

    let replies = harness.feed.replies.lock().clone();
    assert_eq!(replies.len(), 2);
    assert!(replies.iter().all(|(to, _)| to == "0xcast1"));
    assert_eq!(
        replies[0].1,
        "🚀 Deploying token PEPE (PEPE) on Base... Please wait!"
    );
    let success = &replies[1].1;
    assert!(success.contains("0xABC"));
    assert!(success.contains("0x123"));
    assert!(success.contains("https://clanker.world/clanker/0xABC"));

    assert_eq!(harness.ledger.count().await, 1);
    let records = harness.ledger.list(1).await;
    assert_eq!(records[0].token_address, "0xABC");
    assert!(!records[0].has_image);
}

#[tokio::test]
async fn token_names_containing_keywords_still_deploy() {
    let harness = HarnessBuilder::new().build();

    let outcome = harness.pipeline.handle_event(mention(
        "0xcoffee",
        "@bot deploy token name Coffee symbol CAFE",
    ));
    assert!(matches!(outcome, EventOutcome::Deploying { .. }));
    let request = outcome.finish().await.expect("deployment request");
    assert_eq!(request.stage, Stage::Succeeded);

    let calls = harness.deployer.calls.lock().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "Coffee");
    assert_eq!(calls[0].symbol, "CAFE");
}

#[tokio::test]
async fn image_failure_degrades_to_deploy_without_image() {
    let harness = HarnessBuilder::new().failing_pins().build();

    let event = mention("0xcast2", DEPLOY_PEPE).with_attachment("https://img.example/logo.png");
    let request = harness
        .pipeline
        .handle_event(event)
        .finish()
        .await
        .expect("deployment request");

    assert_eq!(request.stage, Stage::Succeeded);
    assert!(request.trail.contains(&Stage::ImageFailed));
    assert!(request.image_uri.is_none());
    assert_eq!(*harness.pins.calls.lock(), 1);
    assert!(harness.deployer.calls.lock()[0].image.is_none());

    let texts = harness.feed.texts();
    assert_eq!(texts.len(), 3);
    assert!(texts[0].starts_with("🚀 Deploying token PEPE (PEPE) with your image"));
    assert!(texts[1].starts_with("⚠️ Warning: Failed to upload image to IPFS"));
    assert!(texts[2].starts_with("✅ Token PEPE deployed successfully!"));
    assert!(texts[2].contains("Not attached"));
}

#[tokio::test]
async fn pinned_image_is_passed_to_deployer() {
    let harness = HarnessBuilder::new().build();

    let event = mention("0xcast3", DEPLOY_PEPE)
        .with_attachment("https://example.com/page")
        .with_attachment("https://imagedelivery.net/abc/public");
    let request = harness
        .pipeline
        .handle_event(event)
        .finish()
        .await
        .expect("deployment request");

    assert_eq!(request.image_uri.as_deref(), Some("ipfs://QmLogo"));
    assert_eq!(
        request.command.image_ref.as_deref(),
        Some("https://imagedelivery.net/abc/public")
    );
    assert_eq!(
        harness.deployer.calls.lock()[0].image.as_deref(),
        Some("ipfs://QmLogo")
    );
    let texts = harness.feed.texts();
    assert_eq!(texts.len(), 2);
    assert!(texts[1].contains("with image"));
    assert!(harness.ledger.list(1).await[0].has_image);
}

#[tokio::test]
async fn help_is_answered_and_marked_seen() {
    let harness = HarnessBuilder::new().build();

    let outcome = harness.pipeline.handle_event(mention("0xhelp", "@bot help"));
    assert!(matches!(
        outcome,
        EventOutcome::Answered {
            query: QueryCommand::Help,
            ..
        }
    ));
    assert!(outcome.finish().await.is_none());

    assert!(harness.seen.contains("0xhelp"));
    assert_eq!(harness.deployer.call_count(), 0);
    let texts = harness.feed.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].starts_with("👋 Hi! I'm @bot"));
}

#[tokio::test]
async fn replayed_event_runs_once() {
    let harness = HarnessBuilder::new().build();

    let first = harness.pipeline.handle_event(mention("0xdup", DEPLOY_PEPE));
    let second = harness.pipeline.handle_event(mention("0xdup", DEPLOY_PEPE));
    assert!(matches!(second, EventOutcome::Duplicate));
    first.finish().await.expect("deployment request");

    let third = harness.pipeline.handle_event(mention("0xdup", DEPLOY_PEPE));
    assert!(matches!(third, EventOutcome::Duplicate));

    assert_eq!(harness.deployer.call_count(), 1);
    assert_eq!(harness.feed.texts().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_deliveries_start_one_deployment() {
    let harness = HarnessBuilder::new().build();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let pipeline = harness.pipeline.clone();
        handles.push(tokio::spawn(async move {
            pipeline.handle_event(mention("0xrace", DEPLOY_PEPE))
        }));
    }

    let mut deploying = 0;
    for handle in handles {
        let outcome = handle.await.expect("dispatch task");
        if matches!(outcome, EventOutcome::Deploying { .. }) {
            deploying += 1;
        }
        outcome.finish().await;
    }

    assert_eq!(deploying, 1);
    assert_eq!(harness.deployer.call_count(), 1);
}

#[tokio::test]
async fn rejected_deploy_reports_reason() {
    let harness = HarnessBuilder::new()
        .deployer(FakeDeployer::new(DeployBehavior::Reject(
            "insufficient funds".into(),
        )))
        .build();

    let request = harness
        .pipeline
        .handle_event(mention("0xfail", DEPLOY_PEPE))
        .finish()
        .await
        .expect("deployment request");

    assert_eq!(request.stage, Stage::Failed);
    assert_eq!(request.error.as_deref(), Some("insufficient funds"));
    assert!(request.result.is_none());

    let texts = harness.feed.texts();
    assert_eq!(texts.len(), 2);
    assert_eq!(
        texts[1],
        "❌ Failed to deploy token: insufficient funds\n\nTry again or check bot status: @bot status"
    );
    assert_eq!(harness.ledger.count().await, 0);
}

#[tokio::test]
async fn confirmation_failure_is_terminal() {
    let harness = HarnessBuilder::new()
        .deployer(FakeDeployer::new(DeployBehavior::ConfirmFail(
            "reverted".into(),
        )))
        .build();

    let request = harness
        .pipeline
        .handle_event(mention("0xrevert", DEPLOY_PEPE))
        .finish()
        .await
        .expect("deployment request");

    assert_eq!(request.stage, Stage::Failed);
    assert_eq!(
        request.trail,
        [Stage::Parsed, Stage::Deploying, Stage::Confirming, Stage::Failed]
    );
    assert!(harness.feed.texts()[1].contains("reverted"));
    assert_eq!(harness.ledger.total_recorded().await, 0);
}

#[tokio::test]
async fn confirmation_deadline_fails_request() {
    let harness = HarnessBuilder::new()
        .deployer(FakeDeployer::new(DeployBehavior::NeverConfirm))
        .confirmation_timeout(Duration::from_millis(50))
        .build();

    let request = harness
        .pipeline
        .handle_event(mention("0xslow", DEPLOY_PEPE))
        .finish()
        .await
        .expect("deployment request");

    assert_eq!(request.stage, Stage::Failed);
    assert!(
        request
            .error
            .as_deref()
            .is_some_and(|error| error.contains("timed out"))
    );
}

#[tokio::test]
async fn reply_failures_do_not_abort_deployment() {
    let harness = HarnessBuilder::new().failing_replies().build();

    let request = harness
        .pipeline
        .handle_event(mention("0xquiet", DEPLOY_PEPE))
        .finish()
        .await
        .expect("deployment request");

    assert_eq!(request.stage, Stage::Succeeded);
    assert_eq!(harness.feed.texts().len(), 2);
    assert_eq!(harness.ledger.count().await, 1);
}

#[tokio::test]
async fn malformed_deploy_gets_usage_hint() {
    let harness = HarnessBuilder::new().build();

    let outcome = harness
        .pipeline
        .handle_event(mention("0xbad", "@bot deploy token name PEPE"));
    assert!(matches!(outcome, EventOutcome::Rejected { .. }));
    outcome.finish().await;

    assert_eq!(harness.deployer.call_count(), 0);
    let texts = harness.feed.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].starts_with("⚠️ Invalid command format."));
}

#[tokio::test]
async fn unrelated_posts_are_ignored_and_not_marked() {
    let harness = HarnessBuilder::new().build();

    let outcome = harness.pipeline.handle_event(mention("0xgm", "gm frens"));
    assert!(matches!(outcome, EventOutcome::Ignored));
    assert!(!harness.seen.contains("0xgm"));
    assert!(harness.feed.texts().is_empty());
}

#[tokio::test]
async fn own_posts_are_ignored() {
    let harness = HarnessBuilder::new().build();

    let event = InboundEvent::new("0xself", "bot", "@bot help");
    assert!(matches!(
        harness.pipeline.handle_event(event),
        EventOutcome::Ignored
    ));
    assert!(harness.feed.texts().is_empty());
}

#[tokio::test]
async fn ledger_keeps_ten_newest_and_counts_all() {
    let harness = HarnessBuilder::new().build();

    for n in 0..11 {
        let text = format!("@bot deploy token name Coin{n} symbol C{n}");
        harness
            .pipeline
            .handle_event(mention(&format!("0xcoin{n}"), &text))
            .finish()
            .await
            .expect("deployment request");
    }

    assert_eq!(harness.ledger.count().await, 10);
    assert_eq!(harness.ledger.total_recorded().await, 11);
    let newest = harness.ledger.list(1).await;
    assert_eq!(newest[0].token_name, "Coin10");

    let ctx = harness.pipeline.query_context(QueryCommand::History).await;
    assert_eq!(ctx.recent.len(), 5);
    assert_eq!(ctx.retained, 10);
    assert_eq!(ctx.total, 11);
}

#[tokio::test]
async fn status_reports_chain_values() {
    let harness = HarnessBuilder::new().build();

    harness
        .pipeline
        .handle_event(mention("0xstatus", "@bot status"))
        .finish()
        .await;

    let text = &harness.feed.texts()[0];
    assert!(text.contains("Balance: 1.5000 ETH"));
    assert!(text.contains("Gas Price: 2.00 gwei"));
    assert!(text.contains("Wallet: 0x1234...5678"));
}

#[tokio::test]
async fn status_degrades_when_chain_is_unreachable() {
    let harness = HarnessBuilder::new().chain_offline().build();

    harness
        .pipeline
        .handle_event(mention("0xstatus", "@bot status"))
        .finish()
        .await;

    let text = &harness.feed.texts()[0];
    assert!(text.contains("Balance: N/A ETH"));
    assert!(text.contains("Gas Price: N/A gwei"));
}

#[tokio::test]
async fn direct_deploy_respects_seen_cast() {
    let harness = HarnessBuilder::new().build();
    assert!(harness.seen.should_process("0xtaken"));

    let command = DeployCommand::new("PEPE", "PEPE").expect("valid command");
    let error = harness
        .pipeline
        .deploy_direct(command.clone(), Some("0xtaken".into()))
        .expect_err("cast already processed");
    assert_eq!(error.0, "0xtaken");

    let task = tokio_test::assert_ok!(harness.pipeline.deploy_direct(command, None));
    let request = task.await.expect("deployment task");
    assert_eq!(request.stage, Stage::Succeeded);
    assert!(request.reply_to.is_none());
    assert!(harness.feed.texts().is_empty());
}
