//! In-memory collaborators for driving the pipeline end to end.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use warpdeploy::chain::ChainReader;
use warpdeploy::config::LinksConfig;
use warpdeploy::dedup::SeenEvents;
use warpdeploy::deploy::{
    Confirmation, ConfirmedDeployment, DeployParams, PendingDeployment, TokenDeployer,
};
use warpdeploy::error::{ChainError, DeployError, FeedError, StorageError};
use warpdeploy::feed::{BotIdentity, Cast, FeedClient};
use warpdeploy::ledger::DeploymentLedger;
use warpdeploy::orchestrator::{Orchestrator, OrchestratorSettings};
use warpdeploy::pipeline::{Pipeline, PipelineSettings};
use warpdeploy::storage::{FetchedImage, ImageFetcher, PinStore, StorageUploader};

pub const WALLET: &str = "0x1234567890abcdef1234567890abcdef12345678";

/// Records every reply; optionally fails every send.
#[derive(Default)]
pub struct RecordingFeed {
    pub replies: Mutex<Vec<(String, String)>>,
    pub fail_sends: bool,
}

impl RecordingFeed {
    pub fn texts(&self) -> Vec<String> {
        self.replies.lock().iter().map(|(_, text)| text.clone()).collect()
    }
}

#[async_trait]
impl FeedClient for RecordingFeed {
    async fn publish_reply(&self, in_reply_to: &str, text: &str) -> Result<(), FeedError> {
        self.replies
            .lock()
            .push((in_reply_to.to_string(), text.to_string()));
        if self.fail_sends {
            return Err(FeedError::Api {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(())
    }

    async fn lookup_identity(&self) -> Result<BotIdentity, FeedError> {
        Ok(BotIdentity {
            fid: 1,
            username: "bot".into(),
        })
    }

    async fn fetch_mentions(&self, _: &BotIdentity, _: u32) -> Result<Vec<Cast>, FeedError> {
        Ok(Vec::new())
    }
}

pub struct StaticFetcher;

#[async_trait]
impl ImageFetcher for StaticFetcher {
    async fn fetch(&self, _url: &str) -> Result<FetchedImage, StorageError> {
        Ok(FetchedImage {
            bytes: vec![1, 2, 3],
            content_type: "image/png".into(),
        })
    }
}

/// Pins succeed with a fixed hash unless `fail` is set.
#[derive(Default)]
pub struct FakePins {
    pub fail: bool,
    pub calls: Mutex<usize>,
}

#[async_trait]
impl PinStore for FakePins {
    async fn pin(&self, _bytes: Vec<u8>, _content_type: &str) -> Result<String, StorageError> {
        *self.calls.lock() += 1;
        if self.fail {
            return Err(StorageError::Pin("quota exceeded".into()));
        }
        Ok("QmLogo".into())
    }
}

#[derive(Clone)]
pub enum DeployBehavior {
    Succeed { tx_hash: String, token_address: String },
    Reject(String),
    ConfirmFail(String),
    NeverConfirm,
}

pub struct FakeDeployer {
    pub behavior: DeployBehavior,
    pub calls: Mutex<Vec<DeployParams>>,
}

impl FakeDeployer {
    pub fn new(behavior: DeployBehavior) -> Self {
        Self {
            behavior,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn succeeding(tx_hash: &str, token_address: &str) -> Self {
        Self::new(DeployBehavior::Succeed {
            tx_hash: tx_hash.into(),
            token_address: token_address.into(),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

struct FakeConfirmation(Option<Result<ConfirmedDeployment, String>>);

#[async_trait]
impl Confirmation for FakeConfirmation {
    async fn wait(self: Box<Self>) -> Result<ConfirmedDeployment, DeployError> {
        match self.0 {
            Some(outcome) => outcome.map_err(DeployError::Confirmation),
            None => futures::future::pending().await,
        }
    }
}

#[async_trait]
impl TokenDeployer for FakeDeployer {
    async fn deploy(&self, params: DeployParams) -> Result<PendingDeployment, DeployError> {
        self.calls.lock().push(params);
        let (tx_hash, outcome) = match &self.behavior {
            DeployBehavior::Reject(reason) => return Err(DeployError::Rejected(reason.clone())),
            DeployBehavior::Succeed {
                tx_hash,
                token_address,
            } => (
                tx_hash.clone(),
                Some(Ok(ConfirmedDeployment {
                    token_address: token_address.clone(),
                })),
            ),
            DeployBehavior::ConfirmFail(reason) => ("0xdead".to_string(), Some(Err(reason.clone()))),
            DeployBehavior::NeverConfirm => ("0xslow".to_string(), None),
        };
        Ok(PendingDeployment {
            tx_hash,
            confirmation: Box::new(FakeConfirmation(outcome)),
        })
    }
}

/// Chain reader with fixed values, or failing reads.
pub struct FakeChain {
    pub available: bool,
}

#[async_trait]
impl ChainReader for FakeChain {
    async fn balance(&self, _address: &str) -> Result<u128, ChainError> {
        if self.available {
            Ok(1_500_000_000_000_000_000)
        } else {
            Err(ChainError::InvalidQuantity("offline".into()))
        }
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        if self.available {
            Ok(2_000_000_000)
        } else {
            Err(ChainError::InvalidQuantity("offline".into()))
        }
    }
}

pub struct Harness {
    pub pipeline: Pipeline,
    pub feed: Arc<RecordingFeed>,
    pub pins: Arc<FakePins>,
    pub deployer: Arc<FakeDeployer>,
    pub ledger: DeploymentLedger,
    pub seen: SeenEvents,
}

pub struct HarnessBuilder {
    feed: RecordingFeed,
    pins: FakePins,
    deployer: FakeDeployer,
    chain_available: bool,
    confirmation_timeout: Option<Duration>,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            feed: RecordingFeed::default(),
            pins: FakePins::default(),
            deployer: FakeDeployer::succeeding("0x123", "0xABC"),
            chain_available: true,
            confirmation_timeout: None,
        }
    }

    pub fn failing_pins(mut self) -> Self {
        self.pins.fail = true;
        self
    }

    pub fn failing_replies(mut self) -> Self {
        self.feed.fail_sends = true;
        self
    }

    pub fn deployer(mut self, deployer: FakeDeployer) -> Self {
        self.deployer = deployer;
        self
    }

    pub fn chain_offline(mut self) -> Self {
        self.chain_available = false;
        self
    }

    pub fn confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Harness {
        let feed = Arc::new(self.feed);
        let pins = Arc::new(self.pins);
        let deployer = Arc::new(self.deployer);
        let ledger = DeploymentLedger::new();
        let seen = SeenEvents::new(1_000, Duration::from_secs(3600));

        let orchestrator = Orchestrator::new(
            deployer.clone(),
            StorageUploader::new(Arc::new(StaticFetcher), pins.clone()),
            feed.clone(),
            ledger.clone(),
            OrchestratorSettings {
                token_admin: WALLET.into(),
                handle: "bot".into(),
                network: "Base".into(),
                links: LinksConfig::default(),
                confirmation_timeout: self.confirmation_timeout,
            },
        );
        let pipeline = Pipeline::new(
            orchestrator,
            seen.clone(),
            feed.clone(),
            Arc::new(FakeChain {
                available: self.chain_available,
            }),
            PipelineSettings {
                handle: "@bot".into(),
                wallet: WALLET.into(),
                network: "Base".into(),
                image_host_markers: vec!["imagedelivery.net".into()],
                links: LinksConfig::default(),
            },
        );

        Harness {
            pipeline,
            feed,
            pins,
            deployer,
            ledger,
            seen,
        }
    }
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self::new()
    }
}
