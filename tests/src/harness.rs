//! # Test Network
//!
//! One provider and any number of consumers wired through the in-memory
//! transport. Every chain shares a single clock; a `step` runs one provider
//! block followed by one block on each consumer.
//!
//! ```text
//! step(secs):
//!   provider: begin_block → relay inbound → end_block → submit outbound
//!   consumer: begin_block → relay inbound → end_block → submit outbound
//! ```

use ccv_consumer::{ConsumerEffect, ConsumerService};
use ccv_provider::{
    ConsumerAddition, InMemoryStaking, ProviderEffect, ProviderService, StakingKeeper,
};
use ccv_transport::{ChainHost, InMemoryTransport, Relayer};
use ccv_types::{
    ChainId, ChannelId, ConsAddress, ConsumerParams, InboundMessage, OutboundMessage, Power,
    ProviderParams, Timestamp,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Once};
use tracing::debug;

static TRACING: Once = Once::new();

/// Install a `fmt` subscriber once per test process. Filter with `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn validator(name: &str) -> ConsAddress {
    ConsAddress::derive(name)
}

pub const PROVIDER_CHAIN: &str = "provi";

/// Digests carried by every consumer addition in the suite.
const GENESIS_HASH: &str = "9a8b7c6d5e4f30211203f4e5d6c7b8a99a8b7c6d5e4f30211203f4e5d6c7b8a9";
const BINARY_HASH: &str = "1c2d3e4f5061728394a5b6c7d8e9f00a1c2d3e4f5061728394a5b6c7d8e9f00a";

pub struct ProviderHost {
    pub service: ProviderService<InMemoryStaking>,
    pub staking: Arc<InMemoryStaking>,
    pub effects: Vec<ProviderEffect>,
}

impl ChainHost for ProviderHost {
    fn chain_id(&self) -> ChainId {
        self.service.chain_id().clone()
    }

    fn now(&self) -> Timestamp {
        self.service.now()
    }

    fn on_inbound(&mut self, msg: InboundMessage) -> Vec<OutboundMessage> {
        let dispatch = self.service.handle(msg);
        self.effects.extend(dispatch.effects);
        dispatch.outbound
    }
}

pub struct ConsumerHost {
    pub service: ConsumerService,
    /// Provider's end of this consumer's channel.
    pub provider_channel: ChannelId,
    pub effects: Vec<ConsumerEffect>,
}

impl ChainHost for ConsumerHost {
    fn chain_id(&self) -> ChainId {
        self.service.chain_id().clone()
    }

    fn now(&self) -> Timestamp {
        self.service.now()
    }

    fn on_inbound(&mut self, msg: InboundMessage) -> Vec<OutboundMessage> {
        let dispatch = self.service.handle(msg);
        self.effects.extend(dispatch.effects);
        dispatch.outbound
    }
}

pub struct Network {
    pub relayer: Relayer<InMemoryTransport>,
    pub provider: ProviderHost,
    pub consumers: BTreeMap<ChainId, ConsumerHost>,
    pub consumer_params: ConsumerParams,
    time: u64,
}

impl Network {
    pub fn new(validators: &[(&str, Power)], params: ProviderParams) -> Self {
        init_tracing();
        let genesis: Vec<(ConsAddress, Power)> = validators
            .iter()
            .map(|(name, power)| (validator(name), *power))
            .collect();
        let staking = Arc::new(InMemoryStaking::with_validators(&genesis));
        let service = ProviderService::new(
            ChainId::from(PROVIDER_CHAIN),
            params,
            staking.clone(),
            Timestamp(0),
        )
        .expect("valid provider params");
        Self {
            relayer: Relayer::new(Arc::new(InMemoryTransport::new())),
            provider: ProviderHost {
                service,
                staking,
                effects: Vec::new(),
            },
            consumers: BTreeMap::new(),
            consumer_params: ConsumerParams::for_testing(),
            time: 0,
        }
    }

    pub fn now(&self) -> Timestamp {
        Timestamp(self.time)
    }

    /// Register, connect and hand the current validator set to a new consumer.
    pub fn add_consumer(&mut self, name: &str) -> ChainId {
        let chain_id = ChainId::from(name);
        let provider_id = ChainId::from(PROVIDER_CHAIN);
        let dispatch = self
            .provider
            .service
            .add_consumer(ConsumerAddition::new(
                name,
                self.now(),
                GENESIS_HASH,
                BINARY_HASH,
            ))
            .expect("new consumer");
        self.provider.effects.extend(dispatch.effects);

        let (provider_channel, consumer_channel) = self
            .relayer
            .transport()
            .open_channel(&provider_id, &chain_id)
            .expect("channel opens");
        let dispatch = self
            .provider
            .service
            .establish_channel(&chain_id, provider_channel.clone())
            .expect("channel binds");
        self.provider.effects.extend(dispatch.effects);
        self.relayer.submit(&provider_id, dispatch.outbound);

        let genesis: Vec<(ConsAddress, Power)> = self
            .provider
            .staking
            .bonded_validators()
            .into_iter()
            .map(|v| (v.address, v.power))
            .collect();
        let mut service = ConsumerService::new(
            chain_id.clone(),
            self.consumer_params.clone(),
            &genesis,
            self.now(),
        )
        .expect("valid consumer params");
        let dispatch = service.connect(consumer_channel).expect("fresh consumer");
        self.consumers.insert(
            chain_id.clone(),
            ConsumerHost {
                service,
                provider_channel,
                effects: dispatch.effects,
            },
        );
        chain_id
    }

    pub fn advance(&mut self, secs: u64) {
        self.time += secs;
    }

    pub fn provider_block(&mut self) {
        let now = self.now();
        let dispatch = self.provider.service.begin_block(now);
        self.provider.effects.extend(dispatch.effects);
        self.relayer.relay_to(&mut self.provider);
        let dispatch = self.provider.service.end_block();
        self.provider.effects.extend(dispatch.effects);
        self.relayer
            .submit(&ChainId::from(PROVIDER_CHAIN), dispatch.outbound);
    }

    pub fn consumer_block(&mut self, chain_id: &ChainId) {
        let now = self.now();
        let Some(host) = self.consumers.get_mut(chain_id) else {
            return;
        };
        let dispatch = host.service.begin_block(now);
        host.effects.extend(dispatch.effects);
        self.relayer.relay_to(host);
        let dispatch = host.service.end_block();
        host.effects.extend(dispatch.effects);
        self.relayer.submit(chain_id, dispatch.outbound);
    }

    pub fn consumer_blocks(&mut self) {
        let ids: Vec<ChainId> = self.consumers.keys().cloned().collect();
        for chain_id in ids {
            self.consumer_block(&chain_id);
        }
    }

    /// Advance the clock, then run one block on every chain.
    pub fn step(&mut self, secs: u64) {
        self.advance(secs);
        debug!("[ccv-tests] Step to t={}", self.time);
        self.provider_block();
        self.consumer_blocks();
    }

    pub fn consumer(&mut self, chain_id: &ChainId) -> &mut ConsumerService {
        &mut self
            .consumers
            .get_mut(chain_id)
            .expect("known consumer")
            .service
    }

    pub fn provider_power(&self, name: &str) -> Power {
        self.provider.staking.power(&validator(name))
    }

    pub fn consumer_power(&self, chain_id: &ChainId, name: &str) -> Power {
        self.consumers
            .get(chain_id)
            .map(|host| host.service.power(&validator(name)))
            .unwrap_or(0)
    }

    pub fn tokens(&self, name: &str) -> i64 {
        self.provider.staking.tokens(&validator(name)).unwrap_or(0)
    }

    /// Validators jailed on the provider, in order.
    pub fn jailings(&self) -> Vec<ConsAddress> {
        self.provider
            .effects
            .iter()
            .filter_map(|effect| match effect {
                ProviderEffect::ValidatorJailed { address, .. } => Some(*address),
                _ => None,
            })
            .collect()
    }

    pub fn consumer_effects(&self, chain_id: &ChainId) -> &[ConsumerEffect] {
        self.consumers
            .get(chain_id)
            .map(|host| host.effects.as_slice())
            .unwrap_or(&[])
    }
}
