//! # Provider Service
//!
//! The provider's CCV state machine. The host chain drives it once per block:
//!
//! ```text
//! begin_block(now)         replenish / clamp slash meter
//! handle(msg)*             packets, acks, timeouts, channel closes
//! end_block()              drain throttle queue → build & send VSCs
//!                          → release matured unbondings → VSC timeouts
//! ```
//!
//! Every step returns a `Dispatch` with the outbound messages for the
//! transport and the effects for the host. Slash acks are deferred until the
//! packet leaves the throttle queue.

use crate::domain::consumer::{ConsumerAddition, ConsumerChain, ConsumerRegistry};
use crate::domain::maturity::{AckOutcome, MaturityTracker};
use crate::domain::receipts::ReceiptLog;
use crate::domain::slash_log::{Equivocation, SlashLog};
use crate::domain::slash_meter::{slash_meter_allowance, SlashMeter};
use crate::domain::throttle_queue::{QueuedSlash, ThrottleQueue};
use crate::domain::unbonding::UnbondingTracker;
use crate::error::{ProviderError, ProviderResult};
use crate::events::{ProviderEffect, RemovalReason};
use crate::executor::{SlashExecution, SlashExecutor};
use crate::ports::outbound::StakingKeeper;
use ccv_types::{
    Acknowledgement, ChainId, ChannelId, ConsAddress, Dispatch, InboundMessage, InfractionKind,
    PacketData, Power, ProviderParams, Sequence, SlashPacket, Timestamp, VscId, VscMaturedPacket,
    VscPacket,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// First VSC id handed out by a fresh provider.
pub const INITIAL_VSC_ID: VscId = 1;

/// Matured VSCs older than this many ids are forgotten; `maturity_time`
/// answers `None` for them.
pub const MATURED_VSC_HISTORY: VscId = 100;

type ProviderDispatch = Dispatch<ProviderEffect>;

/// Provider-side CCV state machine.
pub struct ProviderService<S: StakingKeeper + ?Sized> {
    chain_id: ChainId,
    params: ProviderParams,
    staking: Arc<S>,
    executor: SlashExecutor<S>,
    now: Timestamp,
    height: u64,
    next_vsc_id: VscId,
    consumers: ConsumerRegistry,
    maturity: MaturityTracker,
    unbonding: UnbondingTracker,
    meter: SlashMeter,
    queue: ThrottleQueue,
    slash_log: SlashLog,
    receipts: ReceiptLog,
}

impl<S: StakingKeeper + ?Sized> ProviderService<S> {
    /// Create a provider at genesis. The slash meter starts full.
    pub fn new(
        chain_id: ChainId,
        params: ProviderParams,
        staking: Arc<S>,
        genesis_time: Timestamp,
    ) -> ProviderResult<Self> {
        params.validate()?;
        let allowance =
            slash_meter_allowance(params.slash_meter_replenish_fraction, staking.total_power());
        let meter = SlashMeter::new(allowance, genesis_time, params.slash_meter_replenish_period);
        info!(
            "[ccv-provider] Provider {} initialized, slash meter {}",
            chain_id, allowance
        );
        Ok(Self {
            chain_id,
            executor: SlashExecutor::new(staking.clone()),
            staking,
            params,
            now: genesis_time,
            height: 0,
            next_vsc_id: INITIAL_VSC_ID,
            consumers: ConsumerRegistry::new(),
            maturity: MaturityTracker::new(),
            unbonding: UnbondingTracker::new(),
            meter,
            queue: ThrottleQueue::new(),
            slash_log: SlashLog::new(),
            receipts: ReceiptLog::new(),
        })
    }

    /// Replace parameters. Invalid sets are rejected and leave state untouched.
    pub fn set_params(&mut self, params: ProviderParams) -> ProviderResult<()> {
        params.validate()?;
        self.params = params;
        let allowance = self.slash_meter_allowance();
        self.meter.clamp(allowance);
        Ok(())
    }

    // =========================================================================
    // CONSUMER LIFECYCLE
    // =========================================================================

    pub fn add_consumer(&mut self, addition: ConsumerAddition) -> ProviderResult<ProviderDispatch> {
        let chain_id = addition.chain_id.clone();
        self.consumers.add(addition, self.now)?;
        info!("[ccv-provider] Consumer {} added, awaiting channel", chain_id);
        let mut out = Dispatch::new();
        out.effect(ProviderEffect::ConsumerAdded { chain_id });
        Ok(out)
    }

    /// Bind the CCV channel and send every VSC queued while pending.
    pub fn establish_channel(
        &mut self,
        chain_id: &ChainId,
        channel: ChannelId,
    ) -> ProviderResult<ProviderDispatch> {
        let pending = self.consumers.establish(chain_id, channel.clone())?;
        let mut out = Dispatch::new();
        let flushed = pending.len();
        let timeout = self.now + self.params.ccv_timeout_period;
        for packet in pending {
            let vsc_id = packet.vsc_id;
            let updates = packet.updates.len();
            let data = PacketData::Vsc(packet).encode()?;
            out.send(channel.clone(), data, timeout);
            self.maturity.mark_sent(vsc_id, chain_id, self.now);
            if let Some(consumer) = self.consumers.get_mut(chain_id) {
                consumer.highest_sent_vsc = consumer.highest_sent_vsc.max(vsc_id);
            }
            out.effect(ProviderEffect::VscSent {
                chain_id: chain_id.clone(),
                vsc_id,
                updates,
            });
        }
        info!(
            "[ccv-provider] Consumer {} established on {} ({} pending VSCs flushed)",
            chain_id, channel, flushed
        );
        out.effect(ProviderEffect::ConsumerEstablished {
            chain_id: chain_id.clone(),
            channel,
            flushed,
        });
        Ok(out)
    }

    /// Stop proposal: close the channel and drop every obligation.
    pub fn remove_consumer(&mut self, chain_id: &ChainId) -> ProviderResult<ProviderDispatch> {
        if !self.consumers.contains(chain_id) {
            return Err(ProviderError::UnknownConsumer {
                chain_id: chain_id.clone(),
            });
        }
        Ok(self.stop_consumer(chain_id, RemovalReason::Stopped))
    }

    fn stop_consumer(&mut self, chain_id: &ChainId, reason: RemovalReason) -> ProviderDispatch {
        let mut out = Dispatch::new();
        let Some(consumer) = self.consumers.remove(chain_id) else {
            return out;
        };
        if reason != RemovalReason::ChannelClosed {
            if let Some(channel) = consumer.channel() {
                out.close(channel.clone());
            }
        }
        let dropped = self.queue.remove_consumer(chain_id);
        for vsc_id in self.maturity.remove_consumer(chain_id, self.now) {
            out.effect(ProviderEffect::VscMatured { vsc_id });
        }
        self.receipts.remove_consumer(chain_id);
        warn!(
            "[ccv-provider] Consumer {} removed ({:?}); {} queued slash packets dropped",
            chain_id,
            reason,
            dropped.len()
        );
        out.effect(ProviderEffect::ConsumerRemoved {
            chain_id: chain_id.clone(),
            reason,
        });
        out
    }

    // =========================================================================
    // BLOCK LIFECYCLE
    // =========================================================================

    pub fn begin_block(&mut self, now: Timestamp) -> ProviderDispatch {
        self.now = now;
        self.height += 1;
        let mut out = Dispatch::new();
        let allowance = self.slash_meter_allowance();
        if self
            .meter
            .replenish_if_due(now, self.params.slash_meter_replenish_period, allowance)
        {
            debug!(
                "[ccv-provider] Slash meter replenished to {} (allowance {})",
                self.meter.value(),
                allowance
            );
            out.effect(ProviderEffect::SlashMeterReplenished {
                value: self.meter.value(),
            });
        }
        self.meter.clamp(allowance);
        out
    }

    /// Inbound dispatcher.
    pub fn handle(&mut self, msg: InboundMessage) -> ProviderDispatch {
        match msg {
            InboundMessage::Recv {
                channel,
                sequence,
                data,
            } => self.on_recv(channel, sequence, &data),
            InboundMessage::Acknowledgement { channel, ack, .. } => {
                if let Acknowledgement::Error(reason) = ack {
                    if let Some(chain_id) = self.consumers.chain_for_channel(&channel).cloned() {
                        warn!(
                            "[ccv-provider] Consumer {} returned error ack: {}",
                            chain_id, reason
                        );
                        return self.stop_consumer(&chain_id, RemovalReason::ErrorAck);
                    }
                }
                Dispatch::new()
            }
            InboundMessage::Timeout { channel, .. } => {
                match self.consumers.chain_for_channel(&channel).cloned() {
                    Some(chain_id) => self.stop_consumer(&chain_id, RemovalReason::PacketTimeout),
                    None => Dispatch::new(),
                }
            }
            InboundMessage::ChannelClosed { channel } => {
                match self.consumers.chain_for_channel(&channel).cloned() {
                    Some(chain_id) => self.stop_consumer(&chain_id, RemovalReason::ChannelClosed),
                    None => Dispatch::new(),
                }
            }
        }
    }

    fn on_recv(&mut self, channel: ChannelId, sequence: Sequence, data: &[u8]) -> ProviderDispatch {
        let mut out = Dispatch::new();
        let Some(chain_id) = self.consumers.chain_for_channel(&channel).cloned() else {
            let reason = format!("no consumer on channel {channel}");
            warn!("[ccv-provider] Rejected packet: {}", reason);
            out.ack(channel, sequence, Acknowledgement::error(reason.clone()));
            out.effect(ProviderEffect::SlashPacketRejected {
                chain_id: None,
                reason,
            });
            return out;
        };
        if !self.receipts.insert(&chain_id, sequence) {
            debug!(
                "[ccv-provider] Duplicate packet {} from {} ignored",
                sequence, chain_id
            );
            out.effect(ProviderEffect::DuplicatePacket { chain_id, sequence });
            return out;
        }

        match PacketData::decode(data) {
            Ok(PacketData::VscMatured(packet)) => {
                self.on_vsc_matured(chain_id, channel, sequence, packet, &mut out)
            }
            Ok(PacketData::Slash(packet)) => {
                self.on_slash_packet(chain_id, channel, sequence, packet, &mut out)
            }
            Ok(other) => {
                let reason = format!("unexpected {} packet on provider", other.kind());
                self.reject(Some(chain_id), channel, sequence, reason, &mut out);
            }
            Err(e) => self.reject(Some(chain_id), channel, sequence, e.to_string(), &mut out),
        }
        out
    }

    fn reject(
        &self,
        chain_id: Option<ChainId>,
        channel: ChannelId,
        sequence: Sequence,
        reason: String,
        out: &mut ProviderDispatch,
    ) {
        warn!(
            "[ccv-provider] Rejected packet {} on {}: {}",
            sequence, channel, reason
        );
        out.ack(channel, sequence, Acknowledgement::error(reason.clone()));
        out.effect(ProviderEffect::SlashPacketRejected { chain_id, reason });
    }

    fn on_vsc_matured(
        &mut self,
        chain_id: ChainId,
        channel: ChannelId,
        sequence: Sequence,
        packet: VscMaturedPacket,
        out: &mut ProviderDispatch,
    ) {
        out.ack(channel, sequence, Acknowledgement::received());
        if self.queue.hold_maturity(&chain_id, packet.vsc_id) {
            debug!(
                "[ccv-provider] Maturity of VSC {} from {} held behind queued slash packets",
                packet.vsc_id, chain_id
            );
            out.effect(ProviderEffect::MaturityHeld {
                chain_id,
                vsc_id: packet.vsc_id,
            });
            return;
        }
        self.apply_maturity(&chain_id, packet.vsc_id, out);
    }

    fn apply_maturity(&mut self, chain_id: &ChainId, vsc_id: VscId, out: &mut ProviderDispatch) {
        match self.maturity.record_ack(vsc_id, chain_id, self.now) {
            AckOutcome::Recorded => out.effect(ProviderEffect::VscMaturityAcked {
                chain_id: chain_id.clone(),
                vsc_id,
            }),
            AckOutcome::Matured => {
                info!("[ccv-provider] VSC {} matured on all consumers", vsc_id);
                out.effect(ProviderEffect::VscMaturityAcked {
                    chain_id: chain_id.clone(),
                    vsc_id,
                });
                out.effect(ProviderEffect::VscMatured { vsc_id });
            }
            AckOutcome::UnknownVsc | AckOutcome::Ignored => debug!(
                "[ccv-provider] Ignored maturity ack for VSC {} from {}",
                vsc_id, chain_id
            ),
        }
    }

    fn on_slash_packet(
        &mut self,
        chain_id: ChainId,
        channel: ChannelId,
        sequence: Sequence,
        mut packet: SlashPacket,
        out: &mut ProviderDispatch,
    ) {
        let highest_sent = self
            .consumers
            .get(&chain_id)
            .map(|c| c.highest_sent_vsc)
            .unwrap_or(0);
        if packet.vsc_id > highest_sent {
            let reason = format!(
                "slash packet references VSC {} but highest sent to {} is {}",
                packet.vsc_id, chain_id, highest_sent
            );
            self.reject(Some(chain_id), channel, sequence, reason, out);
            return;
        }
        if self.staking.validator(&packet.address).is_none() {
            let reason = format!("slash packet for unknown validator {}", packet.address);
            self.reject(Some(chain_id), channel, sequence, reason, out);
            return;
        }

        packet.chain_id = Some(chain_id.clone());
        info!(
            "[ccv-provider] Queued {} slash packet for {} from {} (queue size {})",
            packet.infraction,
            packet.address,
            chain_id,
            self.queue.len() + 1
        );
        out.effect(ProviderEffect::SlashPacketQueued {
            chain_id: chain_id.clone(),
            address: packet.address,
            infraction: packet.infraction,
        });
        self.queue.enqueue(QueuedSlash {
            chain_id,
            channel,
            sequence,
            packet,
            held_maturities: Vec::new(),
        });
    }

    pub fn end_block(&mut self) -> ProviderDispatch {
        let mut out = Dispatch::new();
        self.drain_throttle_queue(&mut out);
        self.send_validator_set_changes(&mut out);
        self.release_matured_unbondings(&mut out);
        self.prune_maturity_history();
        self.check_vsc_timeouts(&mut out);
        out
    }

    /// Dequeue slash packets round-robin while the meter is non-negative.
    fn drain_throttle_queue(&mut self, out: &mut ProviderDispatch) {
        while !self.queue.is_empty() && self.meter.has_allowance() {
            let Some(item) = self.queue.pop_next() else {
                break;
            };
            let result = self.executor.execute_consumer_slash(
                &item.packet,
                &item.chain_id,
                &self.params,
                &mut self.slash_log,
                self.now,
            );
            match result {
                Ok(execution) => {
                    self.meter.consume(execution.jailed_power());
                    if item.packet.infraction == InfractionKind::Downtime {
                        if let Some(consumer) = self.consumers.get_mut(&item.chain_id) {
                            consumer.slash_acks.push(item.packet.address);
                        }
                    }
                    out.ack(
                        item.channel.clone(),
                        item.sequence,
                        Acknowledgement::slash_handled(execution.jailed()),
                    );
                    out.effects.extend(execution.effects);
                }
                Err(e) => {
                    warn!(
                        "[ccv-provider] Slash packet from {} failed: {}",
                        item.chain_id, e
                    );
                    out.ack(
                        item.channel.clone(),
                        item.sequence,
                        Acknowledgement::error(e.to_string()),
                    );
                }
            }
            for vsc_id in item.held_maturities {
                self.apply_maturity(&item.chain_id, vsc_id, out);
            }
        }
        if !self.queue.is_empty() {
            debug!(
                "[ccv-provider] Throttled: {} slash packets waiting, meter {}",
                self.queue.len(),
                self.meter.value()
            );
        }
    }

    /// Build this block's VSC for every consumer that needs one.
    fn send_validator_set_changes(&mut self, out: &mut ProviderDispatch) {
        let vsc_id = self.next_vsc_id;
        let updates = self.staking.take_validator_updates();
        let has_ops = self.unbonding.has_ops_for(vsc_id);
        let timeout = self.now + self.params.ccv_timeout_period;
        let mut required = BTreeSet::new();
        let mut sent = Vec::new();

        for (chain_id, consumer) in self.consumers.iter_mut() {
            if updates.is_empty() && !has_ops && consumer.slash_acks.is_empty() {
                continue;
            }
            let packet = VscPacket {
                vsc_id,
                updates: updates.clone(),
                timestamp: self.now,
                slash_acks: std::mem::take(&mut consumer.slash_acks),
            };
            required.insert(chain_id.clone());
            if queue_or_send(chain_id, consumer, packet, timeout, out) {
                sent.push(chain_id.clone());
            }
        }

        if !required.is_empty() || has_ops {
            self.maturity.open(vsc_id, required, self.now);
            for chain_id in &sent {
                self.maturity.mark_sent(vsc_id, chain_id, self.now);
            }
        }
        if !updates.is_empty() {
            info!(
                "[ccv-provider] VSC {} carries {} validator updates",
                vsc_id,
                updates.len()
            );
        }
        self.next_vsc_id += 1;
    }

    fn release_matured_unbondings(&mut self, out: &mut ProviderDispatch) {
        let maturity = &self.maturity;
        let now = self.now;
        let released = self.unbonding.take_released(|vsc_id| maturity.is_matured(vsc_id, now));
        for op_id in released {
            match self.staking.unbonding_can_complete(op_id) {
                Ok(()) => {
                    debug!("[ccv-provider] Unbonding op {} released", op_id);
                    out.effect(ProviderEffect::UnbondingReleased { op_id });
                }
                Err(e) => warn!("[ccv-provider] Unbonding op {} not released: {}", op_id, e),
            }
        }
    }

    /// Runs after unbonding release, so a pruned record has no ops left.
    fn prune_maturity_history(&mut self) {
        let cutoff = self.next_vsc_id.saturating_sub(MATURED_VSC_HISTORY);
        let pruned = self.maturity.prune_matured_before(cutoff);
        if pruned > 0 {
            debug!(
                "[ccv-provider] Pruned {} matured VSC records below {}",
                pruned, cutoff
            );
        }
    }

    fn check_vsc_timeouts(&mut self, out: &mut ProviderDispatch) {
        let timed_out: Vec<ChainId> = self
            .consumers
            .chain_ids()
            .into_iter()
            .filter(|chain_id| {
                self.maturity
                    .oldest_outstanding(chain_id)
                    .is_some_and(|(_, sent_at)| {
                        self.now >= sent_at + self.params.vsc_timeout_period
                    })
            })
            .collect();
        for chain_id in timed_out {
            let dispatch = self.stop_consumer(&chain_id, RemovalReason::VscTimeout);
            out.merge(dispatch);
        }
    }

    // =========================================================================
    // PROVIDER-LOCAL INFRACTIONS
    // =========================================================================

    /// Downtime detected by the provider's own slashing module.
    pub fn handle_local_downtime(
        &mut self,
        address: &ConsAddress,
    ) -> ProviderResult<SlashExecution> {
        self.executor
            .execute_local_downtime(address, &self.params, self.now)
    }

    /// Double-sign evidence verified by the provider.
    pub fn handle_local_equivocation(
        &mut self,
        evidence: &Equivocation,
    ) -> ProviderResult<SlashExecution> {
        self.executor
            .execute_equivocation(evidence, &self.params, &mut self.slash_log, self.now)
    }

    /// Governance proposal carrying consumer equivocation evidence. Every
    /// validator must have been reported by a consumer first.
    pub fn handle_equivocation_proposal(
        &mut self,
        evidences: &[Equivocation],
    ) -> ProviderResult<Vec<ProviderEffect>> {
        if evidences.is_empty() {
            return Err(ProviderError::EmptyProposal);
        }
        if let Some(missing) = evidences
            .iter()
            .find(|ev| !self.slash_log.has_report(&ev.address))
        {
            return Err(ProviderError::NoSlashLog {
                address: missing.address,
            });
        }
        let mut effects = Vec::new();
        for evidence in evidences {
            let execution = self.handle_local_equivocation(evidence)?;
            effects.extend(execution.effects);
        }
        Ok(effects)
    }

    /// Staking hook: bind a new unbonding op to the VSC being built.
    pub fn on_unbonding_initiated(&mut self, op_id: u64) {
        debug!(
            "[ccv-provider] Unbonding op {} bound to VSC {}",
            op_id, self.next_vsc_id
        );
        self.unbonding.bind(op_id, self.next_vsc_id);
    }

    pub fn unjail(&self, address: &ConsAddress) -> ProviderResult<()> {
        self.staking.unjail(address, self.now)?;
        Ok(())
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn chain_id(&self) -> &ChainId {
        &self.chain_id
    }

    pub fn params(&self) -> &ProviderParams {
        &self.params
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    /// Id the next VSC will carry.
    pub fn next_vsc_id(&self) -> VscId {
        self.next_vsc_id
    }

    pub fn slash_meter(&self) -> Power {
        self.meter.value()
    }

    pub fn slash_meter_replenish_candidate(&self) -> Timestamp {
        self.meter.replenish_candidate()
    }

    pub fn slash_meter_allowance(&self) -> Power {
        slash_meter_allowance(
            self.params.slash_meter_replenish_fraction,
            self.staking.total_power(),
        )
    }

    pub fn global_queue_size(&self) -> usize {
        self.queue.len()
    }

    pub fn consumer_queue_size(&self, chain_id: &ChainId) -> usize {
        self.queue.consumer_len(chain_id)
    }

    pub fn all_consumers_acked(&self, vsc_id: VscId) -> bool {
        self.maturity.all_consumers_acked(vsc_id)
    }

    pub fn maturity_time(&self, vsc_id: VscId) -> Option<Timestamp> {
        self.maturity.maturity_time(vsc_id)
    }

    /// VSC records still held, matured or not.
    pub fn maturity_records(&self) -> usize {
        self.maturity.len()
    }

    pub fn retained_receipts(&self) -> usize {
        self.receipts.retained()
    }

    pub fn consumer(&self, chain_id: &ChainId) -> Option<&ConsumerChain> {
        self.consumers.get(chain_id)
    }

    pub fn consumer_chain_ids(&self) -> Vec<ChainId> {
        self.consumers.chain_ids()
    }

    pub fn slash_log(&self) -> &SlashLog {
        &self.slash_log
    }

    pub fn staking(&self) -> &Arc<S> {
        &self.staking
    }
}

fn queue_or_send(
    chain_id: &ChainId,
    consumer: &mut ConsumerChain,
    packet: VscPacket,
    timeout: Timestamp,
    out: &mut ProviderDispatch,
) -> bool {
    let vsc_id = packet.vsc_id;
    let Some(channel) = consumer.channel().cloned() else {
        consumer.pending_packets.push(packet);
        out.effect(ProviderEffect::VscQueued {
            chain_id: chain_id.clone(),
            vsc_id,
        });
        return false;
    };
    let updates = packet.updates.len();
    match PacketData::Vsc(packet).encode() {
        Ok(data) => {
            out.send(channel, data, timeout);
            consumer.highest_sent_vsc = consumer.highest_sent_vsc.max(vsc_id);
            out.effect(ProviderEffect::VscSent {
                chain_id: chain_id.clone(),
                vsc_id,
                updates,
            });
            true
        }
        Err(e) => {
            warn!(
                "[ccv-provider] Cannot encode VSC {} for {}: {}",
                vsc_id, chain_id, e
            );
            false
        }
    }
}
