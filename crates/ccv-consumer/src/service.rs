//! # Consumer Service
//!
//! The consumer's CCV state machine.
//!
//! ```text
//! begin_block(now)          map height → latest VSC id
//! handle(msg)*              VSC packets, slash acks, timeouts
//! report_downtime / report_double_sign / record_signatures
//! end_block()               queue matured VSCs → flush pending packets
//! ```
//!
//! Packets are never sent straight away: slash and maturity packets go to a
//! pending queue that is flushed at end block while the provider channel is
//! up, so nothing is lost while it is down.

use crate::domain::{HeightToVscMap, LivenessTracker, MaturitySchedule, PowerTable};
use crate::error::{ConsumerError, ConsumerResult};
use crate::events::{ConsumerEffect, DowntimeSkip};
use ccv_types::{
    is_soft_opted_out, AckResult, Acknowledgement, ChainId, ChannelId, ConsAddress,
    ConsumerParams, Dispatch, InboundMessage, InfractionKind, PacketData, Power, Sequence,
    SlashPacket, Timestamp, VscId, VscMaturedPacket, VscPacket,
};
use std::collections::{BTreeSet, VecDeque};
use tracing::{debug, info, warn};

type ConsumerDispatch = Dispatch<ConsumerEffect>;

/// Consumer-side CCV state machine.
pub struct ConsumerService {
    chain_id: ChainId,
    params: ConsumerParams,
    provider_channel: Option<ChannelId>,
    now: Timestamp,
    height: u64,
    highest_vsc_id: VscId,
    power_table: PowerTable,
    maturity: MaturitySchedule,
    height_map: HeightToVscMap,
    liveness: LivenessTracker,
    pending: VecDeque<PacketData>,
    /// Insert position for packets re-queued after a timeout this block.
    requeue_cursor: usize,
    outstanding_downtime: BTreeSet<ConsAddress>,
}

impl ConsumerService {
    pub fn new(
        chain_id: ChainId,
        params: ConsumerParams,
        genesis_validators: &[(ConsAddress, Power)],
        genesis_time: Timestamp,
    ) -> ConsumerResult<Self> {
        params.validate()?;
        let power_table = PowerTable::from_genesis(genesis_validators);
        info!(
            "[ccv-consumer] Consumer {} initialized with {} validators (total power {})",
            chain_id,
            power_table.len(),
            power_table.total()
        );
        Ok(Self {
            chain_id,
            liveness: LivenessTracker::new(
                params.signed_blocks_window,
                params.min_signed_per_window,
            ),
            params,
            provider_channel: None,
            now: genesis_time,
            height: 0,
            highest_vsc_id: 0,
            power_table,
            maturity: MaturitySchedule::new(),
            height_map: HeightToVscMap::new(),
            pending: VecDeque::new(),
            requeue_cursor: 0,
            outstanding_downtime: BTreeSet::new(),
        })
    }

    pub fn set_params(&mut self, params: ConsumerParams) -> ConsumerResult<()> {
        params.validate()?;
        if params.signed_blocks_window != self.params.signed_blocks_window
            || params.min_signed_per_window != self.params.min_signed_per_window
        {
            self.liveness =
                LivenessTracker::new(params.signed_blocks_window, params.min_signed_per_window);
        }
        self.params = params;
        Ok(())
    }

    /// Bind the provider channel once the handshake completes.
    pub fn connect(&mut self, channel: ChannelId) -> ConsumerResult<ConsumerDispatch> {
        if let Some(existing) = &self.provider_channel {
            return Err(ConsumerError::AlreadyConnected {
                channel: existing.clone(),
            });
        }
        let mut out = Dispatch::new();
        self.establish(channel, &mut out);
        Ok(out)
    }

    fn establish(&mut self, channel: ChannelId, out: &mut ConsumerDispatch) {
        info!(
            "[ccv-consumer] {} connected to provider on {} ({} packets pending)",
            self.chain_id,
            channel,
            self.pending.len()
        );
        self.provider_channel = Some(channel.clone());
        out.effect(ConsumerEffect::ProviderChannelEstablished { channel });
    }

    // =========================================================================
    // BLOCK LIFECYCLE
    // =========================================================================

    pub fn begin_block(&mut self, now: Timestamp) -> ConsumerDispatch {
        self.now = now;
        self.height += 1;
        self.requeue_cursor = 0;
        self.height_map.record(self.height, self.highest_vsc_id);
        self.height_map
            .prune(usize::try_from(self.params.historical_entries).unwrap_or(usize::MAX));
        Dispatch::new()
    }

    pub fn handle(&mut self, msg: InboundMessage) -> ConsumerDispatch {
        let mut out = Dispatch::new();
        match msg {
            InboundMessage::Recv {
                channel,
                sequence,
                data,
            } => self.on_recv(channel, sequence, &data, &mut out),
            InboundMessage::Acknowledgement { data, ack, .. } => {
                self.on_acknowledgement(&data, ack, &mut out)
            }
            InboundMessage::Timeout { data, .. } => self.on_timeout(&data, &mut out),
            InboundMessage::ChannelClosed { channel } => {
                if self.provider_channel.as_ref() == Some(&channel) {
                    warn!(
                        "[ccv-consumer] Provider channel {} closed; {} packets held",
                        channel,
                        self.pending.len()
                    );
                    self.provider_channel = None;
                    out.effect(ConsumerEffect::ProviderChannelClosed { channel });
                }
            }
        }
        out
    }

    fn on_recv(
        &mut self,
        channel: ChannelId,
        sequence: Sequence,
        data: &[u8],
        out: &mut ConsumerDispatch,
    ) {
        if let Some(provider) = &self.provider_channel {
            if provider != &channel {
                let reason = format!("{channel} is not the provider channel");
                reject(channel, sequence, reason, out);
                return;
            }
        }
        match PacketData::decode(data) {
            Ok(PacketData::Vsc(packet)) => {
                if self.provider_channel.is_none() {
                    self.establish(channel.clone(), out);
                }
                self.apply_vsc(packet, out);
                out.ack(channel, sequence, Acknowledgement::received());
            }
            Ok(other) => {
                let reason = format!("unexpected {} packet on consumer", other.kind());
                reject(channel, sequence, reason, out);
            }
            Err(e) => reject(channel, sequence, e.to_string(), out),
        }
    }

    fn apply_vsc(&mut self, packet: VscPacket, out: &mut ConsumerDispatch) {
        if packet.vsc_id <= self.highest_vsc_id {
            debug!(
                "[ccv-consumer] VSC {} already applied (highest {})",
                packet.vsc_id, self.highest_vsc_id
            );
            out.effect(ConsumerEffect::VscIgnored {
                vsc_id: packet.vsc_id,
            });
            return;
        }

        self.power_table.apply(&packet.updates);
        self.highest_vsc_id = packet.vsc_id;
        let matures_at = self.now + self.params.unbonding_period;
        self.maturity.schedule(packet.vsc_id, matures_at);
        let table = &self.power_table;
        self.liveness.retain(|address| table.contains(address));

        for address in &packet.slash_acks {
            if self.outstanding_downtime.remove(address) {
                out.effect(ConsumerEffect::OutstandingDowntimeCleared { address: *address });
            }
        }
        info!(
            "[ccv-consumer] Applied VSC {} ({} updates), matures at {}",
            packet.vsc_id,
            packet.updates.len(),
            matures_at
        );
        out.effect(ConsumerEffect::VscApplied {
            vsc_id: packet.vsc_id,
            updates: packet.updates.len(),
        });
    }

    fn on_acknowledgement(
        &mut self,
        data: &[u8],
        ack: Acknowledgement,
        out: &mut ConsumerDispatch,
    ) {
        let packet = match PacketData::decode(data) {
            Ok(PacketData::Slash(packet)) => packet,
            Ok(PacketData::VscMatured(matured)) => {
                if let Acknowledgement::Error(reason) = ack {
                    warn!(
                        "[ccv-consumer] Provider rejected maturity of VSC {}: {}",
                        matured.vsc_id, reason
                    );
                }
                return;
            }
            Ok(_) => return,
            Err(e) => {
                warn!("[ccv-consumer] Acknowledgement for undecodable packet: {}", e);
                return;
            }
        };

        match ack {
            Acknowledgement::Result(AckResult::SlashHandled { jailed }) => {
                debug!(
                    "[ccv-consumer] Provider handled {} report for {} (jailed: {})",
                    packet.infraction, packet.address, jailed
                );
                out.effect(ConsumerEffect::SlashAcknowledged {
                    address: packet.address,
                    jailed,
                });
                if !jailed {
                    self.clear_outstanding(&packet, out);
                }
            }
            Acknowledgement::Result(AckResult::Received) => {}
            Acknowledgement::Error(reason) => {
                warn!(
                    "[ccv-consumer] Provider rejected slash packet for {}: {}",
                    packet.address, reason
                );
                out.effect(ConsumerEffect::SlashRejected {
                    address: packet.address,
                    reason,
                });
                self.clear_outstanding(&packet, out);
            }
        }
    }

    fn clear_outstanding(&mut self, packet: &SlashPacket, out: &mut ConsumerDispatch) {
        if packet.infraction == InfractionKind::Downtime
            && self.outstanding_downtime.remove(&packet.address)
        {
            out.effect(ConsumerEffect::OutstandingDowntimeCleared {
                address: packet.address,
            });
        }
    }

    fn on_timeout(&mut self, data: &[u8], out: &mut ConsumerDispatch) {
        match PacketData::decode(data) {
            Ok(packet @ (PacketData::Slash(_) | PacketData::VscMatured(_))) => {
                let kind = packet.kind();
                warn!("[ccv-consumer] {} packet timed out, re-queued", kind);
                let at = self.requeue_cursor.min(self.pending.len());
                self.pending.insert(at, packet);
                self.requeue_cursor = at + 1;
                out.effect(ConsumerEffect::PacketRequeued { kind });
            }
            Ok(_) => {}
            Err(e) => warn!("[ccv-consumer] Timeout for undecodable packet: {}", e),
        }
    }

    pub fn end_block(&mut self) -> ConsumerDispatch {
        let mut out = Dispatch::new();
        for vsc_id in self.maturity.take_matured(self.now) {
            debug!("[ccv-consumer] VSC {} matured", vsc_id);
            self.pending
                .push_back(PacketData::VscMatured(VscMaturedPacket { vsc_id }));
            out.effect(ConsumerEffect::VscMatured { vsc_id });
        }

        if !self.params.enabled {
            return out;
        }
        let Some(channel) = self.provider_channel.clone() else {
            if !self.pending.is_empty() {
                debug!(
                    "[ccv-consumer] No provider channel; {} packets held",
                    self.pending.len()
                );
            }
            return out;
        };
        let timeout = self.now + self.params.ccv_timeout_period;
        while let Some(packet) = self.pending.pop_front() {
            match packet.encode() {
                Ok(data) => out.send(channel.clone(), data, timeout),
                Err(e) => warn!("[ccv-consumer] Dropping unencodable packet: {}", e),
            }
        }
        out
    }

    // =========================================================================
    // INFRACTIONS
    // =========================================================================

    /// Report downtime of `address` at the current height.
    pub fn report_downtime(&mut self, address: &ConsAddress) -> ConsumerResult<ConsumerEffect> {
        if !self.params.enabled {
            return Err(ConsumerError::Disabled);
        }
        let power = self.power_table.power(address);
        if power == 0 {
            return Err(ConsumerError::UnknownValidator { address: *address });
        }
        self.liveness.reset(address);

        if self.outstanding_downtime.contains(address) {
            debug!(
                "[ccv-consumer] Downtime of {} already reported, awaiting provider",
                address
            );
            return Ok(ConsumerEffect::DowntimeSkipped {
                address: *address,
                reason: DowntimeSkip::Outstanding,
            });
        }
        if self.is_soft_opted_out(address) {
            debug!("[ccv-consumer] {} (power {}) is soft opted out", address, power);
            return Ok(ConsumerEffect::DowntimeSkipped {
                address: *address,
                reason: DowntimeSkip::SoftOptOut,
            });
        }

        let vsc_id = self.height_map.vsc_for(self.height);
        self.queue_slash(*address, vsc_id, InfractionKind::Downtime, power);
        self.outstanding_downtime.insert(*address);
        Ok(ConsumerEffect::SlashPacketQueued {
            address: *address,
            infraction: InfractionKind::Downtime,
            vsc_id,
        })
    }

    /// Report verified double-sign evidence from `infraction_height`.
    pub fn report_double_sign(
        &mut self,
        address: &ConsAddress,
        infraction_height: u64,
    ) -> ConsumerResult<ConsumerEffect> {
        if !self.params.enabled {
            return Err(ConsumerError::Disabled);
        }
        if infraction_height > self.height {
            return Err(ConsumerError::FutureInfraction {
                height: infraction_height,
                current: self.height,
            });
        }
        let vsc_id = self.height_map.vsc_for(infraction_height);
        let power = self.power_table.power(address);
        self.queue_slash(*address, vsc_id, InfractionKind::DoubleSign, power);
        Ok(ConsumerEffect::SlashPacketQueued {
            address: *address,
            infraction: InfractionKind::DoubleSign,
            vsc_id,
        })
    }

    fn queue_slash(
        &mut self,
        address: ConsAddress,
        vsc_id: VscId,
        infraction: InfractionKind,
        power: Power,
    ) {
        info!(
            "[ccv-consumer] Queued {} slash packet for {} (VSC {}, power {})",
            infraction, address, vsc_id, power
        );
        self.pending.push_back(PacketData::Slash(SlashPacket {
            address,
            vsc_id,
            infraction,
            power,
            chain_id: None,
        }));
    }

    /// Feed one block of commit signatures into the liveness tracker and
    /// report every validator that crossed the missed-block limit.
    pub fn record_signatures(&mut self, signers: &[ConsAddress]) -> Vec<ConsumerEffect> {
        let signed: BTreeSet<&ConsAddress> = signers.iter().collect();
        let mut effects = Vec::new();
        for address in self.power_table.addresses() {
            if !self.liveness.record(address, signed.contains(&address)) {
                continue;
            }
            match self.report_downtime(&address) {
                Ok(effect) => effects.push(effect),
                Err(e) => warn!("[ccv-consumer] Downtime of {} not reported: {}", address, e),
            }
        }
        effects
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn chain_id(&self) -> &ChainId {
        &self.chain_id
    }

    pub fn params(&self) -> &ConsumerParams {
        &self.params
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn provider_channel(&self) -> Option<&ChannelId> {
        self.provider_channel.as_ref()
    }

    pub fn highest_vsc_id(&self) -> VscId {
        self.highest_vsc_id
    }

    pub fn power(&self, address: &ConsAddress) -> Power {
        self.power_table.power(address)
    }

    pub fn power_table(&self) -> &PowerTable {
        &self.power_table
    }

    pub fn pending_packets(&self) -> usize {
        self.pending.len()
    }

    pub fn is_downtime_outstanding(&self, address: &ConsAddress) -> bool {
        self.outstanding_downtime.contains(address)
    }

    pub fn vsc_for_height(&self, height: u64) -> VscId {
        self.height_map.vsc_for(height)
    }

    pub fn maturity_time(&self, vsc_id: VscId) -> Option<Timestamp> {
        self.maturity.matures_at(vsc_id)
    }

    pub fn missed_blocks(&self, address: &ConsAddress) -> i64 {
        self.liveness.missed(address)
    }

    pub fn is_soft_opted_out(&self, address: &ConsAddress) -> bool {
        let smallest = self
            .power_table
            .smallest_non_opt_out_power(self.params.soft_opt_out_threshold);
        is_soft_opted_out(self.power_table.power(address), smallest)
    }
}

fn reject(channel: ChannelId, sequence: Sequence, reason: String, out: &mut ConsumerDispatch) {
    warn!(
        "[ccv-consumer] Rejected packet {} on {}: {}",
        sequence, channel, reason
    );
    out.ack(channel, sequence, Acknowledgement::error(reason.clone()));
    out.effect(ConsumerEffect::PacketRejected { sequence, reason });
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccv_types::{OutboundMessage, ValidatorPowerUpdate};

    fn addr(name: &str) -> ConsAddress {
        ConsAddress::derive(name)
    }

    fn channel0() -> ChannelId {
        ChannelId::from("channel-0")
    }

    fn consumer(vals: &[(&str, Power)]) -> ConsumerService {
        let genesis: Vec<_> = vals.iter().map(|(n, p)| (addr(n), *p)).collect();
        let mut c = ConsumerService::new(
            ChainId::from("consu"),
            ConsumerParams::for_testing(),
            &genesis,
            Timestamp(0),
        )
        .unwrap();
        c.connect(channel0()).unwrap();
        c
    }

    fn vsc(
        vsc_id: VscId,
        updates: Vec<ValidatorPowerUpdate>,
        slash_acks: Vec<ConsAddress>,
    ) -> InboundMessage {
        InboundMessage::Recv {
            channel: channel0(),
            sequence: vsc_id,
            data: PacketData::Vsc(VscPacket {
                vsc_id,
                updates,
                timestamp: Timestamp(0),
                slash_acks,
            })
            .encode()
            .unwrap(),
        }
    }

    fn sent(out: &ConsumerDispatch) -> Vec<PacketData> {
        out.outbound
            .iter()
            .filter_map(|m| match m {
                OutboundMessage::SendPacket { data, .. } => PacketData::decode(data).ok(),
                _ => None,
            })
            .collect()
    }

    fn validators() -> Vec<(&'static str, Power)> {
        vec![("alice", 509), ("bob", 500), ("carol", 501)]
    }

    #[test]
    fn test_vsc_applied_acked_and_matured() {
        let mut c = consumer(&validators());
        c.begin_block(Timestamp(10));
        let out = c.handle(vsc(1, vec![ValidatorPowerUpdate::new(addr("bob"), 0)], vec![]));
        assert_eq!(
            out.outbound,
            vec![OutboundMessage::WriteAck {
                channel: channel0(),
                sequence: 1,
                ack: Acknowledgement::received()
            }]
        );
        assert_eq!(c.power(&addr("bob")), 0);
        assert_eq!(c.highest_vsc_id(), 1);
        assert_eq!(c.maturity_time(1), Some(Timestamp(610)));
        assert!(sent(&c.end_block()).is_empty());

        c.begin_block(Timestamp(609));
        assert!(sent(&c.end_block()).is_empty());
        c.begin_block(Timestamp(610));
        let out = c.end_block();
        assert_eq!(
            sent(&out),
            vec![PacketData::VscMatured(VscMaturedPacket { vsc_id: 1 })]
        );
    }

    #[test]
    fn test_redelivered_vsc_not_reapplied() {
        let mut c = consumer(&validators());
        c.begin_block(Timestamp(1));
        c.handle(vsc(2, vec![ValidatorPowerUpdate::new(addr("bob"), 0)], vec![]));
        let out = c.handle(vsc(1, vec![ValidatorPowerUpdate::new(addr("bob"), 700)], vec![]));
        assert!(out.effects.contains(&ConsumerEffect::VscIgnored { vsc_id: 1 }));
        assert_eq!(c.power(&addr("bob")), 0);
    }

    #[test]
    fn test_downtime_outstanding_until_slash_ack() {
        let mut c = consumer(&validators());
        c.begin_block(Timestamp(1));
        let effect = c.report_downtime(&addr("bob")).unwrap();
        assert_eq!(
            effect,
            ConsumerEffect::SlashPacketQueued {
                address: addr("bob"),
                infraction: InfractionKind::Downtime,
                vsc_id: 0
            }
        );
        assert_eq!(
            c.report_downtime(&addr("bob")).unwrap(),
            ConsumerEffect::DowntimeSkipped {
                address: addr("bob"),
                reason: DowntimeSkip::Outstanding
            }
        );
        assert_eq!(sent(&c.end_block()).len(), 1);

        c.begin_block(Timestamp(2));
        c.handle(vsc(1, vec![ValidatorPowerUpdate::new(addr("bob"), 0)], vec![addr("bob")]));
        assert!(!c.is_downtime_outstanding(&addr("bob")));
    }

    #[test]
    fn test_soft_opt_out_on_consumer() {
        let mut c = consumer(&[("alice", 60), ("bob", 500), ("carol", 950)]);
        c.begin_block(Timestamp(1));
        assert!(c.is_soft_opted_out(&addr("alice")));
        assert_eq!(
            c.report_downtime(&addr("alice")).unwrap(),
            ConsumerEffect::DowntimeSkipped {
                address: addr("alice"),
                reason: DowntimeSkip::SoftOptOut
            }
        );
        assert_eq!(c.pending_packets(), 0);
    }

    #[test]
    fn test_error_ack_clears_outstanding() {
        let mut c = consumer(&validators());
        c.begin_block(Timestamp(1));
        c.report_downtime(&addr("bob")).unwrap();
        let out = c.end_block();
        let data = match &out.outbound[0] {
            OutboundMessage::SendPacket { data, .. } => data.clone(),
            other => panic!("unexpected {other:?}"),
        };
        c.begin_block(Timestamp(2));
        let out = c.handle(InboundMessage::Acknowledgement {
            channel: channel0(),
            sequence: 1,
            data,
            ack: Acknowledgement::error("bad vsc id"),
        });
        assert!(out.effects.contains(&ConsumerEffect::OutstandingDowntimeCleared {
            address: addr("bob")
        }));
        assert!(!c.is_downtime_outstanding(&addr("bob")));
    }

    #[test]
    fn test_timeouts_requeue_in_order_ahead_of_new_packets() {
        let mut c = consumer(&validators());
        c.begin_block(Timestamp(1));
        c.report_downtime(&addr("bob")).unwrap();
        c.report_downtime(&addr("carol")).unwrap();
        let out = c.end_block();
        let datas: Vec<Vec<u8>> = out
            .outbound
            .iter()
            .filter_map(|m| match m {
                OutboundMessage::SendPacket { data, .. } => Some(data.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(datas.len(), 2);

        c.begin_block(Timestamp(2));
        c.report_downtime(&addr("alice")).unwrap();
        for (i, data) in datas.into_iter().enumerate() {
            c.handle(InboundMessage::Timeout {
                channel: channel0(),
                sequence: i as u64 + 1,
                data,
            });
        }
        let addresses: Vec<ConsAddress> = sent(&c.end_block())
            .into_iter()
            .filter_map(|p| match p {
                PacketData::Slash(s) => Some(s.address),
                _ => None,
            })
            .collect();
        assert_eq!(addresses, vec![addr("bob"), addr("carol"), addr("alice")]);
    }

    #[test]
    fn test_packets_held_while_disconnected() {
        let mut c = ConsumerService::new(
            ChainId::from("consu"),
            ConsumerParams::for_testing(),
            &[(addr("bob"), 500), (addr("alice"), 509)],
            Timestamp(0),
        )
        .unwrap();
        c.begin_block(Timestamp(1));
        c.report_downtime(&addr("bob")).unwrap();
        assert!(c.end_block().outbound.is_empty());
        assert_eq!(c.pending_packets(), 1);

        c.connect(channel0()).unwrap();
        assert!(matches!(
            c.connect(ChannelId::from("channel-1")),
            Err(ConsumerError::AlreadyConnected { .. })
        ));
        c.begin_block(Timestamp(2));
        assert_eq!(sent(&c.end_block()).len(), 1);
        assert_eq!(c.pending_packets(), 0);
    }

    #[test]
    fn test_double_sign_uses_height_mapping() {
        let mut c = consumer(&validators());
        c.begin_block(Timestamp(1));
        c.handle(vsc(3, vec![], vec![]));
        c.begin_block(Timestamp(2));
        c.begin_block(Timestamp(3));

        assert_eq!(c.vsc_for_height(1), 0);
        assert_eq!(c.vsc_for_height(2), 3);
        let effect = c.report_double_sign(&addr("carol"), 1).unwrap();
        assert_eq!(
            effect,
            ConsumerEffect::SlashPacketQueued {
                address: addr("carol"),
                infraction: InfractionKind::DoubleSign,
                vsc_id: 0
            }
        );
        assert!(matches!(
            c.report_double_sign(&addr("carol"), 9),
            Err(ConsumerError::FutureInfraction { .. })
        ));
    }

    #[test]
    fn test_missed_blocks_trigger_report() {
        let mut c = consumer(&validators());
        let signers = [addr("alice"), addr("carol")];
        let mut reports = Vec::new();
        for t in 1..=6 {
            c.begin_block(Timestamp(t));
            reports.extend(c.record_signatures(&signers));
        }
        assert_eq!(
            reports,
            vec![ConsumerEffect::SlashPacketQueued {
                address: addr("bob"),
                infraction: InfractionKind::Downtime,
                vsc_id: 0
            }]
        );
        assert_eq!(c.missed_blocks(&addr("bob")), 0);
    }

    #[test]
    fn test_disabled_consumer_reports_nothing() {
        let params = ConsumerParams {
            enabled: false,
            ..ConsumerParams::for_testing()
        };
        let genesis = [(addr("bob"), 500)];
        let mut c =
            ConsumerService::new(ChainId::from("consu"), params, &genesis, Timestamp(0)).unwrap();
        assert!(matches!(
            c.report_downtime(&addr("bob")),
            Err(ConsumerError::Disabled)
        ));
    }

    #[test]
    fn test_foreign_channel_rejected() {
        let mut c = consumer(&validators());
        let out = c.handle(InboundMessage::Recv {
            channel: ChannelId::from("channel-7"),
            sequence: 1,
            data: b"{}".to_vec(),
        });
        assert!(matches!(
            out.outbound.as_slice(),
            [OutboundMessage::WriteAck { ack: Acknowledgement::Error(_), .. }]
        ));
    }
}
