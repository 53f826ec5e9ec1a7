//! # Packet Lifecycle
//!
//! Timeouts, retries, replays and removal across the provider/consumer pair,
//! plus the unbonding gate that ties provider unbonding to consumer maturity.

#[cfg(test)]
mod tests {
    use crate::harness::{validator, Network};
    use ccv_consumer::ConsumerEffect;
    use ccv_provider::{
        Equivocation, ProviderEffect, ProviderError, RemovalReason, SkipReason, StakingError,
    };
    use ccv_types::{ChainId, ChannelId, ProviderParams, Timestamp};

    const DAY: u64 = 24 * 60 * 60;

    fn standard() -> (Network, ChainId) {
        let mut net = Network::new(
            &[("alice", 509), ("bob", 500), ("carol", 501)],
            ProviderParams::for_testing(),
        );
        let consu = net.add_consumer("consu");
        net.step(1);
        (net, consu)
    }

    fn consumer_channel(net: &Network, chain_id: &ChainId) -> ChannelId {
        net.consumers[chain_id]
            .service
            .provider_channel()
            .cloned()
            .expect("consumer connected")
    }

    #[test]
    fn test_timed_out_slash_packet_is_resent_and_applied_once() {
        let (mut net, consu) = standard();
        let channel = consumer_channel(&net, &consu);

        net.consumer(&consu)
            .report_downtime(&validator("bob"))
            .unwrap();
        net.advance(1);
        net.consumer_block(&consu);

        // Relayer stalls past the packet timeout.
        net.advance(DAY + 10);
        net.provider_block();
        assert_eq!(net.provider_power("bob"), 500);
        assert!(net.consumer(&consu).is_downtime_outstanding(&validator("bob")));

        net.consumer_block(&consu);
        assert!(net
            .consumer_effects(&consu)
            .contains(&ConsumerEffect::PacketRequeued { kind: "slash" }));
        assert!(net.consumer(&consu).is_downtime_outstanding(&validator("bob")));

        // A misbehaving relayer submits the resent packet twice.
        net.relayer.transport().redeliver(&consu, &channel, 2).unwrap();
        net.step(1);

        assert_eq!(net.jailings(), vec![validator("bob")]);
        assert_eq!(net.tokens("bob"), 500_000_000);
        assert_eq!(net.consumer_power(&consu, "bob"), 0);
        assert!(!net.consumer(&consu).is_downtime_outstanding(&validator("bob")));
        assert_eq!(net.relayer.transport().unacked(&consu, &channel), 0);
        assert!(net.provider.service.consumer(&consu).is_some());
    }

    #[test]
    fn test_consumer_double_sign_then_proposal_slashes_once() {
        let (mut net, consu) = standard();
        net.consumer(&consu)
            .report_double_sign(&validator("carol"), 1)
            .unwrap();
        net.step(1);
        net.step(1);

        // Consumer evidence alone jails forever but burns nothing.
        assert_eq!(net.provider_power("carol"), 0);
        assert_eq!(net.consumer_power(&consu, "carol"), 0);
        assert_eq!(net.tokens("carol"), 501_000_000);
        assert!(net.provider.service.slash_log().has_report(&validator("carol")));

        let evidence = Equivocation {
            address: validator("carol"),
            height: 1,
            power: 501,
            time: Timestamp(1),
        };
        let effects = net
            .provider
            .service
            .handle_equivocation_proposal(&[evidence.clone()])
            .unwrap();
        assert!(effects.contains(&ProviderEffect::ValidatorSlashed {
            address: validator("carol"),
            infraction: ccv_types::InfractionKind::DoubleSign,
            burned: 25_050_000,
        }));
        assert_eq!(net.tokens("carol"), 475_950_000);

        let replay = net
            .provider
            .service
            .handle_equivocation_proposal(&[evidence])
            .unwrap();
        assert_eq!(
            replay,
            vec![ProviderEffect::SlashSkipped {
                address: validator("carol"),
                reason: SkipReason::AlreadySlashed,
            }]
        );
        assert_eq!(net.tokens("carol"), 475_950_000);

        assert!(matches!(
            net.provider.service.unjail(&validator("carol")),
            Err(ProviderError::Staking(StakingError::Tombstoned { .. }))
        ));
    }

    #[test]
    fn test_proposal_for_unreported_validator_is_refused() {
        let (mut net, _) = standard();
        let evidence = Equivocation {
            address: validator("bob"),
            height: 1,
            power: 500,
            time: Timestamp(1),
        };
        assert!(matches!(
            net.provider.service.handle_equivocation_proposal(&[evidence]),
            Err(ProviderError::NoSlashLog { .. })
        ));
        assert!(matches!(
            net.provider.service.handle_equivocation_proposal(&[]),
            Err(ProviderError::EmptyProposal)
        ));
        assert_eq!(net.tokens("bob"), 500_000_000);
    }

    #[test]
    fn test_removed_consumer_sees_channel_close() {
        let (mut net, consu) = standard();
        let channel = consumer_channel(&net, &consu);

        let dispatch = net.provider.service.remove_consumer(&consu).unwrap();
        assert!(dispatch.effects.contains(&ProviderEffect::ConsumerRemoved {
            chain_id: consu.clone(),
            reason: RemovalReason::Stopped,
        }));
        net.relayer
            .submit(&ChainId::from(crate::harness::PROVIDER_CHAIN), dispatch.outbound);
        net.step(1);

        assert!(net.provider.service.consumer(&consu).is_none());
        assert!(net.consumer(&consu).provider_channel().is_none());
        assert!(net
            .consumer_effects(&consu)
            .contains(&ConsumerEffect::ProviderChannelClosed { channel }));

        // Reports stay queued with no channel to carry them.
        net.consumer(&consu)
            .report_downtime(&validator("bob"))
            .unwrap();
        net.step(1);
        assert_eq!(net.consumer(&consu).pending_packets(), 1);
        assert_eq!(net.provider_power("bob"), 500);
        assert!(matches!(
            net.provider.service.remove_consumer(&consu),
            Err(ProviderError::UnknownConsumer { .. })
        ));
    }

    #[test]
    fn test_unbonding_waits_for_consumer_maturity() {
        let (mut net, _) = standard();
        let op_id = net
            .provider
            .staking
            .undelegate(&validator("bob"), 100_000_000)
            .unwrap();
        net.provider.service.on_unbonding_initiated(op_id);
        net.step(1);
        assert_eq!(net.provider_power("bob"), 400);
        assert!(!net.provider.staking.is_unbonding_complete(op_id));

        // Consumer unbonding period is 600s from the VSC at t = 2.
        net.step(300);
        assert!(!net.provider.staking.is_unbonding_complete(op_id));
        net.step(300);
        assert!(!net.provider.staking.is_unbonding_complete(op_id));
        net.step(1);
        assert!(net.provider.staking.is_unbonding_complete(op_id));
        assert!(net
            .provider
            .effects
            .contains(&ProviderEffect::UnbondingReleased { op_id }));
    }
}
